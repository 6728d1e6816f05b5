//! Media framing
//!
//! This module provides:
//! - The per-participant A/V clock (100ns timecodes)
//! - Video frame marshaling (packed 4-byte pixels)
//! - Audio frame marshaling (planar float stereo)

pub mod audio;
pub mod clock;
pub mod video;

pub use audio::{AudioFrame, RawAudio};
pub use clock::{ParticipantClock, Timecode, TICKS_PER_SECOND};
pub use video::{AlphaPolicy, FourCc, FrameFormat, FrameRate, PixelBuffer, RawVideo, VideoFrame};
