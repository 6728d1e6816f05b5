//! Audio frame marshaling
//!
//! Audio is sent as 32-bit float planar stereo. Each channel occupies one
//! contiguous block; samples are not interleaved:
//!
//! ```text
//! +------------------------------+------------------------------+
//! | L0 L1 L2 ... L(n-1)          | R0 R1 R2 ... R(n-1)          |
//! | n * 4 bytes (channel stride) | n * 4 bytes                  |
//! +------------------------------+------------------------------+
//! ```
//!
//! Samples are little-endian IEEE-754.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;

use super::clock::Timecode;
use super::video::FourCc;

/// Channel count of every audio frame the bridge emits
pub const CHANNELS: u32 = 2;

/// Bytes per sample
pub const BYTES_PER_SAMPLE: u32 = 4;

/// Validated planar stereo samples
#[derive(Debug, Clone)]
pub struct RawAudio {
    sample_rate: u32,
    samples_per_channel: u32,
    data: Bytes,
}

impl RawAudio {
    /// Pack left and right channels into one planar buffer
    ///
    /// An empty slice counts as a missing channel.
    pub fn planar(left: &[f32], right: &[f32], sample_rate: u32) -> Result<Self, FrameError> {
        if left.is_empty() || right.is_empty() {
            return Err(FrameError::MissingChannel);
        }
        if left.len() != right.len() {
            return Err(FrameError::ChannelMismatch {
                left: left.len(),
                right: right.len(),
            });
        }
        if sample_rate == 0 {
            return Err(FrameError::ZeroSampleRate);
        }

        let mut buf = BytesMut::with_capacity(left.len() * 2 * BYTES_PER_SAMPLE as usize);
        for &sample in left {
            buf.put_f32_le(sample);
        }
        for &sample in right {
            buf.put_f32_le(sample);
        }

        Ok(Self {
            sample_rate,
            samples_per_channel: left.len() as u32,
            data: buf.freeze(),
        })
    }

    /// Duplicate a single channel into both sides
    pub fn mono(samples: &[f32], sample_rate: u32) -> Result<Self, FrameError> {
        Self::planar(samples, samples, sample_rate)
    }

    pub fn samples_per_channel(&self) -> u32 {
        self.samples_per_channel
    }

    /// Build the wire descriptor
    pub fn into_frame(self, timecode: Timecode) -> AudioFrame {
        AudioFrame {
            sample_rate: self.sample_rate,
            channels: CHANNELS,
            samples_per_channel: self.samples_per_channel,
            channel_stride: self.samples_per_channel * BYTES_PER_SAMPLE,
            fourcc: FourCc::Fltp,
            timecode,
            data: self.data,
        }
    }
}

/// Audio frame descriptor as sent on the wire
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Always 2
    pub channels: u32,
    pub samples_per_channel: u32,
    /// Bytes between the start of consecutive channels
    pub channel_stride: u32,
    pub fourcc: FourCc,
    /// Same epoch as the participant's video timecodes
    pub timecode: Timecode,
    /// Planar sample data
    pub data: Bytes,
}

impl AudioFrame {
    /// Decode one channel back into samples
    pub fn channel(&self, index: u32) -> Option<Vec<f32>> {
        if index >= self.channels {
            return None;
        }
        let start = (index * self.channel_stride) as usize;
        let end = start + self.channel_stride as usize;
        let block = self.data.get(start..end)?;

        Some(
            block
                .chunks_exact(BYTES_PER_SAMPLE as usize)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    /// Duration covered by this frame
    pub fn duration(&self) -> std::time::Duration {
        if self.sample_rate == 0 {
            return std::time::Duration::ZERO;
        }
        std::time::Duration::from_secs_f64(self.samples_per_channel as f64 / self.sample_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_layout() {
        let raw = RawAudio::planar(&[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0, 7.0, 8.0], 48_000).unwrap();
        let frame = raw.into_frame(Timecode(10));

        assert_eq!(frame.data.len(), 32);
        assert_eq!(frame.channel_stride, 16);
        assert_eq!(frame.channels, 2);
        assert_eq!(frame.samples_per_channel, 4);
        assert_eq!(frame.sample_rate, 48_000);
        assert_eq!(frame.fourcc, FourCc::Fltp);

        let mut expected = Vec::new();
        for v in [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0] {
            expected.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(&frame.data[..16], &expected[..16]);
        assert_eq!(&frame.data[16..], &expected[16..]);
    }

    #[test]
    fn test_channel_decode() {
        let frame = RawAudio::planar(&[0.5, -0.5], &[0.25, -0.25], 44_100)
            .unwrap()
            .into_frame(Timecode::ZERO);

        assert_eq!(frame.channel(0), Some(vec![0.5, -0.5]));
        assert_eq!(frame.channel(1), Some(vec![0.25, -0.25]));
        assert_eq!(frame.channel(2), None);
    }

    #[test]
    fn test_missing_channel() {
        assert_eq!(
            RawAudio::planar(&[], &[1.0], 48_000).unwrap_err(),
            FrameError::MissingChannel
        );
        assert_eq!(
            RawAudio::planar(&[1.0], &[], 48_000).unwrap_err(),
            FrameError::MissingChannel
        );
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(
            RawAudio::planar(&[1.0, 2.0], &[1.0], 48_000).unwrap_err(),
            FrameError::ChannelMismatch { left: 2, right: 1 }
        );
    }

    #[test]
    fn test_zero_sample_rate() {
        assert_eq!(
            RawAudio::planar(&[1.0], &[1.0], 0).unwrap_err(),
            FrameError::ZeroSampleRate
        );
    }

    #[test]
    fn test_mono_duplicates() {
        let frame = RawAudio::mono(&[0.1, 0.2, 0.3], 48_000)
            .unwrap()
            .into_frame(Timecode::ZERO);
        assert_eq!(frame.channel(0), frame.channel(1));
        assert_eq!(frame.channel_stride, 12);
    }

    #[test]
    fn test_duration() {
        let frame = RawAudio::planar(&[0.0; 1024], &[0.0; 1024], 48_000)
            .unwrap()
            .into_frame(Timecode::ZERO);
        let ms = frame.duration().as_secs_f64() * 1000.0;
        assert!((ms - 21.333).abs() < 0.01);
    }
}
