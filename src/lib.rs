//! Republishes the participants of a real-time call as named network video
//! sources.
//!
//! Each participant gets one endpoint: a publish handle on the engine, a
//! shared A/V clock and the counters behind the status view. Frames handed
//! over by the capture layer are marshaled into wire descriptors (packed
//! 4-byte video, planar float audio, 100ns timecodes) and sent on that
//! participant's handle.
//!
//! ```no_run
//! use ndi_bridge::engine::LoopbackEngine;
//! use ndi_bridge::Bridge;
//!
//! # async fn example() {
//! let bridge = Bridge::new(LoopbackEngine::new());
//! if !bridge.initialize() {
//!     // preview-only mode
//! }
//!
//! let name = bridge.create_endpoint("a1b2c3d4e5f6", Some("Alice")).await;
//! assert_eq!(name.as_deref(), Some("IVS-Alice"));
//!
//! let ingest = bridge.ingest();
//! ingest.submit_video("a1b2c3d4e5f6", 2, 2, vec![0u8; 16]);
//! ingest.submit_audio("a1b2c3d4e5f6", vec![0.0; 1024], vec![0.0; 1024], 48_000);
//!
//! println!("{}", bridge.status().await);
//! bridge.shutdown().await;
//! # }
//! ```

pub mod bridge;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod media;
pub mod stats;

pub use bridge::{Bridge, ControlRequest, ControlResponse, IngestHandle};
pub use endpoint::{BridgeConfig, EndpointManager, EndpointState, ParticipantId};
pub use engine::{PublishEngine, PublishSender, SenderOptions};
pub use error::{EngineError, Error, FrameError, Result};
