//! Publishing engine seam
//!
//! The engine is the native library that announces named sources on the
//! network and pushes frames to whoever connects. The bridge only needs four
//! operations from it, captured by [`PublishEngine`] and [`PublishSender`]:
//!
//! ```text
//!   EngineRegistry<E>
//!   ┌──────────────────┐   create_sender(name)   ┌────────────────┐
//!   │ initialize()     │ ──────────────────────► │ E::Sender      │
//!   │ is_ready()       │                         │  send_video()  │
//!   └──────────────────┘                         │  send_audio()  │
//!                                                │  destroy()     │
//!                                                └────────────────┘
//! ```
//!
//! The engine does not enforce name uniqueness; that is the endpoint
//! manager's job. It may however refuse a name the discovery layer still
//! remembers, which it reports as [`EngineError::NameReserved`].

pub mod loopback;
pub mod registry;
pub mod unavailable;

use std::future::Future;

use crate::error::EngineError;
use crate::media::{AudioFrame, VideoFrame};

pub use loopback::{LoopbackConfig, LoopbackEngine, LoopbackSender, OutboundFrame};
pub use registry::EngineRegistry;
pub use unavailable::UnavailableEngine;

/// Options passed when creating a sender
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderOptions {
    /// Discovery groups to announce in (None = default group)
    pub groups: Option<String>,
    /// Let the engine pace video submission to the declared frame rate
    pub clock_video: bool,
    /// Let the engine pace audio submission to the sample rate
    pub clock_audio: bool,
}

/// A native publishing engine
pub trait PublishEngine: Send + Sync + 'static {
    /// Live publish handle type
    type Sender: PublishSender;

    /// Bring the native library up
    fn initialize(&self) -> Result<(), EngineError>;

    /// Announce a new named source
    fn create_sender(
        &self,
        name: &str,
        options: &SenderOptions,
    ) -> impl Future<Output = Result<Self::Sender, EngineError>> + Send;
}

/// A live named source on the engine
pub trait PublishSender: Send + Sync + 'static {
    /// Push one video frame
    fn send_video(&self, frame: VideoFrame) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Push one audio frame
    fn send_audio(&self, frame: AudioFrame) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Withdraw the source and release native resources
    fn destroy(&self) -> impl Future<Output = Result<(), EngineError>> + Send;
}
