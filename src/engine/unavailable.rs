//! Engine stand-in for hosts without the native library

use crate::error::EngineError;
use crate::media::{AudioFrame, VideoFrame};

use super::{PublishEngine, PublishSender, SenderOptions};

/// Engine that never initializes
///
/// Running the bridge on it gives the degraded preview-only mode.
#[derive(Debug, Clone)]
pub struct UnavailableEngine {
    reason: String,
}

impl UnavailableEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl PublishEngine for UnavailableEngine {
    type Sender = NoSender;

    fn initialize(&self) -> Result<(), EngineError> {
        Err(EngineError::Unavailable(self.reason.clone()))
    }

    async fn create_sender(
        &self,
        _name: &str,
        _options: &SenderOptions,
    ) -> Result<NoSender, EngineError> {
        Err(EngineError::Unavailable(self.reason.clone()))
    }
}

/// Sender type that cannot be constructed
#[derive(Debug)]
pub enum NoSender {}

impl PublishSender for NoSender {
    async fn send_video(&self, _frame: VideoFrame) -> Result<(), EngineError> {
        match *self {}
    }

    async fn send_audio(&self, _frame: AudioFrame) -> Result<(), EngineError> {
        match *self {}
    }

    async fn destroy(&self) -> Result<(), EngineError> {
        match *self {}
    }
}
