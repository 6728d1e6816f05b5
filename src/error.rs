//! Error types
//!
//! Every failure is scoped to a single participant's endpoint; none of them
//! are fatal to the process.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level bridge error
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The publishing engine is not initialized (degraded preview-only mode)
    #[error("publishing engine unavailable")]
    EngineUnavailable,

    /// The publish name stayed reserved through every retry
    #[error("publish name {name} still reserved after {attempts} attempts")]
    NameCollision { name: String, attempts: u32 },

    /// The submitted buffer could not be interpreted as a frame
    #[error("invalid frame data: {0}")]
    InvalidFrameData(#[from] FrameError),

    /// The engine rejected a frame
    #[error("send failed on {name}: {source}")]
    SendFailure { name: String, source: EngineError },

    /// Releasing a publish handle failed
    #[error("teardown of {name} failed: {source}")]
    Teardown { name: String, source: EngineError },

    /// Any other engine failure
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The bridge worker is gone
    #[error("bridge channel closed")]
    ChannelClosed,
}

/// Errors reported by a publishing engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Native library could not be loaded
    #[error("engine not available: {0}")]
    Unavailable(String),

    /// The name is still held by the discovery layer
    #[error("name {0} is still reserved")]
    NameReserved(String),

    /// The engine refused the request
    #[error("engine rejected request: {0}")]
    Rejected(String),

    /// A native call did not complete within the configured bound
    #[error("native call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The sender was already destroyed
    #[error("sender closed")]
    Closed,
}

impl EngineError {
    /// Whether retrying the same request later can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::NameReserved(_))
    }
}

/// Reasons a raw buffer is rejected by the frame marshaler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("zero dimension {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    #[error("buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("missing audio channel")]
    MissingChannel,

    #[error("channel length mismatch: left={left} right={right}")]
    ChannelMismatch { left: usize, right: usize },

    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_name_reserved_is_transient() {
        assert!(EngineError::NameReserved("IVS-bob".into()).is_transient());
        assert!(!EngineError::Rejected("nope".into()).is_transient());
        assert!(!EngineError::Unavailable("missing".into()).is_transient());
        assert!(!EngineError::Timeout(std::time::Duration::from_secs(1)).is_transient());
        assert!(!EngineError::Closed.is_transient());
    }

    #[test]
    fn test_frame_error_converts() {
        let err: Error = FrameError::ZeroDimension {
            width: 640,
            height: 0,
        }
        .into();
        assert!(matches!(err, Error::InvalidFrameData(_)));
        assert_eq!(err.to_string(), "invalid frame data: zero dimension 640x0");
    }
}
