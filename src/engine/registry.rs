//! Engine availability tracking

use std::sync::atomic::{AtomicBool, Ordering};

use super::PublishEngine;

/// Wraps an engine with its initialization state
///
/// When initialization fails the bridge keeps running in preview-only mode:
/// the call UI works, but every endpoint creation fails fast.
pub struct EngineRegistry<E> {
    engine: E,
    ready: AtomicBool,
}

impl<E: PublishEngine> EngineRegistry<E> {
    /// Wrap an engine; it is not ready until [`initialize`](Self::initialize) succeeds
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            ready: AtomicBool::new(false),
        }
    }

    /// Try to bring the engine up
    ///
    /// Returns false if the native library is unavailable. Calling again after
    /// a success is a no-op that returns true.
    pub fn initialize(&self) -> bool {
        if self.is_ready() {
            return true;
        }

        match self.engine.initialize() {
            Ok(()) => {
                self.ready.store(true, Ordering::Release);
                tracing::info!("Publishing engine initialized");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Publishing engine not available, preview mode only");
                false
            }
        }
    }

    /// Whether endpoints can be created
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LoopbackEngine, UnavailableEngine};

    #[test]
    fn test_not_ready_before_initialize() {
        let registry = EngineRegistry::new(LoopbackEngine::new());
        assert!(!registry.is_ready());
    }

    #[test]
    fn test_initialize_loopback() {
        let registry = EngineRegistry::new(LoopbackEngine::new());
        assert!(registry.initialize());
        assert!(registry.is_ready());

        // Second call is a no-op
        assert!(registry.initialize());
    }

    #[test]
    fn test_initialize_unavailable_is_not_fatal() {
        let registry = EngineRegistry::new(UnavailableEngine::new("library not found"));
        assert!(!registry.initialize());
        assert!(!registry.is_ready());
    }
}
