//! Boundary adapters
//!
//! [`Bridge`] ties the endpoint manager to the two kinds of traffic coming
//! from collaborators:
//!
//! ```text
//!   host control channel ──► Bridge::handle(ControlRequest) ──► ControlResponse
//!
//!   capture layer ──► IngestHandle::submit_*  (try_send, never blocks)
//!                          │
//!                          ▼  bounded mpsc
//!                     dispatcher ──► one lane per participant ──► EndpointManager::submit_*_frame
//! ```

pub mod control;
pub mod ingest;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::endpoint::{BridgeConfig, EndpointManager};
use crate::engine::PublishEngine;
use crate::stats::BridgeStatus;

pub use control::{ControlRequest, ControlResponse};
pub use ingest::{run_ingest, IngestCommand, IngestHandle, IngestQueue};

/// A running bridge
///
/// Must be created inside a Tokio runtime; it spawns the ingest worker and,
/// if configured, the periodic status logger.
pub struct Bridge<E: PublishEngine> {
    manager: Arc<EndpointManager<E>>,
    ingest: IngestHandle,
    worker: JoinHandle<()>,
    stats_task: Option<JoinHandle<()>>,
}

impl<E: PublishEngine> Bridge<E> {
    /// Start a bridge with default configuration
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, BridgeConfig::default())
    }

    /// Start a bridge with custom configuration
    pub fn with_config(engine: E, config: BridgeConfig) -> Self {
        let capacity = config.ingest_capacity;
        let stats_interval = config.stats_interval;
        let manager = Arc::new(EndpointManager::with_config(engine, config));

        let (ingest, rx) = IngestHandle::channel(capacity);
        let worker = tokio::spawn(run_ingest(Arc::clone(&manager), rx));
        let stats_task = stats_interval.map(|interval| manager.spawn_stats_task(interval));

        Self {
            manager,
            ingest,
            worker,
            stats_task,
        }
    }

    /// The endpoint manager
    pub fn manager(&self) -> &Arc<EndpointManager<E>> {
        &self.manager
    }

    /// A handle for the capture layer
    pub fn ingest(&self) -> IngestHandle {
        self.ingest.clone()
    }

    /// Bring the publishing engine up
    pub fn initialize(&self) -> bool {
        self.manager.initialize()
    }

    /// Publish a participant; None if creation failed
    pub async fn create_endpoint(
        &self,
        participant_id: &str,
        display_label: Option<&str>,
    ) -> Option<String> {
        match self.manager.create_endpoint(participant_id, display_label).await {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::error!(
                    participant = participant_id,
                    error = %e,
                    "Endpoint creation failed"
                );
                None
            }
        }
    }

    /// Stop publishing a participant
    pub async fn remove_endpoint(&self, participant_id: &str) {
        self.manager.remove_endpoint(participant_id).await;
    }

    /// Engine and endpoint status
    pub async fn status(&self) -> BridgeStatus {
        self.manager.status().await
    }

    /// Serve one control request
    pub async fn handle(&self, request: ControlRequest) -> ControlResponse {
        tracing::debug!(request = ?request, "Control request");

        match request {
            ControlRequest::Initialize => ControlResponse::Initialized(self.initialize()),
            ControlRequest::CreateEndpoint {
                participant_id,
                display_label,
            } => ControlResponse::EndpointCreated(
                self.create_endpoint(&participant_id, display_label.as_deref())
                    .await,
            ),
            ControlRequest::RemoveEndpoint { participant_id } => {
                self.remove_endpoint(&participant_id).await;
                ControlResponse::Removed
            }
            ControlRequest::QueryStatus => ControlResponse::Status(self.status().await),
            ControlRequest::GetConfig => ControlResponse::Config(self.manager.config().clone()),
        }
    }

    /// Tear down every endpoint and stop background tasks
    pub async fn shutdown(self) {
        self.manager.remove_all().await;

        if let Some(task) = self.stats_task {
            task.abort();
        }

        // Handles held elsewhere would keep the queue open
        self.worker.abort();
        let _ = self.worker.await;
        tracing::info!("Bridge shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::{LoopbackEngine, UnavailableEngine};

    fn create(participant_id: &str, label: &str) -> ControlRequest {
        ControlRequest::CreateEndpoint {
            participant_id: participant_id.to_string(),
            display_label: Some(label.to_string()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_round_trip() {
        let bridge = Bridge::new(LoopbackEngine::new());

        assert!(matches!(
            bridge.handle(ControlRequest::Initialize).await,
            ControlResponse::Initialized(true)
        ));

        let created = bridge.handle(create("p-1", "Alice")).await;
        assert_eq!(created.publish_name(), Some("IVS-Alice"));

        match bridge.handle(ControlRequest::QueryStatus).await {
            ControlResponse::Status(status) => {
                assert!(status.initialized);
                assert_eq!(status.endpoint_count, 1);
                assert_eq!(status.endpoints[0].publish_name, "IVS-Alice");
            }
            other => panic!("unexpected response {:?}", other),
        }

        let removal = ControlRequest::RemoveEndpoint {
            participant_id: "p-1".to_string(),
        };
        assert!(matches!(bridge.handle(removal.clone()).await, ControlResponse::Removed));
        assert!(matches!(bridge.handle(removal).await, ControlResponse::Removed));
        assert_eq!(bridge.status().await.endpoint_count, 0);

        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_only_mode() {
        let bridge = Bridge::new(UnavailableEngine::new("library not found"));

        assert!(matches!(
            bridge.handle(ControlRequest::Initialize).await,
            ControlResponse::Initialized(false)
        ));
        let created = bridge.handle(create("p-1", "Alice")).await;
        assert!(matches!(created, ControlResponse::EndpointCreated(None)));

        // Frames are accepted and silently dropped
        assert!(bridge.ingest().submit_video("p-1", 1, 1, vec![0u8; 4]));
        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_config() {
        let config = BridgeConfig::default().name_prefix("CALL").stats_interval(None);
        let bridge = Bridge::with_config(LoopbackEngine::new(), config);

        match bridge.handle(ControlRequest::GetConfig).await {
            ControlResponse::Config(config) => assert_eq!(config.name_prefix, "CALL"),
            other => panic!("unexpected response {:?}", other),
        }
        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingest_through_bridge() {
        let bridge = Bridge::new(LoopbackEngine::new());
        bridge.initialize();
        bridge.create_endpoint("p-1", Some("Alice")).await.unwrap();

        let ingest = bridge.ingest();
        for _ in 0..10 {
            assert!(ingest.submit_video("p-1", 2, 2, vec![0u8; 16]));
            tokio::time::sleep(Duration::from_millis(40)).await;
        }

        let status = bridge.status().await;
        assert_eq!(status.endpoints[0].frame_count, 10);
        assert_eq!(ingest.dropped(), 0);

        bridge.shutdown().await;
        assert!(!ingest.submit_video("p-1", 2, 2, vec![0u8; 16]));
    }
}
