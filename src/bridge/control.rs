//! Control operations
//!
//! Low-frequency request/response messages a host transport (IPC, RPC,
//! websocket...) can map one-to-one onto its own channels.

use crate::endpoint::BridgeConfig;
use crate::stats::BridgeStatus;

/// A control request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    /// Bring the publishing engine up
    Initialize,
    /// Publish a participant
    CreateEndpoint {
        participant_id: String,
        display_label: Option<String>,
    },
    /// Stop publishing a participant
    RemoveEndpoint { participant_id: String },
    /// Engine and endpoint status
    QueryStatus,
    /// Active configuration
    GetConfig,
}

/// Reply to a [`ControlRequest`]
#[derive(Debug, Clone)]
pub enum ControlResponse {
    /// Whether the engine is up
    Initialized(bool),
    /// Publish name, or None if creation failed
    EndpointCreated(Option<String>),
    /// Removal acknowledged (always sent, even when nothing was removed)
    Removed,
    Status(BridgeStatus),
    Config(BridgeConfig),
}

impl ControlResponse {
    /// Publish name carried by an `EndpointCreated` reply
    pub fn publish_name(&self) -> Option<&str> {
        match self {
            ControlResponse::EndpointCreated(name) => name.as_deref(),
            _ => None,
        }
    }
}
