//! Telemetry derived from endpoint counters

pub mod metrics;

pub use metrics::{BridgeStatus, EndpointStats, EndpointStatus, Resolution};
