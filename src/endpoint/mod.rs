//! Endpoint lifecycle
//!
//! One endpoint per published participant. The manager names endpoints,
//! resolves name collisions between reconnecting participants, retries
//! transient engine conflicts and releases handles on teardown.
//!
//! # State machine
//!
//! ```text
//!   Idle ──► Creating ──► Active ──► Destroying ──► Removed
//!              │
//!              └── failure: back to Idle, no handle left behind
//! ```

pub mod config;
pub mod entry;
pub mod key;
pub(crate) mod locks;
pub mod manager;

pub use config::BridgeConfig;
pub use entry::{EndpointState, StreamEndpoint};
pub use key::{publish_name, ParticipantId};
pub use manager::{AcquireOutcome, EndpointManager};
