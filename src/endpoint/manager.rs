//! Endpoint lifecycle manager
//!
//! Owns the participant → endpoint map and every publish handle in it.
//!
//! # Serialization
//!
//! ```text
//!   create_endpoint(p, label)           remove_endpoint(p)
//!        │                                   │
//!        ├─ participant lock (p)  ◄──────────┘
//!        ├─ name lock (IVS-label)
//!        │     1. evict p's previous endpoint   ── release, grace delay
//!        │     2. evict other holder of name    ── release, grace delay
//!        │     3. acquire handle (bounded retry)
//!        │     4. insert endpoint
//!        ▼
//!   endpoints: RwLock<HashMap<ParticipantId, Arc<StreamEndpoint>>>
//!        ▲
//!        │  read lock, clone Arc, release
//!   submit_video_frame / submit_audio_frame
//! ```
//!
//! The map lock is only held for in-memory operations, never across a native
//! call or a grace delay, so ingestion does not wait on lifecycle work.
//! Endpoints leave the map before their handle is released; a frame racing
//! with teardown either finds no endpoint or finds it no longer active.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::engine::{EngineRegistry, PublishEngine, PublishSender};
use crate::error::{EngineError, Error, Result};
use crate::media::{PixelBuffer, RawAudio, RawVideo, Timecode};
use crate::stats::{BridgeStatus, EndpointStatus};

use super::config::BridgeConfig;
use super::entry::{EndpointState, StreamEndpoint};
use super::key::{publish_name, ParticipantId};
use super::locks::KeyedLocks;

/// Outcome of the bounded acquisition loop
pub enum AcquireOutcome<S> {
    /// A handle was obtained
    Acquired(S),
    /// Every attempt hit a reserved name
    Exhausted { attempts: u32 },
}

/// Why an endpoint is being torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Teardown {
    Removed,
    Replaced,
    Evicted,
}

/// Manages the endpoints of every published participant
pub struct EndpointManager<E: PublishEngine> {
    engine: EngineRegistry<E>,
    config: BridgeConfig,
    endpoints: RwLock<HashMap<ParticipantId, Arc<StreamEndpoint<E::Sender>>>>,
    participant_locks: KeyedLocks,
    name_locks: KeyedLocks,
    /// Participants with a creation or removal in flight
    transitions: Mutex<HashMap<ParticipantId, EndpointState>>,
}

impl<E: PublishEngine> EndpointManager<E> {
    /// Create a manager with default configuration
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, BridgeConfig::default())
    }

    /// Create a manager with custom configuration
    pub fn with_config(engine: E, config: BridgeConfig) -> Self {
        Self {
            engine: EngineRegistry::new(engine),
            config,
            endpoints: RwLock::new(HashMap::new()),
            participant_locks: KeyedLocks::new(),
            name_locks: KeyedLocks::new(),
            transitions: Mutex::new(HashMap::new()),
        }
    }

    /// Bridge configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Publishing engine
    pub fn engine(&self) -> &E {
        self.engine.engine()
    }

    /// Bring the publishing engine up; false means preview-only mode
    pub fn initialize(&self) -> bool {
        self.engine.initialize()
    }

    /// Whether the publishing engine is up
    pub fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    /// Publish a participant under a name derived from its label
    ///
    /// Any previous endpoint of the same participant, and any other endpoint
    /// already holding the derived name, is torn down first. Returns the
    /// publish name.
    pub async fn create_endpoint(
        &self,
        participant_id: impl Into<ParticipantId>,
        display_label: Option<&str>,
    ) -> Result<String> {
        let participant_id = participant_id.into();

        if !self.engine.is_ready() {
            tracing::warn!(
                participant = %participant_id,
                "Engine not initialized, endpoint not created"
            );
            return Err(Error::EngineUnavailable);
        }

        let name = publish_name(&self.config.name_prefix, display_label, &participant_id);

        let _participant_guard = self.participant_locks.lock(participant_id.as_str()).await;
        let _name_guard = self.name_locks.lock(&name).await;
        let _transition = self.begin_transition(&participant_id, EndpointState::Creating);

        tracing::info!(participant = %participant_id, name = %name, "Creating endpoint");

        if let Some(previous) = self.take_endpoint(&participant_id).await {
            self.teardown(&previous, Teardown::Replaced).await;
            tokio::time::sleep(self.config.release_delay).await;
        }

        if let Some(holder) = self.take_by_name(&name, &participant_id).await {
            self.teardown(&holder, Teardown::Evicted).await;
            tokio::time::sleep(self.config.release_delay).await;
        }

        let sender = match self.acquire(&name).await? {
            AcquireOutcome::Acquired(sender) => sender,
            AcquireOutcome::Exhausted { attempts } => {
                tracing::error!(
                    participant = %participant_id,
                    name = %name,
                    attempts = attempts,
                    "Publish name still reserved, giving up"
                );
                return Err(Error::NameCollision { name, attempts });
            }
        };

        let endpoint = Arc::new(StreamEndpoint::new(
            participant_id.clone(),
            display_label.map(str::to_string),
            name.clone(),
            sender,
        ));
        self.endpoints
            .write()
            .await
            .insert(participant_id.clone(), endpoint);

        tracing::info!(participant = %participant_id, name = %name, "Endpoint ready");
        Ok(name)
    }

    /// Tear down a participant's endpoint
    ///
    /// Idempotent: returns false when there was nothing to remove.
    pub async fn remove_endpoint(&self, participant_id: impl Into<ParticipantId>) -> bool {
        let participant_id = participant_id.into();

        let _participant_guard = self.participant_locks.lock(participant_id.as_str()).await;

        let Some(endpoint) = self.take_endpoint(&participant_id).await else {
            return false;
        };

        let _transition = self.begin_transition(&participant_id, EndpointState::Destroying);
        self.teardown(&endpoint, Teardown::Removed).await;
        true
    }

    /// Tear down every endpoint
    pub async fn remove_all(&self) -> usize {
        let participants: Vec<ParticipantId> =
            self.endpoints.read().await.keys().cloned().collect();

        tracing::info!(count = participants.len(), "Cleaning up all endpoints");

        let mut removed = 0;
        for participant_id in participants {
            if self.remove_endpoint(participant_id).await {
                removed += 1;
            }
        }
        removed
    }

    /// Status of every live endpoint, ordered by participant id
    pub async fn query_status(&self) -> Vec<EndpointStatus> {
        let endpoints = self.endpoints.read().await;
        let mut rows: Vec<EndpointStatus> = endpoints.values().map(|ep| ep.status()).collect();
        rows.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        rows
    }

    /// Engine state plus every live endpoint
    pub async fn status(&self) -> BridgeStatus {
        let endpoints = self.query_status().await;
        BridgeStatus {
            initialized: self.engine.is_ready(),
            endpoint_count: endpoints.len(),
            endpoints,
        }
    }

    /// Lifecycle state of a participant
    pub async fn state_of(&self, participant_id: impl Into<ParticipantId>) -> EndpointState {
        let participant_id = participant_id.into();

        let pending = self.transitions.lock().get(&participant_id).copied();
        if let Some(state) = pending {
            return state;
        }

        match self.endpoints.read().await.get(&participant_id) {
            Some(ep) => ep.state(),
            None => EndpointState::Idle,
        }
    }

    /// Live endpoint of a participant
    pub async fn endpoint(
        &self,
        participant_id: &ParticipantId,
    ) -> Option<Arc<StreamEndpoint<E::Sender>>> {
        self.endpoints.read().await.get(participant_id).cloned()
    }

    /// Number of live endpoints
    pub async fn endpoint_count(&self) -> usize {
        self.endpoints.read().await.len()
    }

    /// Current timecode of a participant's clock
    ///
    /// Latches the clock origin if no frame was stamped yet. None when the
    /// participant has no endpoint.
    pub async fn timecode_for(
        &self,
        participant_id: impl Into<ParticipantId>,
    ) -> Option<Timecode> {
        let participant_id = participant_id.into();
        self.endpoint(&participant_id)
            .await
            .map(|ep| ep.clock().now())
    }

    /// Marshal and send one video frame
    ///
    /// Returns Ok(false) when the participant has no live endpoint.
    pub async fn submit_video_frame(
        &self,
        participant_id: impl Into<ParticipantId>,
        width: u32,
        height: u32,
        pixels: impl Into<PixelBuffer>,
    ) -> Result<bool> {
        let participant_id = participant_id.into();

        let Some(endpoint) = self.endpoint(&participant_id).await else {
            return Ok(false);
        };

        let raw = RawVideo::new(width, height, pixels.into()).map_err(|e| {
            tracing::debug!(participant = %participant_id, error = %e, "Video frame dropped");
            e
        })?;

        if !endpoint.is_active() {
            return Ok(false);
        }

        let timecode = endpoint.clock().now();
        let frame = raw.into_frame(self.config.frame_rate, self.config.alpha_policy, timecode);
        let resolution = frame.resolution();

        let sent = self.bounded(endpoint.sender().send_video(frame)).await;
        if let Err(e) = sent {
            // Lost the race with teardown
            if !endpoint.is_active() {
                return Ok(false);
            }
            return Err(self.send_failed(&endpoint, "video", e));
        }

        let count = endpoint.record_video(resolution, Instant::now());
        if self.config.stats_log_every > 0 && count % self.config.stats_log_every == 0 {
            tracing::info!(
                participant = %participant_id,
                "{}",
                endpoint.stats().summary(endpoint.publish_name())
            );
        }

        Ok(true)
    }

    /// Marshal and send one stereo audio frame
    ///
    /// Returns Ok(false) when the participant has no live endpoint.
    pub async fn submit_audio_frame(
        &self,
        participant_id: impl Into<ParticipantId>,
        left: &[f32],
        right: &[f32],
        sample_rate: u32,
    ) -> Result<bool> {
        let participant_id = participant_id.into();

        let Some(endpoint) = self.endpoint(&participant_id).await else {
            return Ok(false);
        };

        let raw = RawAudio::planar(left, right, sample_rate).map_err(|e| {
            tracing::debug!(participant = %participant_id, error = %e, "Audio frame dropped");
            e
        })?;

        if !endpoint.is_active() {
            return Ok(false);
        }

        let samples = raw.samples_per_channel();
        let frame = raw.into_frame(endpoint.clock().now());

        let sent = self.bounded(endpoint.sender().send_audio(frame)).await;
        if let Err(e) = sent {
            if !endpoint.is_active() {
                return Ok(false);
            }
            return Err(self.send_failed(&endpoint, "audio", e));
        }

        endpoint.record_audio(samples, sample_rate, Instant::now());
        Ok(true)
    }

    /// Periodically log the status of every endpoint
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_stats_task(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let endpoints = manager.endpoints.read().await;
                for ep in endpoints.values() {
                    tracing::info!(
                        participant = %ep.participant_id(),
                        "{}",
                        ep.stats().summary(ep.publish_name())
                    );
                }
            }
        })
    }

    /// Acquire a handle, retrying while the name is reserved
    pub async fn acquire(&self, name: &str) -> Result<AcquireOutcome<E::Sender>> {
        let attempts = self.config.max_attempts();

        for attempt in 1..=attempts {
            let call = self
                .engine
                .engine()
                .create_sender(name, &self.config.sender_options);
            let result = self.bounded(call).await;

            match result {
                Ok(sender) => return Ok(AcquireOutcome::Acquired(sender)),
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        name = name,
                        attempt = attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Publish name still reserved"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_backoff).await;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        name = name,
                        attempt = attempt,
                        error = %e,
                        "Failed to create sender"
                    );
                    return Err(e.into());
                }
            }
        }

        Ok(AcquireOutcome::Exhausted { attempts })
    }

    /// Remove a participant's endpoint from the map
    async fn take_endpoint(
        &self,
        participant_id: &ParticipantId,
    ) -> Option<Arc<StreamEndpoint<E::Sender>>> {
        let endpoint = self.endpoints.write().await.remove(participant_id)?;
        endpoint.set_state(EndpointState::Destroying);
        Some(endpoint)
    }

    /// Remove whichever other participant currently holds `name`
    async fn take_by_name(
        &self,
        name: &str,
        except: &ParticipantId,
    ) -> Option<Arc<StreamEndpoint<E::Sender>>> {
        let mut endpoints = self.endpoints.write().await;
        let holder = endpoints
            .iter()
            .find(|(id, ep)| *id != except && ep.publish_name() == name)
            .map(|(id, _)| id.clone())?;

        let endpoint = endpoints.remove(&holder)?;
        endpoint.set_state(EndpointState::Destroying);
        Some(endpoint)
    }

    /// Release an endpoint's handle; failures are logged, never retried
    async fn teardown(&self, endpoint: &StreamEndpoint<E::Sender>, reason: Teardown) {
        let stats = endpoint.stats();

        match reason {
            Teardown::Removed => tracing::info!(
                participant = %endpoint.participant_id(),
                name = %endpoint.publish_name(),
                frames = stats.video_frames,
                audio_frames = stats.audio_frames,
                fps = stats.fps(),
                "Removing endpoint"
            ),
            Teardown::Replaced => tracing::info!(
                participant = %endpoint.participant_id(),
                name = %endpoint.publish_name(),
                "Closing existing endpoint before recreate"
            ),
            Teardown::Evicted => tracing::info!(
                participant = %endpoint.participant_id(),
                name = %endpoint.publish_name(),
                "Publish name taken over by another participant"
            ),
        }

        if let Err(source) = self.bounded(endpoint.sender().destroy()).await {
            let err = Error::Teardown {
                name: endpoint.publish_name().to_string(),
                source,
            };
            tracing::warn!(
                participant = %endpoint.participant_id(),
                error = %err,
                "Handle release failed"
            );
        }

        endpoint.set_state(EndpointState::Removed);
    }

    fn send_failed(
        &self,
        endpoint: &StreamEndpoint<E::Sender>,
        kind: &'static str,
        source: EngineError,
    ) -> Error {
        if endpoint.record_send_failure() {
            let stats = endpoint.stats();
            tracing::error!(
                participant = %endpoint.participant_id(),
                name = %endpoint.publish_name(),
                kind = kind,
                state = ?endpoint.state(),
                video_frames = stats.video_frames,
                audio_frames = stats.audio_frames,
                resolution = ?stats.resolution,
                error = %source,
                "Send failed (further failures on this endpoint are not logged)"
            );
        } else {
            tracing::trace!(
                name = %endpoint.publish_name(),
                kind = kind,
                error = %source,
                "Send failed"
            );
        }

        Error::SendFailure {
            name: endpoint.publish_name().to_string(),
            source,
        }
    }

    /// Run a native call under `native_call_timeout`
    async fn bounded<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, EngineError>>,
    ) -> std::result::Result<T, EngineError> {
        let timeout = self.config.native_call_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout(timeout)),
        }
    }

    fn begin_transition(
        &self,
        participant_id: &ParticipantId,
        state: EndpointState,
    ) -> TransitionGuard<'_> {
        self.transitions.lock().insert(participant_id.clone(), state);
        TransitionGuard {
            transitions: &self.transitions,
            participant_id: participant_id.clone(),
        }
    }
}

/// Clears a participant's in-flight state when the transition ends
struct TransitionGuard<'a> {
    transitions: &'a Mutex<HashMap<ParticipantId, EndpointState>>,
    participant_id: ParticipantId,
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.transitions.lock().remove(&self.participant_id);
    }
}
