//! Stream endpoint and lifecycle state
//!
//! An endpoint is shared between the lifecycle manager and in-flight
//! ingestion calls, so all of its counters are atomics and the remaining
//! mutable fields sit behind a short synchronous lock.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::media::ParticipantClock;
use crate::stats::{EndpointStats, EndpointStatus, Resolution};

use super::key::ParticipantId;

/// Lifecycle state of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// No endpoint and nothing in progress
    Idle,
    /// Handle acquisition in progress
    Creating,
    /// Publishing
    Active,
    /// Handle being released
    Destroying,
    /// Released and dropped from the manager
    Removed,
}

impl EndpointState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => EndpointState::Idle,
            1 => EndpointState::Creating,
            2 => EndpointState::Active,
            3 => EndpointState::Destroying,
            _ => EndpointState::Removed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            EndpointState::Idle => 0,
            EndpointState::Creating => 1,
            EndpointState::Active => 2,
            EndpointState::Destroying => 3,
            EndpointState::Removed => 4,
        }
    }
}

#[derive(Debug, Default)]
struct Activity {
    last_video_at: Option<Instant>,
    last_audio_at: Option<Instant>,
    resolution: Option<Resolution>,
    sample_rate: Option<u32>,
}

/// One published participant
pub struct StreamEndpoint<S> {
    participant_id: ParticipantId,
    display_label: Option<String>,
    publish_name: String,

    /// Publish handle owned by this endpoint
    sender: S,

    /// Shared A/V timeline; dies with the endpoint
    clock: ParticipantClock,

    state: AtomicU8,
    created_at: Instant,

    video_frames: AtomicU64,
    audio_frames: AtomicU64,
    audio_samples: AtomicU64,
    send_failures: AtomicU64,
    send_failure_logged: AtomicBool,

    activity: Mutex<Activity>,
}

impl<S> StreamEndpoint<S> {
    /// Create an active endpoint around a freshly acquired handle
    pub(crate) fn new(
        participant_id: ParticipantId,
        display_label: Option<String>,
        publish_name: String,
        sender: S,
    ) -> Self {
        Self {
            participant_id,
            display_label,
            publish_name,
            sender,
            clock: ParticipantClock::new(),
            state: AtomicU8::new(EndpointState::Active.as_u8()),
            created_at: Instant::now(),
            video_frames: AtomicU64::new(0),
            audio_frames: AtomicU64::new(0),
            audio_samples: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            send_failure_logged: AtomicBool::new(false),
            activity: Mutex::new(Activity::default()),
        }
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn display_label(&self) -> Option<&str> {
        self.display_label.as_deref()
    }

    pub fn publish_name(&self) -> &str {
        &self.publish_name
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn clock(&self) -> &ParticipantClock {
        &self.clock
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn state(&self) -> EndpointState {
        EndpointState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: EndpointState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Whether frames may still be sent on this endpoint
    pub fn is_active(&self) -> bool {
        self.state() == EndpointState::Active
    }

    pub fn video_frames(&self) -> u64 {
        self.video_frames.load(Ordering::Relaxed)
    }

    pub fn audio_frames(&self) -> u64 {
        self.audio_frames.load(Ordering::Relaxed)
    }

    /// Record a delivered video frame, returning the new frame count
    pub(crate) fn record_video(&self, resolution: Resolution, at: Instant) -> u64 {
        {
            let mut activity = self.activity.lock();
            activity.last_video_at = Some(at);
            activity.resolution = Some(resolution);
        }
        self.video_frames.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a delivered audio frame
    pub(crate) fn record_audio(&self, samples: u32, sample_rate: u32, at: Instant) -> u64 {
        {
            let mut activity = self.activity.lock();
            activity.last_audio_at = Some(at);
            activity.sample_rate = Some(sample_rate);
        }
        self.audio_samples.fetch_add(samples as u64, Ordering::Relaxed);
        self.audio_frames.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a send failure
    ///
    /// Returns true only for the first failure on this endpoint.
    pub(crate) fn record_send_failure(&self) -> bool {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
        !self.send_failure_logged.swap(true, Ordering::AcqRel)
    }

    /// Snapshot of the counters, derived at call time
    pub fn stats(&self) -> EndpointStats {
        let now = Instant::now();
        let activity = self.activity.lock();

        EndpointStats {
            video_frames: self.video_frames(),
            audio_frames: self.audio_frames(),
            audio_samples: self.audio_samples.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            duration: now.saturating_duration_since(self.created_at),
            resolution: activity.resolution,
            sample_rate: activity.sample_rate,
            since_last_video: activity.last_video_at.map(|t| now.saturating_duration_since(t)),
            since_last_audio: activity.last_audio_at.map(|t| now.saturating_duration_since(t)),
        }
    }

    /// Status row for this endpoint
    pub fn status(&self) -> EndpointStatus {
        let stats = self.stats();
        EndpointStatus {
            participant_id: self.participant_id.to_string(),
            publish_name: self.publish_name.clone(),
            frame_count: stats.video_frames,
            fps: stats.fps(),
            resolution: stats.resolution,
        }
    }
}
