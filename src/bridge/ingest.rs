//! Fire-and-forget frame ingestion
//!
//! The capture layer pushes frames at video/audio rate and must never wait on
//! the bridge. [`IngestHandle`] does a `try_send` onto a bounded queue. A
//! dispatcher fans the queue out into one lane per participant, each drained
//! by its own task, so a slow or stalled send only holds up that
//! participant's frames:
//!
//! ```text
//!   IngestHandle ──► queue ──► dispatcher ──┬──► lane(p-1) ──► manager
//!                                           ├──► lane(p-2) ──► manager
//!                                           └──► lane(p-n) ──► manager
//! ```
//!
//! A full queue or a full lane drops the frame and counts it. Lanes retire
//! once their participant has no endpoint and are recreated on demand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::endpoint::{EndpointManager, ParticipantId};
use crate::engine::PublishEngine;
use crate::error::Error;
use crate::media::PixelBuffer;

/// A frame queued for the worker
#[derive(Debug)]
pub enum IngestCommand {
    Video {
        participant_id: ParticipantId,
        width: u32,
        height: u32,
        pixels: PixelBuffer,
    },
    Audio {
        participant_id: ParticipantId,
        left: Vec<f32>,
        right: Vec<f32>,
        sample_rate: u32,
    },
}

impl IngestCommand {
    /// Participant the frame belongs to
    pub fn participant_id(&self) -> &ParticipantId {
        match self {
            IngestCommand::Video { participant_id, .. } => participant_id,
            IngestCommand::Audio { participant_id, .. } => participant_id,
        }
    }
}

/// Cloneable, non-blocking entry point for frames
#[derive(Clone)]
pub struct IngestHandle {
    tx: mpsc::Sender<IngestCommand>,
    dropped: Arc<AtomicU64>,
}

/// Receiving side of an [`IngestHandle`], consumed by [`run_ingest`]
pub struct IngestQueue {
    rx: mpsc::Receiver<IngestCommand>,
    dropped: Arc<AtomicU64>,
    lane_capacity: usize,
}

impl IngestHandle {
    /// Create a handle and the queue its worker drains
    ///
    /// `capacity` bounds the shared queue and each participant lane.
    pub fn channel(capacity: usize) -> (Self, IngestQueue) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        let handle = Self {
            tx,
            dropped: Arc::clone(&dropped),
        };
        let queue = IngestQueue {
            rx,
            dropped,
            lane_capacity: capacity,
        };
        (handle, queue)
    }

    /// Queue a video frame; returns false if it was dropped
    pub fn submit_video(
        &self,
        participant_id: impl Into<ParticipantId>,
        width: u32,
        height: u32,
        pixels: impl Into<PixelBuffer>,
    ) -> bool {
        self.enqueue(IngestCommand::Video {
            participant_id: participant_id.into(),
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// Queue a stereo audio frame; returns false if it was dropped
    pub fn submit_audio(
        &self,
        participant_id: impl Into<ParticipantId>,
        left: Vec<f32>,
        right: Vec<f32>,
        sample_rate: u32,
    ) -> bool {
        self.enqueue(IngestCommand::Audio {
            participant_id: participant_id.into(),
            left,
            right,
            sample_rate,
        })
    }

    /// Frames dropped because the queue or a lane was full, or closed
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn enqueue(&self, command: IngestCommand) -> bool {
        match self.tx.try_send(command) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::trace!(dropped = dropped, "Ingest queue full, frame dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Dispatch queued frames to per-participant lanes until every handle is
/// dropped, then wait for the lanes to drain
pub async fn run_ingest<E: PublishEngine>(manager: Arc<EndpointManager<E>>, queue: IngestQueue) {
    let IngestQueue {
        mut rx,
        dropped,
        lane_capacity,
    } = queue;
    let mut lanes: HashMap<ParticipantId, mpsc::Sender<IngestCommand>> = HashMap::new();
    let mut workers = JoinSet::new();

    while let Some(command) = rx.recv().await {
        let command = match lanes.get(command.participant_id()) {
            Some(lane) => match lane.try_send(command) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(command)) => {
                    let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::trace!(
                        participant = %command.participant_id(),
                        dropped = total,
                        "Ingest lane full, frame dropped"
                    );
                    continue;
                }
                // Lane retired; open a fresh one below
                Err(mpsc::error::TrySendError::Closed(command)) => command,
            },
            None => command,
        };

        lanes.retain(|_, lane| !lane.is_closed());
        while workers.try_join_next().is_some() {}

        let participant_id = command.participant_id().clone();
        let (tx, lane_rx) = mpsc::channel(lane_capacity);
        // A new lane always has room for its first frame
        let _ = tx.try_send(command);
        workers.spawn(run_lane(
            Arc::clone(&manager),
            participant_id.clone(),
            lane_rx,
        ));
        tracing::trace!(participant = %participant_id, "Ingest lane opened");
        lanes.insert(participant_id, tx);
    }

    drop(lanes);
    while workers.join_next().await.is_some() {}
    tracing::debug!("Ingest worker stopped");
}

/// Drain one participant's frames in order
async fn run_lane<E: PublishEngine>(
    manager: Arc<EndpointManager<E>>,
    participant_id: ParticipantId,
    mut rx: mpsc::Receiver<IngestCommand>,
) {
    while let Some(command) = rx.recv().await {
        let delivered = deliver(&manager, command).await;

        // No endpoint: stop taking frames, finish what is already queued
        if !delivered && manager.endpoint(&participant_id).await.is_none() {
            rx.close();
        }
    }
    tracing::trace!(participant = %participant_id, "Ingest lane retired");
}

async fn deliver<E: PublishEngine>(manager: &EndpointManager<E>, command: IngestCommand) -> bool {
    let result = match command {
        IngestCommand::Video {
            participant_id,
            width,
            height,
            pixels,
        } => {
            manager
                .submit_video_frame(participant_id, width, height, pixels)
                .await
        }
        IngestCommand::Audio {
            participant_id,
            left,
            right,
            sample_rate,
        } => {
            manager
                .submit_audio_frame(participant_id, &left, &right, sample_rate)
                .await
        }
    };

    match result {
        Ok(sent) => sent,
        // Already logged once per endpoint by the manager
        Err(Error::SendFailure { .. }) => false,
        Err(e) => {
            tracing::debug!(error = %e, "Frame dropped");
            false
        }
    }
}
