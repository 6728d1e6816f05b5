//! In-process publishing engine
//!
//! Publishes each named source on a `tokio::sync::broadcast` channel so any
//! number of in-process receivers can watch it. Useful for tests, demos and
//! for hosts that relay frames themselves.
//!
//! # Name reservation
//!
//! Network discovery layers keep announcing a name for a short while after
//! its sender goes away. The loopback engine models that: after `destroy()`
//! the name stays reserved for `reservation` and `create_sender` on it fails
//! with [`EngineError::NameReserved`] until the window closes.
//!
//! # Zero-Copy Design
//!
//! Frame payloads are `bytes::Bytes`, so every receiver shares the same
//! allocation; only the descriptor is cloned per receiver.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::error::EngineError;
use crate::media::{AudioFrame, VideoFrame};

use super::{PublishEngine, PublishSender, SenderOptions};

/// A frame delivered to loopback receivers
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

/// Loopback engine configuration
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// How long a released name stays reserved
    pub reservation: Duration,
    /// Broadcast channel capacity per source
    pub channel_capacity: usize,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            reservation: Duration::from_millis(250),
            channel_capacity: 64,
        }
    }
}

impl LoopbackConfig {
    /// Set the reservation window
    pub fn reservation(mut self, window: Duration) -> Self {
        self.reservation = window;
        self
    }

    /// Set the per-source channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

enum Slot {
    Live {
        id: u64,
        tx: broadcast::Sender<OutboundFrame>,
    },
    Reserved {
        until: Instant,
    },
}

struct Inner {
    config: LoopbackConfig,
    slots: Mutex<HashMap<String, Slot>>,
    next_id: AtomicU64,
    create_attempts: AtomicU64,
}

/// Engine publishing on in-process broadcast channels
#[derive(Clone)]
pub struct LoopbackEngine {
    inner: Arc<Inner>,
}

impl LoopbackEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(LoopbackConfig::default())
    }

    /// Create an engine with custom configuration
    pub fn with_config(config: LoopbackConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                slots: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                create_attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Names currently announced
    pub fn sources(&self) -> Vec<String> {
        let slots = self.inner.slots.lock();
        let mut names: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Live { .. }))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Whether a source with this name is currently announced
    pub fn is_live(&self, name: &str) -> bool {
        matches!(self.inner.slots.lock().get(name), Some(Slot::Live { .. }))
    }

    /// Receive the frames published under `name`
    pub fn subscribe(&self, name: &str) -> Option<broadcast::Receiver<OutboundFrame>> {
        match self.inner.slots.lock().get(name) {
            Some(Slot::Live { tx, .. }) => Some(tx.subscribe()),
            _ => None,
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.inner.slots.lock().len()
    }

    /// Number of `create_sender` calls made so far, successful or not
    pub fn create_attempts(&self) -> u64 {
        self.inner.create_attempts.load(Ordering::Relaxed)
    }
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishEngine for LoopbackEngine {
    type Sender = LoopbackSender;

    fn initialize(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn create_sender(
        &self,
        name: &str,
        options: &SenderOptions,
    ) -> Result<LoopbackSender, EngineError> {
        self.inner.create_attempts.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        let mut slots = self.inner.slots.lock();
        slots.retain(|_, slot| !matches!(slot, Slot::Reserved { until } if *until <= now));

        match slots.get(name) {
            Some(Slot::Live { .. }) => return Err(EngineError::NameReserved(name.to_string())),
            Some(Slot::Reserved { until }) if now < *until => {
                return Err(EngineError::NameReserved(name.to_string()));
            }
            _ => {}
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, _) = broadcast::channel(self.inner.config.channel_capacity);
        slots.insert(name.to_string(), Slot::Live { id, tx: tx.clone() });

        tracing::debug!(
            name = name,
            id = id,
            clock_video = options.clock_video,
            clock_audio = options.clock_audio,
            "Loopback source announced"
        );

        Ok(LoopbackSender {
            name: name.to_string(),
            id,
            tx,
            destroyed: AtomicBool::new(false),
            inner: Arc::clone(&self.inner),
        })
    }
}

/// A live loopback source
pub struct LoopbackSender {
    name: String,
    id: u64,
    tx: broadcast::Sender<OutboundFrame>,
    destroyed: AtomicBool,
    inner: Arc<Inner>,
}

impl LoopbackSender {
    /// Published name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, frame: OutboundFrame) -> Result<(), EngineError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }
        // No receivers is not an error; the source is still announced
        let _ = self.tx.send(frame);
        Ok(())
    }
}

impl PublishSender for LoopbackSender {
    async fn send_video(&self, frame: VideoFrame) -> Result<(), EngineError> {
        self.publish(OutboundFrame::Video(frame))
    }

    async fn send_audio(&self, frame: AudioFrame) -> Result<(), EngineError> {
        self.publish(OutboundFrame::Audio(frame))
    }

    async fn destroy(&self) -> Result<(), EngineError> {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return Err(EngineError::Closed);
        }

        let mut slots = self.inner.slots.lock();
        if matches!(slots.get(&self.name), Some(Slot::Live { id, .. }) if *id == self.id) {
            let until = Instant::now() + self.inner.config.reservation;
            slots.insert(self.name.clone(), Slot::Reserved { until });
        }

        tracing::debug!(name = %self.name, id = self.id, "Loopback source withdrawn");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AlphaPolicy, FrameRate, RawVideo, Timecode};

    fn video() -> VideoFrame {
        RawVideo::new(2, 2, vec![0u8; 16].into())
            .unwrap()
            .into_frame(FrameRate::default(), AlphaPolicy::Opaque, Timecode::ZERO)
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let engine = LoopbackEngine::new();
        let sender = engine
            .create_sender("IVS-bob", &SenderOptions::default())
            .await
            .unwrap();

        let mut rx = engine.subscribe("IVS-bob").unwrap();
        sender.send_video(video()).await.unwrap();

        match rx.recv().await.unwrap() {
            OutboundFrame::Video(frame) => assert_eq!(frame.width, 2),
            other => panic!("unexpected frame {:?}", other),
        }
        assert_eq!(engine.sources(), vec!["IVS-bob".to_string()]);
    }

    #[tokio::test]
    async fn test_live_name_is_refused() {
        let engine = LoopbackEngine::new();
        let _first = engine
            .create_sender("IVS-bob", &SenderOptions::default())
            .await
            .unwrap();

        let second = engine.create_sender("IVS-bob", &SenderOptions::default()).await;
        assert!(matches!(second, Err(EngineError::NameReserved(_))));
        assert_eq!(engine.create_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reservation_window() {
        let config = LoopbackConfig::default().reservation(Duration::from_millis(300));
        let engine = LoopbackEngine::with_config(config);
        let opts = SenderOptions::default();

        let sender = engine.create_sender("IVS-bob", &opts).await.unwrap();
        sender.destroy().await.unwrap();
        assert!(!engine.is_live("IVS-bob"));

        assert!(matches!(
            engine.create_sender("IVS-bob", &opts).await,
            Err(EngineError::NameReserved(_))
        ));

        tokio::time::advance(Duration::from_millis(301)).await;
        assert!(engine.create_sender("IVS-bob", &opts).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_reservations_are_dropped() {
        let engine = LoopbackEngine::new();
        let opts = SenderOptions::default();

        for name in ["IVS-a", "IVS-b", "IVS-c"] {
            engine.create_sender(name, &opts).await.unwrap().destroy().await.unwrap();
        }
        assert_eq!(engine.slot_count(), 3);

        tokio::time::advance(Duration::from_secs(1)).await;
        let _live = engine.create_sender("IVS-d", &opts).await.unwrap();
        assert_eq!(engine.slot_count(), 1);
        assert_eq!(engine.sources(), vec!["IVS-d".to_string()]);
    }

    #[tokio::test]
    async fn test_send_after_destroy_fails() {
        let engine = LoopbackEngine::new();
        let sender = engine
            .create_sender("IVS-bob", &SenderOptions::default())
            .await
            .unwrap();

        sender.destroy().await.unwrap();
        assert_eq!(sender.send_video(video()).await, Err(EngineError::Closed));
        assert_eq!(sender.destroy().await, Err(EngineError::Closed));
    }

    #[tokio::test]
    async fn test_stale_destroy_keeps_new_source() {
        let config = LoopbackConfig::default().reservation(Duration::ZERO);
        let engine = LoopbackEngine::with_config(config);
        let opts = SenderOptions::default();

        let old = engine.create_sender("IVS-bob", &opts).await.unwrap();
        old.destroy().await.unwrap();
        let _new = engine.create_sender("IVS-bob", &opts).await.unwrap();

        // Destroying the old handle again must not withdraw the new source
        let _ = old.destroy().await;
        assert!(engine.is_live("IVS-bob"));
    }
}
