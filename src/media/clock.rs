//! Per-participant A/V clock
//!
//! Video and audio frames from the same participant are stamped from one
//! shared origin so a receiver can line the two streams up on timecode alone.
//! The origin is latched on the first frame of either kind.
//!
//! Timecodes are in 100-nanosecond ticks:
//!
//! ```text
//! 10_000_000 ticks == 1 second
//!     400_000 ticks == 40 ms (one frame at 25 fps)
//! ```
//!
//! The clock lives inside its endpoint, so recreating an endpoint also resets
//! the origin to zero. Receivers see the timeline restart after a reconnect.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;

use tokio::time::Instant;

/// Number of timecode ticks per second
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Frame timestamp in 100ns ticks since the participant's clock origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timecode(pub i64);

impl Timecode {
    pub const ZERO: Timecode = Timecode(0);

    /// Raw tick count
    pub fn ticks(self) -> i64 {
        self.0
    }

    /// Convert a duration to ticks, truncating toward zero
    pub fn from_duration(duration: std::time::Duration) -> Self {
        let ticks = duration.as_nanos() / 100;
        Timecode(i64::try_from(ticks).unwrap_or(i64::MAX))
    }

    /// Timecode as seconds
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / TICKS_PER_SECOND as f64
    }
}

impl std::fmt::Display for Timecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// Monotonic timecode source for one participant
#[derive(Debug, Default)]
pub struct ParticipantClock {
    /// Latched on the first call
    origin: OnceLock<Instant>,
    /// Highest tick handed out so far
    last: AtomicI64,
}

impl ParticipantClock {
    /// Create a clock with no origin yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame has been stamped yet
    pub fn is_started(&self) -> bool {
        self.origin.get().is_some()
    }

    /// Current timecode, latching the origin on first use
    pub fn now(&self) -> Timecode {
        self.at(Instant::now())
    }

    /// Timecode for the given instant
    ///
    /// Never returns less than a value previously returned by this clock,
    /// even when callers race with out-of-order instants.
    pub fn at(&self, now: Instant) -> Timecode {
        let origin = *self.origin.get_or_init(|| now);
        let ticks = Timecode::from_duration(now.saturating_duration_since(origin)).0;
        let prev = self.last.fetch_max(ticks, Ordering::AcqRel);
        Timecode(prev.max(ticks))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_from_duration_truncates() {
        assert_eq!(Timecode::from_duration(Duration::from_nanos(199)).ticks(), 1);
        assert_eq!(Timecode::from_duration(Duration::from_millis(40)).ticks(), 400_000);
        assert_eq!(Timecode::from_duration(Duration::from_secs(1)).ticks(), TICKS_PER_SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_latches_origin() {
        let clock = ParticipantClock::new();
        assert!(!clock.is_started());

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(clock.now(), Timecode::ZERO);
        assert!(clock.is_started());

        tokio::time::advance(Duration::from_millis(40)).await;
        assert_eq!(clock.now().ticks(), 400_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_across_calls() {
        let clock = ParticipantClock::new();
        let mut prev = clock.now();

        for step in [0u64, 1, 0, 33, 7, 0, 1000] {
            tokio::time::advance(Duration::from_millis(step)).await;
            let next = clock.now();
            assert!(next >= prev);
            prev = next;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_instant_does_not_go_backwards() {
        let clock = ParticipantClock::new();
        let early = Instant::now();
        clock.at(early);

        let later = early + Duration::from_millis(100);
        let tc = clock.at(later);
        assert_eq!(tc.ticks(), 1_000_000);

        // A caller holding an older instant still sees the latest tick
        assert_eq!(clock.at(early + Duration::from_millis(10)), tc);
    }

    #[test]
    fn test_display() {
        assert_eq!(Timecode(12_345_678).to_string(), "1.235s");
    }
}
