//! Bridge configuration

use std::time::Duration;

use crate::engine::SenderOptions;
use crate::media::{AlphaPolicy, FrameRate};

/// Configuration for the endpoint manager and its boundary adapters
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Prefix of every publish name
    pub name_prefix: String,

    /// Wait after releasing a handle before its name is reused
    pub release_delay: Duration,

    /// Wait between attempts when the engine reports a reserved name
    pub retry_backoff: Duration,

    /// Retries after the first acquisition attempt
    pub max_retries: u32,

    /// Bound on native acquire/release calls
    pub native_call_timeout: Duration,

    /// Declared video frame rate
    pub frame_rate: FrameRate,

    /// How alpha is declared on outgoing video
    pub alpha_policy: AlphaPolicy,

    /// Options passed to every new sender
    pub sender_options: SenderOptions,

    /// Log a rate summary every N video frames (0 = never)
    pub stats_log_every: u64,

    /// Interval of the periodic status log (None = disabled)
    pub stats_interval: Option<Duration>,

    /// Capacity of the ingestion queue
    pub ingest_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name_prefix: "IVS".to_string(),
            release_delay: Duration::from_millis(500),
            retry_backoff: Duration::from_millis(1500),
            max_retries: 2,
            native_call_timeout: Duration::from_secs(5),
            frame_rate: FrameRate::default(),
            alpha_policy: AlphaPolicy::Opaque,
            sender_options: SenderOptions::default(),
            stats_log_every: 300,
            stats_interval: Some(Duration::from_secs(10)),
            ingest_capacity: 256,
        }
    }
}

impl BridgeConfig {
    /// Set the publish name prefix
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Set the release grace period
    pub fn release_delay(mut self, delay: Duration) -> Self {
        self.release_delay = delay;
        self
    }

    /// Set the retry backoff
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the retry bound
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the native call timeout
    pub fn native_call_timeout(mut self, timeout: Duration) -> Self {
        self.native_call_timeout = timeout;
        self
    }

    /// Set the declared frame rate
    pub fn frame_rate(mut self, rate: FrameRate) -> Self {
        self.frame_rate = rate;
        self
    }

    /// Set the alpha policy
    pub fn alpha_policy(mut self, policy: AlphaPolicy) -> Self {
        self.alpha_policy = policy;
        self
    }

    /// Set the sender options
    pub fn sender_options(mut self, options: SenderOptions) -> Self {
        self.sender_options = options;
        self
    }

    /// Set how often the per-endpoint rate summary is logged
    pub fn stats_log_every(mut self, frames: u64) -> Self {
        self.stats_log_every = frames;
        self
    }

    /// Set or disable the periodic status log
    pub fn stats_interval(mut self, interval: Option<Duration>) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Set the ingestion queue capacity
    pub fn ingest_capacity(mut self, capacity: usize) -> Self {
        self.ingest_capacity = capacity.max(1);
        self
    }

    /// Total acquisition attempts per creation
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();

        assert_eq!(config.name_prefix, "IVS");
        assert_eq!(config.release_delay, Duration::from_millis(500));
        assert_eq!(config.retry_backoff, Duration::from_millis(1500));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.frame_rate, FrameRate::new(25_000, 1_000));
        assert_eq!(config.alpha_policy, AlphaPolicy::Opaque);
        assert!(!config.sender_options.clock_video);
        assert!(!config.sender_options.clock_audio);
    }

    #[test]
    fn test_builder_chaining() {
        let config = BridgeConfig::default()
            .name_prefix("CALL")
            .release_delay(Duration::from_millis(10))
            .retry_backoff(Duration::from_millis(20))
            .max_retries(5)
            .alpha_policy(AlphaPolicy::Preserve)
            .stats_interval(None)
            .ingest_capacity(0);

        assert_eq!(config.name_prefix, "CALL");
        assert_eq!(config.release_delay, Duration::from_millis(10));
        assert_eq!(config.retry_backoff, Duration::from_millis(20));
        assert_eq!(config.max_attempts(), 6);
        assert_eq!(config.alpha_policy, AlphaPolicy::Preserve);
        assert!(config.stats_interval.is_none());
        assert_eq!(config.ingest_capacity, 1);
    }
}
