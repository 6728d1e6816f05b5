//! Statistics derived from endpoint counters
//!
//! Nothing here is stored: every value is computed from the counters an
//! endpoint already owns, at the moment it is asked for.

use std::time::Duration;

/// Video resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Counter snapshot for one endpoint
#[derive(Debug, Clone, Default)]
pub struct EndpointStats {
    /// Video frames delivered
    pub video_frames: u64,
    /// Audio frames delivered
    pub audio_frames: u64,
    /// Audio samples delivered, per channel
    pub audio_samples: u64,
    /// Frames the engine rejected
    pub send_failures: u64,
    /// Time since the endpoint was created
    pub duration: Duration,
    /// Last observed resolution
    pub resolution: Option<Resolution>,
    /// Last observed sample rate
    pub sample_rate: Option<u32>,
    /// Time since the last video frame
    pub since_last_video: Option<Duration>,
    /// Time since the last audio frame
    pub since_last_audio: Option<Duration>,
}

impl EndpointStats {
    /// Average video frame rate since creation
    pub fn calculated_framerate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.video_frames as f64 / secs
        } else {
            0.0
        }
    }

    /// Average video frame rate, rounded to whole frames
    pub fn fps(&self) -> u32 {
        self.calculated_framerate().round() as u32
    }

    /// Seconds of audio delivered
    pub fn audio_seconds(&self) -> f64 {
        match self.sample_rate {
            Some(rate) if rate > 0 => self.audio_samples as f64 / rate as f64,
            _ => 0.0,
        }
    }

    /// One-line human readable summary
    pub fn summary(&self, name: &str) -> String {
        let resolution = self
            .resolution
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "{}: {} frames, {} fps, {}, {:.1}s audio",
            name,
            self.video_frames,
            self.fps(),
            resolution,
            self.audio_seconds()
        )
    }
}

/// Status row returned by the status query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    pub participant_id: String,
    pub publish_name: String,
    pub frame_count: u64,
    pub fps: u32,
    /// None until the first frame arrives
    pub resolution: Option<Resolution>,
}

impl EndpointStatus {
    /// Resolution as text, "unknown" before the first frame
    pub fn resolution_label(&self) -> String {
        self.resolution
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Bridge-wide status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeStatus {
    /// Whether the publishing engine is up
    pub initialized: bool,
    /// Number of live endpoints
    pub endpoint_count: usize,
    pub endpoints: Vec<EndpointStatus>,
}

impl std::fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Engine initialized: {}", self.initialized)?;
        writeln!(f, "Active senders: {}", self.endpoint_count)?;
        if self.endpoints.is_empty() {
            return write!(f, "No active senders");
        }
        for (i, ep) in self.endpoints.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{}: {} frames, {} fps, {}",
                ep.publish_name,
                ep.frame_count,
                ep.fps,
                ep.resolution_label()
            )?;
        }
        Ok(())
    }
}
