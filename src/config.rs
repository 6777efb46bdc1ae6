use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::ViewerError;

pub const DEFAULT_INTERVAL_SECS: f64 = 0.5;
pub const DEFAULT_TICK_HZ: f64 = 100.0;
pub const DEFAULT_WINDOW_WIDTH: u32 = 800;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 600;

/// Viewer settings - loadable from JSON, overridable with the builder setters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Start in playing mode (`wait` paces by interval) instead of paused
    pub play: bool,
    /// Minimum time a frame stays on screen before `wait` releases the producer
    pub interval_secs: f64,
    /// Create the window at construction instead of on the first `show`
    pub eager: bool,
    pub title: String,
    /// Fixed window size; derived from the first frame when absent
    pub size: Option<[u32; 2]>,
    pub resizable: bool,
    /// Paint tick rate
    pub tick_hz: f64,
    /// Fraction of the window the frame may cover when fitted
    pub margin: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            play: true,
            interval_secs: DEFAULT_INTERVAL_SECS,
            eager: true,
            title: "imgviz".to_string(),
            size: None,
            resizable: true,
            tick_hz: DEFAULT_TICK_HZ,
            margin: 1.0,
        }
    }
}

impl ViewerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play(mut self, play: bool) -> Self {
        self.play = play;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval_secs = interval.as_secs_f64();
        self
    }

    pub fn eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.size = Some([width, height]);
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    pub fn tick_hz(mut self, hz: f64) -> Self {
        self.tick_hz = hz;
        self
    }

    pub fn margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Interval as a `Duration`; out of range values saturate (`validate` rejects them)
    pub fn interval_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Paint tick period; falls back to the default rate when `tick_hz` is out of range
    pub fn tick_period(&self) -> Duration {
        schedulable(1.0 / self.tick_hz)
            .unwrap_or_else(|| Duration::from_secs_f64(1.0 / DEFAULT_TICK_HZ))
    }

    pub fn validate(&self) -> Result<(), ViewerError> {
        if self.interval_secs < 0.0 || schedulable(self.interval_secs).is_none() {
            return Err(ViewerError::Config(format!(
                "interval must be a non-negative number of seconds, got {}",
                self.interval_secs
            )));
        }
        if !self.tick_hz.is_finite()
            || self.tick_hz <= 0.0
            || schedulable(1.0 / self.tick_hz).is_none()
        {
            return Err(ViewerError::Config(format!(
                "tick rate must be positive and give a representable period, got {}",
                self.tick_hz
            )));
        }
        if !(self.margin > 0.0 && self.margin <= 1.0) {
            return Err(ViewerError::Config(format!(
                "margin must be in (0, 1], got {}",
                self.margin
            )));
        }
        if let Some([width, height]) = self.size {
            if width == 0 || height == 0 {
                return Err(ViewerError::Config(format!(
                    "window size must be non-zero, got {width}x{height}"
                )));
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ViewerError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| ViewerError::Config(format!("failed to parse configuration: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ViewerError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| ViewerError::Config(format!("failed to read {}: {err}", path.display())))?;
        Self::from_json_str(&json)
    }
}

/// `secs` as a `Duration` that can still be added to the current instant
pub fn schedulable(secs: f64) -> Option<Duration> {
    let duration = Duration::try_from_secs_f64(secs).ok()?;
    Instant::now().checked_add(duration).map(|_| duration)
}
