//! Runtime configuration.

use crate::clock::Duration;
use crate::models::ModelCatalog;
use crate::tasks::{RetryPolicy, TrackingPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for the generation subsystem.
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Cadence at which the host calls `tick`.
    pub tick_interval_ms: u64,
    /// Percent added per tick by the simulated progress source.
    pub progress_step: u8,
    /// Longer edge of generated elements, in page units.
    pub base_edge: f64,
    /// Gap between cells of a batch.
    pub grid_gap: f64,
    /// Quiet period before selection bounds are republished.
    pub settle_delay_ms: u64,
    /// Minimum change, in screen pixels, that counts as movement.
    pub settle_threshold_px: f64,
    /// How long user notices stay visible.
    pub notice_duration_ms: u64,
    pub tracking: TrackingPolicy,
    pub retry: RetryPolicy,
    /// Select the elements of a batch once it completes.
    pub select_on_complete: bool,
    pub models: ModelCatalog,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 150,
            progress_step: 5,
            base_edge: crate::layout::DEFAULT_BASE_EDGE,
            grid_gap: crate::layout::DEFAULT_GRID_GAP,
            settle_delay_ms: 800,
            settle_threshold_px: 1.0,
            notice_duration_ms: 3_500,
            tracking: TrackingPolicy::default(),
            retry: RetryPolicy::default(),
            select_on_complete: true,
            models: ModelCatalog::builtin(),
        }
    }
}

impl StudioConfig {
    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_duration_ms)
    }

    /// Expected time for a simulated generation: ticks to reach 100 times the interval.
    pub fn estimated_duration(&self) -> Duration {
        let step = u32::from(self.progress_step.max(1));
        let ticks = 100u32.div_ceil(step);
        self.tick_interval() * ticks
    }
}
