//! Configuration for the athlete vitals monitor.

use serde::{Deserialize, Serialize};

/// Allowed range for the refresh interval, in seconds.
pub const REFRESH_INTERVAL_RANGE: (u64, u64) = (1, 60);

/// Allowed range for the history bound.
pub const HISTORY_LIMIT_RANGE: (usize, usize) = (10, 1000);

/// Live configuration for the monitor.
///
/// Updates are validated as a whole; a rejected candidate leaves the
/// previous configuration untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// How often the scheduler refreshes telemetry, in seconds (1-60)
    pub refresh_interval_secs: u64,

    /// Maximum number of readings kept in the rolling history (10-1000)
    pub history_limit: usize,

    /// Heart-rate classification thresholds
    pub heart_rate_bands: HeartRateBands,

    /// Saturation classification thresholds
    pub saturation_bands: SaturationBands,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 2,
            history_limit: 50,
            heart_rate_bands: HeartRateBands::default(),
            saturation_bands: SaturationBands::default(),
        }
    }
}

impl MonitorConfig {
    /// Validate every field, returning the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min_interval, max_interval) = REFRESH_INTERVAL_RANGE;
        if self.refresh_interval_secs < min_interval || self.refresh_interval_secs > max_interval {
            return Err(ConfigError::IntervalOutOfRange(self.refresh_interval_secs));
        }

        let (min_limit, max_limit) = HISTORY_LIMIT_RANGE;
        if self.history_limit < min_limit || self.history_limit > max_limit {
            return Err(ConfigError::HistoryLimitOutOfRange(self.history_limit));
        }

        self.heart_rate_bands.validate()?;
        self.saturation_bands.validate()?;

        Ok(())
    }
}

/// Ascending heart-rate thresholds, in bpm.
///
/// Readings below `low` are low, `[low, normal)` normal, `[normal, high)`
/// elevated, and `high` upwards critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateBands {
    pub low: u32,
    pub normal: u32,
    pub high: u32,
}

impl Default for HeartRateBands {
    fn default() -> Self {
        Self {
            low: 60,
            normal: 100,
            high: 150,
        }
    }
}

impl HeartRateBands {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.low < self.normal && self.normal < self.high {
            Ok(())
        } else {
            Err(ConfigError::BandsNotAscending("heart_rate_bands"))
        }
    }
}

/// Ascending saturation thresholds, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaturationBands {
    pub low: f64,
    pub good: f64,
}

impl Default for SaturationBands {
    fn default() -> Self {
        Self {
            low: 95.0,
            good: 98.0,
        }
    }
}

impl SaturationBands {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.low < self.good {
            Ok(())
        } else {
            Err(ConfigError::BandsNotAscending("saturation_bands"))
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    IntervalOutOfRange(u64),
    HistoryLimitOutOfRange(usize),
    BandsNotAscending(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IntervalOutOfRange(v) => {
                let (min, max) = REFRESH_INTERVAL_RANGE;
                write!(f, "refresh interval {v}s out of range ({min}-{max}s)")
            }
            ConfigError::HistoryLimitOutOfRange(v) => {
                let (min, max) = HISTORY_LIMIT_RANGE;
                write!(f, "history limit {v} out of range ({min}-{max})")
            }
            ConfigError::BandsNotAscending(which) => {
                write!(f, "{which} thresholds must be strictly ascending")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
