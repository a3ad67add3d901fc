//! Threshold classification for vital-sign readings.
//!
//! Pure functions mapping a numeric reading to a qualitative status plus an
//! alert severity. Bands are half-open on the lower edge, so a value exactly
//! equal to a threshold falls into the higher band.

use crate::config::{HeartRateBands, SaturationBands};
use serde::{Deserialize, Serialize};

/// Qualitative status of a classified vital sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalStatus {
    Low,
    Normal,
    Elevated,
    Critical,
    Good,
    Excellent,
}

/// Alert severity attached to a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Ok,
    Warning,
    Critical,
}

/// A classified vital sign: status plus severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub status: VitalStatus,
    pub alert: AlertLevel,
}

/// Classify a heart rate against the configured bands.
///
/// Partitions all of `u32` into exactly one band: `< low` is low,
/// `[low, normal)` normal, `[normal, high)` elevated, `>= high` critical.
pub fn classify_heart_rate(bpm: u32, bands: &HeartRateBands) -> Classification {
    if bpm < bands.low {
        Classification {
            status: VitalStatus::Low,
            alert: AlertLevel::Warning,
        }
    } else if bpm < bands.normal {
        Classification {
            status: VitalStatus::Normal,
            alert: AlertLevel::Ok,
        }
    } else if bpm < bands.high {
        Classification {
            status: VitalStatus::Elevated,
            alert: AlertLevel::Warning,
        }
    } else {
        Classification {
            status: VitalStatus::Critical,
            alert: AlertLevel::Critical,
        }
    }
}

/// Classify an oxygen saturation percentage against the configured bands.
///
/// Out-of-range input (negative, above 100) is classified by the same rules.
pub fn classify_saturation(pct: f64, bands: &SaturationBands) -> Classification {
    if pct >= bands.good {
        Classification {
            status: VitalStatus::Excellent,
            alert: AlertLevel::Ok,
        }
    } else if pct >= bands.low {
        Classification {
            status: VitalStatus::Good,
            alert: AlertLevel::Warning,
        }
    } else {
        Classification {
            status: VitalStatus::Low,
            alert: AlertLevel::Critical,
        }
    }
}
