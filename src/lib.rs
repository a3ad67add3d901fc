//! Athlete Vitals Agent - real-time vitals monitoring and pass-game scoring.
//!
//! This crate ingests periodic vital-sign telemetry (heart rate, blood-oxygen
//! saturation, blink state) for a single tracked athlete from an NGSI-v2
//! context broker, classifies each reading against configurable thresholds,
//! and drives a pass-scoring game whose outcomes depend on the athlete's
//! current vitals.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Athlete Vitals Agent                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────────┐   ┌──────────────┐        │
//! │  │  Orion    │──▶│ AthleteMonitor│──▶│  Classifier  │        │
//! │  │  broker   │   │ (history+cfg) │   │  (bands)     │        │
//! │  └───────────┘   └───────┬───────┘   └──────────────┘        │
//! │        ▲                 │ current reading                   │
//! │        │ timer           ▼                                   │
//! │  ┌───────────┐   ┌───────────────┐                           │
//! │  │ Scheduler │   │  GameSession  │                           │
//! │  │ (refresh) │   │ (score/streak)│                           │
//! │  └───────────┘   └───────────────┘                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All process state lives in one [`server::AppState`] passed to every
//! handler; nothing is ambient, nothing is persisted across restarts.

pub mod classify;
pub mod config;
pub mod game;
pub mod monitor;
pub mod scheduler;
pub mod server;
pub mod telemetry;

// Re-export key types at crate root for convenience
pub use classify::{classify_heart_rate, classify_saturation, AlertLevel, Classification, VitalStatus};
pub use config::{ConfigError, HeartRateBands, MonitorConfig, SaturationBands};
pub use game::{ActionResult, GameError, GameSession, GameStats, Milestone, PassQuality, SessionReport};
pub use monitor::AthleteMonitor;
pub use scheduler::SchedulerHandle;
pub use telemetry::{BrokerConfig, FetchError, OrionSource, RawTelemetry, Reading, TelemetrySource};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
