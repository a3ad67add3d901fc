//! Athlete monitor: fetch, normalize, and age telemetry.
//!
//! Owns the current-reading cache, the bounded rolling history, the broker
//! connectivity flag, and the live configuration. All state lives behind one
//! write lock so a concurrent reader never observes a reading appended
//! without its trim, or a half-replaced configuration.

use crate::config::{ConfigError, MonitorConfig};
use crate::telemetry::{FetchError, Reading, TelemetrySource, FETCH_TIMEOUT};
use std::collections::VecDeque;
use tokio::sync::RwLock;

struct MonitorState {
    current: Option<Reading>,
    history: VecDeque<Reading>,
    connected: bool,
    config: MonitorConfig,
}

/// Monitors a single tracked athlete through a telemetry source.
pub struct AthleteMonitor {
    subject_id: String,
    source: Box<dyn TelemetrySource>,
    state: RwLock<MonitorState>,
}

impl AthleteMonitor {
    /// Create a monitor for one subject over the given source.
    pub fn new(subject_id: impl Into<String>, config: MonitorConfig, source: Box<dyn TelemetrySource>) -> Self {
        Self {
            subject_id: subject_id.into(),
            source,
            state: RwLock::new(MonitorState {
                current: None,
                history: VecDeque::new(),
                connected: false,
                config,
            }),
        }
    }

    /// Fetch the latest telemetry and fold it into the monitor state.
    ///
    /// On success the new reading becomes current, a copy is appended to the
    /// history (evicting the oldest entries past the bound), and the
    /// connectivity flag is raised. On any failure the cached reading and
    /// history are left untouched, connectivity is dropped, and `false` is
    /// returned. Failures never propagate past this boundary.
    pub async fn refresh(&self) -> bool {
        let fetched = match tokio::time::timeout(FETCH_TIMEOUT, self.source.fetch(&self.subject_id)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        match fetched {
            Ok(raw) => {
                let reading = Reading::from_raw(raw);
                let mut state = self.state.write().await;

                // Append and trim as one step under the write lock.
                state.history.push_back(reading.clone());
                let limit = state.config.history_limit;
                while state.history.len() > limit {
                    state.history.pop_front();
                }

                state.current = Some(reading);
                state.connected = true;
                true
            }
            Err(e) => {
                tracing::warn!(subject = %self.subject_id, "telemetry fetch failed: {e}");
                let mut state = self.state.write().await;
                state.connected = false;
                false
            }
        }
    }

    /// The most recent reading, if any fetch has succeeded.
    pub async fn current_reading(&self) -> Option<Reading> {
        self.state.read().await.current.clone()
    }

    /// Snapshot of the rolling history, oldest first.
    pub async fn history(&self) -> Vec<Reading> {
        self.state.read().await.history.iter().cloned().collect()
    }

    /// Number of readings currently held.
    pub async fn history_len(&self) -> usize {
        self.state.read().await.history.len()
    }

    /// Whether the last fetch attempt succeeded.
    pub async fn connected(&self) -> bool {
        self.state.read().await.connected
    }

    /// Snapshot of the live configuration.
    pub async fn config(&self) -> MonitorConfig {
        self.state.read().await.config.clone()
    }

    /// Validate and atomically install a new configuration.
    ///
    /// A rejected candidate leaves the previous configuration untouched. If
    /// the new history bound is smaller than the current history length, the
    /// history is truncated from the front immediately, under the same write
    /// lock as the replacement.
    pub async fn update_config(&self, candidate: MonitorConfig) -> Result<MonitorConfig, ConfigError> {
        candidate.validate()?;

        let mut state = self.state.write().await;
        while state.history.len() > candidate.history_limit {
            state.history.pop_front();
        }
        state.config = candidate.clone();
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::testing::{raw_with_vitals, ScriptedSource};

    fn monitor_with(source: ScriptedSource) -> AthleteMonitor {
        AthleteMonitor::new(
            "urn:ngsi-ld:Atleta:0001",
            MonitorConfig::default(),
            Box::new(source),
        )
    }

    #[tokio::test]
    async fn test_refresh_success_updates_state() {
        let source = ScriptedSource::new();
        source.push_ok(raw_with_vitals(88, 97.0));
        let monitor = monitor_with(source);

        assert!(monitor.refresh().await);
        assert!(monitor.connected().await);

        let reading = monitor.current_reading().await.expect("reading present");
        assert_eq!(reading.heart_rate, 88);
        assert_eq!(reading.saturation, 97.0);
        assert_eq!(monitor.history_len().await, 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_preserves_state() {
        let source = ScriptedSource::new();
        source.push_ok(raw_with_vitals(88, 97.0));
        source.push_err(FetchError::Status(503));
        let monitor = monitor_with(source);

        assert!(monitor.refresh().await);
        assert!(!monitor.refresh().await);

        // Cached reading and history survive; only connectivity drops.
        assert!(!monitor.connected().await);
        let reading = monitor.current_reading().await.expect("reading retained");
        assert_eq!(reading.heart_rate, 88);
        assert_eq!(monitor.history_len().await, 1);
    }

    #[tokio::test]
    async fn test_history_is_bounded_fifo() {
        let source = ScriptedSource::new();
        for bpm in 0..15u32 {
            source.push_ok(raw_with_vitals(bpm, 96.0));
        }
        let monitor = monitor_with(source);

        let mut config = MonitorConfig::default();
        config.history_limit = 10;
        monitor.update_config(config).await.unwrap();

        for _ in 0..15 {
            assert!(monitor.refresh().await);
        }

        let history = monitor.history().await;
        assert_eq!(history.len(), 10);
        // Oldest evicted first: entries 5..15 survive, in order.
        let bpms: Vec<u32> = history.iter().map(|r| r.heart_rate).collect();
        assert_eq!(bpms, (5..15).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_shrinking_bound_truncates_immediately() {
        let source = ScriptedSource::new();
        for bpm in 0..30u32 {
            source.push_ok(raw_with_vitals(bpm, 96.0));
        }
        let monitor = monitor_with(source);

        for _ in 0..30 {
            assert!(monitor.refresh().await);
        }
        assert_eq!(monitor.history_len().await, 30);

        let mut config = MonitorConfig::default();
        config.history_limit = 10;
        monitor.update_config(config).await.unwrap();

        // Truncated from the front at update time, not lazily on next append.
        let history = monitor.history().await;
        assert_eq!(history.len(), 10);
        assert_eq!(history.first().unwrap().heart_rate, 20);
        assert_eq!(history.last().unwrap().heart_rate, 29);
    }

    #[tokio::test]
    async fn test_rejected_config_leaves_previous_untouched() {
        let source = ScriptedSource::new();
        let monitor = monitor_with(source);

        let mut candidate = MonitorConfig::default();
        candidate.refresh_interval_secs = 61;
        assert!(monitor.update_config(candidate).await.is_err());

        assert_eq!(monitor.config().await, MonitorConfig::default());
    }

    #[tokio::test]
    async fn test_accepted_config_replaces_previous() {
        let source = ScriptedSource::new();
        let monitor = monitor_with(source);

        let mut candidate = MonitorConfig::default();
        candidate.refresh_interval_secs = 30;
        let installed = monitor.update_config(candidate.clone()).await.unwrap();

        assert_eq!(installed, candidate);
        assert_eq!(monitor.config().await.refresh_interval_secs, 30);
    }
}
