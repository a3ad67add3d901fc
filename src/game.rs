//! Pass-game session: scoring, streaks, and milestones.
//!
//! A session runs from `start()` to `stop()`. Each recorded pass is scored
//! against the athlete's current vitals, read from the monitor. The session
//! holds a read-only handle to the monitor and never mutates it.

use crate::monitor::AthleteMonitor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Quality tier of a scored pass, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassQuality {
    Perfect,
    Good,
    Fair,
    Weak,
}

/// Cumulative statistics for one session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GameStats {
    pub score: u64,
    pub actions: u64,
    pub perfect_actions: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub best_streak: u32,
    pub current_streak: u32,
}

/// A recorded high-quality pass.
#[derive(Debug, Clone, Serialize)]
pub struct Milestone {
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub points: u32,
    pub heart_rate: u32,
    pub saturation: f64,
}

/// Result of one scored pass.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub points: u32,
    pub quality: PassQuality,
    pub heart_rate: u32,
    pub saturation: f64,
    pub streak: u32,
}

/// Confirmation returned by `start()`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStart {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
}

/// Final report returned by `stop()`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub score: u64,
    pub actions: u64,
    pub perfect_actions: u64,
    pub best_streak: u32,
    pub elapsed_seconds: i64,
    pub milestones: Vec<Milestone>,
}

/// Session-state errors. Non-fatal; the caller retries after fixing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    /// Operation requires an active session
    NotActive,
    /// No reading is available on the monitor yet
    NoTelemetry,
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::NotActive => write!(f, "no active game session"),
            GameError::NoTelemetry => write!(f, "athlete telemetry not available"),
        }
    }
}

impl std::error::Error for GameError {}

/// The scoring game, Idle until started.
pub struct GameSession {
    monitor: Arc<AthleteMonitor>,
    active: bool,
    session_id: Option<Uuid>,
    stats: GameStats,
    milestones: Vec<Milestone>,
}

impl GameSession {
    /// Create an idle session reading vitals from the given monitor.
    pub fn new(monitor: Arc<AthleteMonitor>) -> Self {
        Self {
            monitor,
            active: false,
            session_id: None,
            stats: GameStats::default(),
            milestones: Vec::new(),
        }
    }

    /// Start a session, resetting stats and milestones.
    ///
    /// Calling `start()` while a session is active discards the in-progress
    /// stats and re-arms. This matches the original system's behavior and is
    /// pinned by a test; there is no implicit `stop()`.
    pub fn start(&mut self) -> SessionStart {
        let started_at = Utc::now();
        let session_id = Uuid::new_v4();

        self.active = true;
        self.session_id = Some(session_id);
        self.stats = GameStats {
            started_at: Some(started_at),
            ..GameStats::default()
        };
        self.milestones.clear();

        tracing::info!(%session_id, "game session started");
        SessionStart {
            session_id,
            started_at,
        }
    }

    /// Stop the active session and produce the final report.
    pub fn stop(&mut self) -> Result<SessionReport, GameError> {
        if !self.active {
            return Err(GameError::NotActive);
        }
        self.active = false;

        let report = SessionReport {
            score: self.stats.score,
            actions: self.stats.actions,
            perfect_actions: self.stats.perfect_actions,
            best_streak: self.stats.best_streak,
            elapsed_seconds: self.elapsed_seconds(),
            milestones: self.milestones.clone(),
        };
        tracing::info!(score = report.score, actions = report.actions, "game session stopped");
        Ok(report)
    }

    /// Score one pass against the current reading.
    ///
    /// Tiers are evaluated in strict priority order; the first match wins.
    pub async fn record_action(&mut self) -> Result<ActionResult, GameError> {
        if !self.active {
            return Err(GameError::NotActive);
        }
        let reading = self
            .monitor
            .current_reading()
            .await
            .ok_or(GameError::NoTelemetry)?;

        let heart_rate = reading.heart_rate;
        let saturation = reading.saturation;

        let (bonus, quality) = if heart_rate > 120 && saturation > 97.0 {
            (3, PassQuality::Perfect)
        } else if heart_rate > 100 && saturation > 95.0 {
            (2, PassQuality::Good)
        } else if saturation > 95.0 {
            (1, PassQuality::Fair)
        } else {
            (0, PassQuality::Weak)
        };

        if quality == PassQuality::Weak {
            self.stats.current_streak = 0;
        } else {
            self.stats.current_streak += 1;
        }

        let points = 1 + bonus;
        self.stats.score += u64::from(points);
        self.stats.actions += 1;
        self.stats.best_streak = self.stats.best_streak.max(self.stats.current_streak);

        if quality == PassQuality::Perfect {
            self.stats.perfect_actions += 1;
            self.milestones.push(Milestone {
                kind: "perfect_pass".to_string(),
                timestamp: Utc::now(),
                points,
                heart_rate,
                saturation,
            });
        }

        Ok(ActionResult {
            points,
            quality,
            heart_rate,
            saturation,
            streak: self.stats.current_streak,
        })
    }

    /// Whether a session is currently active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current stats snapshot.
    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    /// Milestones recorded this session.
    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    /// Identifier of the current (or last) session.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Whole seconds since the session started, 0 when never started.
    pub fn elapsed_seconds(&self) -> i64 {
        self.stats
            .started_at
            .map(|t| (Utc::now() - t).num_seconds())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::telemetry::testing::{raw_with_vitals, ScriptedSource};
    use crate::telemetry::FetchError;

    fn monitor_with(source: ScriptedSource) -> Arc<AthleteMonitor> {
        Arc::new(AthleteMonitor::new(
            "urn:ngsi-ld:Atleta:0001",
            MonitorConfig::default(),
            Box::new(source),
        ))
    }

    async fn session_with_reading(heart_rate: u32, saturation: f64) -> GameSession {
        let source = ScriptedSource::new();
        source.push_ok(raw_with_vitals(heart_rate, saturation));
        let monitor = monitor_with(source);
        assert!(monitor.refresh().await);
        GameSession::new(monitor)
    }

    #[tokio::test]
    async fn test_record_action_requires_active_session() {
        let mut session = session_with_reading(130, 98.0).await;
        assert!(matches!(
            session.record_action().await,
            Err(GameError::NotActive)
        ));
    }

    #[tokio::test]
    async fn test_record_action_requires_telemetry() {
        let source = ScriptedSource::new();
        source.push_err(FetchError::Status(503));
        let monitor = monitor_with(source);
        monitor.refresh().await;

        let mut session = GameSession::new(monitor);
        session.start();
        assert!(matches!(
            session.record_action().await,
            Err(GameError::NoTelemetry)
        ));
    }

    #[tokio::test]
    async fn test_stop_while_idle_fails() {
        let mut session = session_with_reading(80, 96.0).await;
        assert!(matches!(session.stop(), Err(GameError::NotActive)));
    }

    #[tokio::test]
    async fn test_perfect_pass_takes_priority_over_good() {
        // 130/98 satisfies both tier 1 and tier 2; tier 1 must win.
        let mut session = session_with_reading(130, 98.0).await;
        session.start();

        let result = session.record_action().await.unwrap();
        assert_eq!(result.quality, PassQuality::Perfect);
        assert_eq!(result.points, 4);
        assert_eq!(result.streak, 1);
        assert_eq!(session.stats().perfect_actions, 1);
        assert_eq!(session.milestones().len(), 1);
    }

    #[tokio::test]
    async fn test_good_pass() {
        let mut session = session_with_reading(110, 96.0).await;
        session.start();

        let result = session.record_action().await.unwrap();
        assert_eq!(result.quality, PassQuality::Good);
        assert_eq!(result.points, 3);
        assert!(session.milestones().is_empty());
    }

    #[tokio::test]
    async fn test_fair_pass() {
        let mut session = session_with_reading(80, 96.0).await;
        session.start();

        let result = session.record_action().await.unwrap();
        assert_eq!(result.quality, PassQuality::Fair);
        assert_eq!(result.points, 2);
        assert_eq!(result.streak, 1);
    }

    #[tokio::test]
    async fn test_weak_pass_resets_streak_only() {
        let source = ScriptedSource::new();
        source.push_ok(raw_with_vitals(110, 96.0));
        source.push_ok(raw_with_vitals(110, 96.0));
        source.push_ok(raw_with_vitals(90, 90.0));
        source.push_ok(raw_with_vitals(110, 96.0));
        let monitor = monitor_with(source);

        let mut session = GameSession::new(monitor.clone());
        session.start();

        monitor.refresh().await;
        assert_eq!(session.record_action().await.unwrap().streak, 1);
        monitor.refresh().await;
        assert_eq!(session.record_action().await.unwrap().streak, 2);

        // Weak pass: streak drops to 0, best streak stays.
        monitor.refresh().await;
        let weak = session.record_action().await.unwrap();
        assert_eq!(weak.quality, PassQuality::Weak);
        assert_eq!(weak.points, 1);
        assert_eq!(weak.streak, 0);
        assert_eq!(session.stats().best_streak, 2);

        // Best streak is monotone: a new short streak does not lower it.
        monitor.refresh().await;
        assert_eq!(session.record_action().await.unwrap().streak, 1);
        assert_eq!(session.stats().best_streak, 2);
    }

    #[tokio::test]
    async fn test_full_session_scenario() {
        let source = ScriptedSource::new();
        source.push_ok(raw_with_vitals(130, 98.0));
        source.push_ok(raw_with_vitals(90, 90.0));
        let monitor = monitor_with(source);

        let mut session = GameSession::new(monitor.clone());
        session.start();

        monitor.refresh().await;
        let first = session.record_action().await.unwrap();
        assert_eq!(first.points, 4);
        assert_eq!(first.quality, PassQuality::Perfect);
        assert_eq!(first.streak, 1);

        monitor.refresh().await;
        let second = session.record_action().await.unwrap();
        assert_eq!(second.points, 1);
        assert_eq!(second.quality, PassQuality::Weak);
        assert_eq!(second.streak, 0);

        let report = session.stop().unwrap();
        assert_eq!(report.score, 5);
        assert_eq!(report.actions, 2);
        assert_eq!(report.perfect_actions, 1);
        assert_eq!(report.milestones.len(), 1);
        assert!(report.elapsed_seconds >= 0);
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn test_restart_discards_in_progress_session() {
        // start() mid-session silently resets, matching the original system.
        let mut session = session_with_reading(130, 98.0).await;
        session.start();
        let first_id = session.session_id().unwrap();
        session.record_action().await.unwrap();
        assert_eq!(session.stats().score, 4);

        session.start();
        assert_ne!(session.session_id().unwrap(), first_id);
        assert_eq!(session.stats().score, 0);
        assert_eq!(session.stats().actions, 0);
        assert!(session.milestones().is_empty());
        assert!(session.is_active());
    }
}
