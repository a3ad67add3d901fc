//! HTTP surface over the monitor and the game.
//!
//! Adapts the core operations to routes. All handlers share one explicit
//! [`AppState`]; there are no ambient globals. Pass recording shares the
//! session mutex with start/stop, so a pass is never scored against a
//! half-reset session.

use crate::classify::{classify_heart_rate, classify_saturation, Classification};
use crate::config::MonitorConfig;
use crate::game::{ActionResult, GameError, GameSession, GameStats, Milestone, SessionReport, SessionStart};
use crate::monitor::AthleteMonitor;
use crate::telemetry::Reading;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// Shared state for all route handlers.
pub struct AppState {
    /// Telemetry monitor, internally locked
    pub monitor: Arc<AthleteMonitor>,
    /// Game session; the mutex serializes passes against start/stop
    pub game: Mutex<GameSession>,
}

impl AppState {
    /// Build the state around an existing monitor.
    pub fn new(monitor: Arc<AthleteMonitor>) -> Self {
        let game = GameSession::new(monitor.clone());
        Self {
            monitor,
            game: Mutex::new(game),
        }
    }
}

/// Error payload for failed requests.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn game_error(e: GameError) -> ApiError {
    let (status, code) = match e {
        GameError::NotActive => (StatusCode::CONFLICT, "NOT_ACTIVE"),
        GameError::NoTelemetry => (StatusCode::SERVICE_UNAVAILABLE, "NO_TELEMETRY"),
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            code: code.to_string(),
        }),
    )
}

/// Health check payload.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub broker_connected: bool,
    pub game_active: bool,
    pub history_len: usize,
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let game_active = state.game.lock().await.is_active();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        broker_connected: state.monitor.connected().await,
        game_active,
        history_len: state.monitor.history_len().await,
    })
}

/// Current reading with both classifications attached.
#[derive(Serialize)]
pub struct AthleteDataResponse {
    pub reading: Reading,
    pub heart_rate_status: Classification,
    pub saturation_status: Classification,
    pub connected: bool,
    pub fetched_at: String,
}

/// GET /athlete/data
///
/// Forces a refresh first, then reports the current reading. 404 until the
/// first successful fetch.
async fn athlete_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AthleteDataResponse>, ApiError> {
    state.monitor.refresh().await;

    let reading = state.monitor.current_reading().await.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "athlete telemetry not available".to_string(),
                code: "NO_TELEMETRY".to_string(),
            }),
        )
    })?;

    let config = state.monitor.config().await;
    Ok(Json(AthleteDataResponse {
        heart_rate_status: classify_heart_rate(reading.heart_rate, &config.heart_rate_bands),
        saturation_status: classify_saturation(reading.saturation, &config.saturation_bands),
        reading,
        connected: state.monitor.connected().await,
        fetched_at: Utc::now().to_rfc3339(),
    }))
}

/// Simple status payload.
#[derive(Serialize)]
pub struct OkResponse {
    pub status: String,
}

/// POST /athlete/refresh
async fn athlete_refresh(State(state): State<Arc<AppState>>) -> Result<Json<OkResponse>, ApiError> {
    if state.monitor.refresh().await {
        Ok(Json(OkResponse {
            status: "refreshed".to_string(),
        }))
    } else {
        Err((
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: "telemetry fetch failed".to_string(),
                code: "FETCH_FAILED".to_string(),
            }),
        ))
    }
}

/// History snapshot payload.
#[derive(Serialize)]
pub struct HistoryResponse {
    pub readings: Vec<Reading>,
    pub count: usize,
    pub limit: usize,
}

/// GET /athlete/history
async fn athlete_history(State(state): State<Arc<AppState>>) -> Json<HistoryResponse> {
    let readings = state.monitor.history().await;
    let limit = state.monitor.config().await.history_limit;
    Json(HistoryResponse {
        count: readings.len(),
        readings,
        limit,
    })
}

/// POST /game/start
async fn game_start(State(state): State<Arc<AppState>>) -> Json<SessionStart> {
    Json(state.game.lock().await.start())
}

/// POST /game/stop
async fn game_stop(State(state): State<Arc<AppState>>) -> Result<Json<SessionReport>, ApiError> {
    state.game.lock().await.stop().map(Json).map_err(game_error)
}

/// POST /game/pass
async fn game_pass(State(state): State<Arc<AppState>>) -> Result<Json<ActionResult>, ApiError> {
    state
        .game
        .lock()
        .await
        .record_action()
        .await
        .map(Json)
        .map_err(game_error)
}

/// Game status payload.
#[derive(Serialize)]
pub struct GameStatusResponse {
    pub active: bool,
    pub stats: GameStats,
    pub elapsed_seconds: i64,
    pub milestones: Vec<Milestone>,
}

/// GET /game/status
async fn game_status(State(state): State<Arc<AppState>>) -> Json<GameStatusResponse> {
    let game = state.game.lock().await;
    Json(GameStatusResponse {
        active: game.is_active(),
        stats: game.stats().clone(),
        elapsed_seconds: game.elapsed_seconds(),
        milestones: game.milestones().to_vec(),
    })
}

/// Milestones payload.
#[derive(Serialize)]
pub struct MilestonesResponse {
    pub milestones: Vec<Milestone>,
    pub count: usize,
    pub total_points: u64,
}

/// GET /game/milestones
async fn game_milestones(State(state): State<Arc<AppState>>) -> Json<MilestonesResponse> {
    let game = state.game.lock().await;
    let milestones = game.milestones().to_vec();
    Json(MilestonesResponse {
        count: milestones.len(),
        total_points: milestones.iter().map(|m| u64::from(m.points)).sum(),
        milestones,
    })
}

/// GET /config
async fn config_get(State(state): State<Arc<AppState>>) -> Json<MonitorConfig> {
    Json(state.monitor.config().await)
}

/// POST /config
async fn config_update(
    State(state): State<Arc<AppState>>,
    Json(candidate): Json<MonitorConfig>,
) -> Result<Json<MonitorConfig>, ApiError> {
    state
        .monitor
        .update_config(candidate)
        .await
        .map(Json)
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: "INVALID_CONFIG".to_string(),
                }),
            )
        })
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/athlete/data", get(athlete_data))
        .route("/athlete/refresh", post(athlete_refresh))
        .route("/athlete/history", get(athlete_history))
        .route("/game/start", post(game_start))
        .route("/game/stop", post(game_stop))
        .route("/game/pass", post(game_pass))
        .route("/game/status", get(game_status))
        .route("/game/milestones", get(game_milestones))
        .route("/config", get(config_get).post(config_update))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server.
///
/// Returns the bound address and a shutdown sender; the server task ends
/// when the sender fires.
pub async fn run(
    addr: SocketAddr,
    state: Arc<AppState>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("athlete vitals agent listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("server shutdown signal received");
            })
            .await
        {
            tracing::error!("server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
