//! HTTP + WebSocket API for the attunement engine
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /session/new - Create session
//! - GET /sessions - List sessions
//! - POST /session/:id/reading - Take a reading
//! - GET /session/:id/summary - Session summary
//! - GET /session/:id/history?limit=n - Recent readings
//! - POST /session/:id/stop - Stop session
//! - DELETE /session/:id - Remove session
//! - WS /ws/:id - Live updates

use std::sync::Arc;

use axum::{
    extract::{ws::{Message, WebSocket}, Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::core::SessionRegistry;
use crate::types::{EngineError, Reading, SessionEvent, SessionListing, SessionSummary};
use crate::{DEFAULT_BASELINE_TONE_ARM, DEFAULT_SENSITIVITY};

/// Default number of readings returned by the history endpoint
const DEFAULT_HISTORY_LIMIT: usize = 100;

/// App state
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
}

/// Create new session request
#[derive(Debug, Deserialize)]
pub struct NewSessionRequest {
    #[serde(default = "default_baseline")]
    pub baseline_tone_arm: f64,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
}

fn default_baseline() -> f64 {
    DEFAULT_BASELINE_TONE_ARM
}

fn default_sensitivity() -> f64 {
    DEFAULT_SENSITIVITY
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub websocket_url: String,
}

/// Session listing response
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionListing>,
}

/// History query
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// History response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub readings: Vec<Reading>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_total: usize,
    pub sessions_active: usize,
    pub analysis_window: usize,
    pub history_capacity: usize,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Engine error translated to an HTTP response
#[derive(Debug)]
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::Inactive { .. } | EngineError::AlreadyStopped { .. } => StatusCode::CONFLICT,
            EngineError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the API router with a fresh default registry
pub fn create_router() -> Router {
    router_with_registry(Arc::new(SessionRegistry::new()))
}

/// Create the API router over an existing registry
pub fn router_with_registry(registry: Arc<SessionRegistry>) -> Router {
    let state = Arc::new(AppState { registry });

    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/sessions", get(list_sessions))
        .route("/session/:id", delete(remove_session))
        .route("/session/:id/reading", post(get_reading))
        .route("/session/:id/summary", get(get_summary))
        .route("/session/:id/history", get(get_history))
        .route("/session/:id/stop", post(stop_session))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let config = state.registry.config();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_total: state.registry.len(),
        sessions_active: state.registry.active_count(),
        analysis_window: config.analyzer.window_size,
        history_capacity: config.history_capacity,
    })
}

/// Create new session
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSessionRequest>,
) -> Result<Json<NewSessionResponse>, ApiError> {
    let session_id = state.registry.create_session(req.baseline_tone_arm, req.sensitivity)?;

    Ok(Json(NewSessionResponse {
        websocket_url: format!("/ws/{}", session_id),
        session_id,
    }))
}

async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.registry.list_sessions(),
    })
}

async fn get_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Reading>, ApiError> {
    Ok(Json(state.registry.get_reading(&id)?))
}

async fn get_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    Ok(Json(state.registry.get_session_summary(&id)?))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let readings = state.registry.get_history(&id, limit)?;
    Ok(Json(HistoryResponse { session_id: id, readings }))
}

async fn stop_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    Ok(Json(state.registry.stop_session(&id)?))
}

async fn remove_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    Ok(Json(state.registry.remove_session(&id)?))
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let rx = state.registry.subscribe(&id)?;
    let summary = state.registry.get_session_summary(&id)?;

    // A stopped session will never emit again; report it and close
    let initial = if summary.active {
        None
    } else {
        Some(SessionEvent::Stopped { summary })
    };

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx, initial).await;
    }))
}

/// Forward session events until the session stops or the client leaves
async fn handle_websocket(
    socket: WebSocket,
    mut rx: broadcast::Receiver<SessionEvent>,
    initial: Option<SessionEvent>,
) {
    let (mut sender, mut receiver) = socket.split();

    if let Some(event) = initial {
        if let Ok(json) = serde_json::to_string(&event) {
            let _ = sender.send(Message::Text(json)).await;
        }
        let _ = sender.close().await;
        return;
    }

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let stopped = matches!(event, SessionEvent::Stopped { .. });
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("dropping unserializable event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json)).await.is_err() || stopped {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("websocket subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sender.close().await;
}

/// Run the API server
pub async fn run_server(addr: &str, registry: Arc<SessionRegistry>) -> Result<(), Box<dyn std::error::Error>> {
    let router = router_with_registry(registry);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("attunement API listening on {}", addr);
    println!("  POST   /session/new          - Create session");
    println!("  GET    /sessions             - List sessions");
    println!("  POST   /session/:id/reading  - Take reading");
    println!("  GET    /session/:id/summary  - Session summary");
    println!("  GET    /session/:id/history  - Recent readings");
    println!("  POST   /session/:id/stop     - Stop session");
    println!("  DELETE /session/:id          - Remove session");
    println!("  WS     /ws/:id               - Live updates");
    println!("  GET    /health               - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}
