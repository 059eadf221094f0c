// Session endpoints - streaming batch ingest over HTTP

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::deploy::DeploymentState;
use crate::error::ControlError;
use crate::session::{BatchResult, Session};

use super::{parse_strategy, ApiError, AppState};

/// Query parameters for POST /:alias/batch/start
#[derive(Debug, Deserialize)]
pub struct StartQuery {
    /// "safe" (default) or "auto-swap"
    pub strategy: Option<String>,
    /// Total documents the client intends to stream, for progress reporting
    #[serde(rename = "estimatedTotal")]
    pub estimated_total: Option<u64>,
}

/// POST /:alias/batch/start - Open a streaming ingest session
pub async fn start_session(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Query(query): Query<StartQuery>,
) -> Result<Json<Session>, ApiError> {
    let strategy = parse_strategy(query.strategy.as_deref())?;
    let session = state
        .sessions
        .start(&alias, strategy, query.estimated_total)
        .await?;
    Ok(Json(session))
}

/// POST /batch/:session_id/process - Ingest one batch (1..=1000 documents)
pub async fn process_batch(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(documents): Json<Vec<Value>>,
) -> Result<Json<BatchResult>, ApiError> {
    let result = state.sessions.process_batch(&session_id, &documents).await?;
    Ok(Json(result))
}

/// POST /batch/:session_id/complete - Validate and stage (or swap) the index
pub async fn complete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DeploymentState>, ApiError> {
    let deployment = state.sessions.complete(&session_id).await?;
    Ok(Json(deployment))
}

/// POST /batch/:session_id/cancel - Abort the session, delete its index
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.sessions.cancel(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /batch/:session_id/status - Session snapshot
pub async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state.sessions.get(&session_id).await.ok_or_else(|| {
        ControlError::not_found(format!("session '{}' not found", session_id))
    })?;
    Ok(Json(session))
}

/// GET /batch/active - All sessions still accepting batches
pub async fn active_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Session>>, ApiError> {
    Ok(Json(state.sessions.list_active().await))
}
