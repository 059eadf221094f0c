// Deployment endpoints - one-shot deploy, promote, rollback, cleanup, and
// alias inspection

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cluster::ClusterOps;
use crate::deploy::{Color, DeploymentState, ProbeStats};

use super::{parse_strategy, ApiError, AppState};

/// Query parameters for POST /:alias/deploy
#[derive(Debug, Deserialize)]
pub struct DeployQuery {
    /// "safe" (default) or "auto-swap"
    pub strategy: Option<String>,
}

/// POST /:alias/deploy - Build and validate a staging index in one call
///
/// Body: the full document set. Streaming clients should use the session
/// endpoints instead; this path exists for small corpora and tooling.
pub async fn deploy(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Query(query): Query<DeployQuery>,
    Json(documents): Json<Vec<Value>>,
) -> Result<Json<DeploymentState>, ApiError> {
    let strategy = parse_strategy(query.strategy.as_deref())?;
    let deployment = state.coordinator.deploy(&alias, &documents, strategy).await?;
    Ok(Json(deployment))
}

/// POST /:alias/rollback - Swap back to the most recent previous-color index
pub async fn rollback(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Result<Json<DeploymentState>, ApiError> {
    let deployment = state.coordinator.rollback(&alias).await?;
    Ok(Json(deployment))
}

/// Response for POST /:alias/cleanup
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub alias: String,
    pub deleted: Vec<String>,
}

/// POST /:alias/cleanup - Delete non-active-color indices for an alias
pub async fn cleanup(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let deleted = state.coordinator.cleanup(&alias).await?;
    Ok(Json(CleanupResponse { alias, deleted }))
}

/// Query parameters for POST /:alias/promote
#[derive(Debug, Deserialize)]
pub struct PromoteQuery {
    /// The staged index to make active; must exist
    #[serde(rename = "targetIndex")]
    pub target_index: String,
}

/// Response for POST /:alias/promote
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteResponse {
    pub success: bool,
    pub alias: String,
    pub new_active_index: String,
    pub message: String,
}

/// POST /:alias/promote - Atomically point the alias at a specific index
pub async fn promote(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    Query(query): Query<PromoteQuery>,
) -> Result<Json<PromoteResponse>, ApiError> {
    state
        .coordinator
        .promote(&alias, &query.target_index)
        .await?;

    Ok(Json(PromoteResponse {
        success: true,
        alias: alias.clone(),
        new_active_index: query.target_index.clone(),
        message: format!("alias '{}' now serves '{}'", alias, query.target_index),
    }))
}

/// Response for GET /:alias/status
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasStatusResponse {
    pub alias: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_color: Option<Color>,
    /// Probe snapshot of the active index, when one is bound and reachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_stats: Option<ProbeStats>,
    /// Every index matching the alias's naming pattern, newest first
    pub indices: Vec<String>,
}

/// GET /:alias/status - Alias binding plus all deployment indices
pub async fn alias_status(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Result<Json<AliasStatusResponse>, ApiError> {
    let deployment = state.coordinator.status(&alias).await?;
    let exists = state.registry.exists(&alias).await?;

    let mut indices = state
        .cluster
        .indices_matching(&format!("{}_*", alias))
        .await
        .map_err(crate::error::ControlError::from)?;
    indices.sort_by(|a, b| b.cmp(a));

    // Stats are best-effort decoration; a probe failure never fails status
    let active_stats = match &deployment.active_index {
        Some(active) => state.probe.stats(active).await.ok(),
        None => None,
    };

    Ok(Json(AliasStatusResponse {
        alias,
        exists,
        active_index: deployment.active_index,
        active_color: deployment.active_color,
        active_stats,
        indices,
    }))
}

/// Response for GET /:alias/schema
#[derive(Debug, Serialize)]
pub struct AliasSchemaResponse {
    pub alias: String,
    pub indices: Vec<String>,
    /// Index name → mappings document
    pub mappings: Map<String, Value>,
}

/// GET /:alias/schema - Mappings of the indices behind an alias
///
/// Prefers the bound indices; falls back to the alias's naming pattern when
/// nothing is bound yet (e.g. before the first promote under SAFE).
pub async fn alias_schema(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Result<Json<AliasSchemaResponse>, ApiError> {
    let bound = state.registry.indices_for(&alias).await?;
    let pattern = if bound.is_empty() {
        format!("{}_*", alias)
    } else {
        bound.join(",")
    };

    let metadata = state
        .cluster
        .index_metadata(&pattern)
        .await
        .map_err(crate::error::ControlError::from)?;

    let mut indices = Vec::new();
    let mut mappings = Map::new();
    if let Value::Object(entries) = metadata {
        for (name, meta) in entries {
            mappings.insert(name.clone(), meta["mappings"].clone());
            indices.push(name);
        }
    }
    indices.sort();

    Ok(Json(AliasSchemaResponse {
        alias,
        indices,
        mappings,
    }))
}
