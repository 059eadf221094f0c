// HTTP surface - pure translation over the control plane
//
// Handlers parse, delegate, and shape responses; no deployment or session
// policy lives here. Errors flow out as ControlError and are mapped onto
// status codes in exactly one place (ApiError below).
//
// Base path: /api/v1/products. Bodies up to 100 MB are accepted - bulk
// clients routinely post batches of 1000 full product documents.

mod batch;
mod deployment;
mod health;
mod search;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;

use crate::cluster::SharedCluster;
use crate::config::Config;
use crate::deploy::{AliasRegistry, DeploymentCoordinator, HealthProbe, Strategy};
use crate::error::ControlError;
use crate::session::SharedSessions;

/// Maximum accepted request body.
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cluster: SharedCluster,
    pub sessions: SharedSessions,
    pub coordinator: Arc<DeploymentCoordinator>,
    pub registry: Arc<AliasRegistry>,
    pub probe: Arc<HealthProbe>,
    pub config: Arc<Config>,
}

/// Build the full router.
pub fn router(state: AppState) -> Router {
    let products = Router::new()
        // Session lifecycle
        .route("/:alias/batch/start", post(batch::start_session))
        .route("/batch/:session_id/process", post(batch::process_batch))
        .route("/batch/:session_id/complete", post(batch::complete_session))
        .route("/batch/:session_id/cancel", post(batch::cancel_session))
        .route("/batch/:session_id/status", get(batch::session_status))
        .route("/batch/active", get(batch::active_sessions))
        // Deployment operations
        .route("/:alias/deploy", post(deployment::deploy))
        .route("/:alias/promote", post(deployment::promote))
        .route("/:alias/rollback", post(deployment::rollback))
        .route("/:alias/cleanup", post(deployment::cleanup))
        .route("/:alias/status", get(deployment::alias_status))
        .route("/:alias/schema", get(deployment::alias_schema))
        // Read side
        .route("/search/text", post(search::search_text))
        .route("/search/criteria", post(search::search_criteria))
        .route("/:product_id", get(search::get_product))
        // Service health
        .route("/health", get(health::health));

    Router::new()
        .nest("/api/v1/products", products)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Parse the `strategy` query parameter; absent means SAFE.
fn parse_strategy(raw: Option<&str>) -> Result<Strategy, ControlError> {
    match raw {
        None => Ok(Strategy::Safe),
        Some(raw) => Strategy::parse(raw).ok_or_else(|| {
            ControlError::invalid(format!(
                "unsupported strategy '{}'; expected 'safe' or 'auto-swap'",
                raw
            ))
        }),
    }
}

/// HTTP-facing wrapper around ControlError.
///
/// Status mapping: invalid arguments, conflicts and failed preconditions are
/// caller errors (400); missing things are 404; timeouts, failed validation
/// and cluster trouble are server errors (500).
pub struct ApiError(ControlError);

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            ControlError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ControlError::NotFound(_) => StatusCode::NOT_FOUND,
            ControlError::Conflict(_) => StatusCode::BAD_REQUEST,
            ControlError::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            ControlError::HealthCheckFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ControlError::Timeout { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ControlError::Cluster(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = self.0.to_string();

        if status.is_server_error() {
            tracing::error!("API error: {} - {}", status, message);
        } else {
            tracing::debug!("API error: {} - {}", status, message);
        }

        (status, message).into_response()
    }
}
