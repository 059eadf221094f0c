// Service health endpoint

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::cluster::{ClusterOps, HealthStatus};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub api: &'static str,
    pub elasticsearch: ElasticHealth,
}

#[derive(Debug, Serialize)]
pub struct ElasticHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<HealthStatus>,
}

/// GET /health - API liveness plus cluster reachability
///
/// Always answers 200; an unreachable cluster shows up as connected=false so
/// load balancers keep routing while operators see the dependency is down.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let elasticsearch = match state.cluster.health(None, None, None).await {
        Ok(health) => ElasticHealth {
            connected: true,
            cluster: health.cluster_name,
            status: Some(health.status),
        },
        Err(err) => {
            tracing::warn!(error = %err, "cluster health check failed");
            ElasticHealth {
                connected: false,
                cluster: None,
                status: None,
            }
        }
    };

    Json(HealthResponse {
        api: "ok",
        elasticsearch,
    })
}
