// Switchyard - Blue/Green Deployment Control Plane
//
// Zero-downtime re-population of search indices behind stable aliases.
// Consumers query an alias; this service rebuilds the backing index in the
// background from streamed document batches, validates it, then atomically
// switches the alias so queries hit the new index on the next request.
//
// Architecture:
// - Cluster gateway (reqwest): typed wrapper over the search cluster's REST
//   API, constructed once and injected into every component
// - Deployment control plane: alias registry, index lifecycle, health probe,
//   and the coordinator that owns swap / rollback / cleanup
// - Session manager: in-memory streaming ingest sessions with an expiry sweep
// - HTTP surface (axum): pure translation onto the components above

mod api;
mod cli;
mod cluster;
mod config;
mod deploy;
mod error;
mod mapping;
mod session;
mod startup;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::AppState;
use crate::cluster::{ClusterOps, ElasticGateway, SharedCluster};
use crate::config::Config;
use crate::deploy::{AliasRegistry, DeploymentCoordinator, HealthProbe, IndexLifecycle};
use crate::mapping::ProductMapping;
use crate::session::SessionManager;

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --path); exit early if one ran
    if cli::handle_cli() {
        return Ok(());
    }

    let config = Config::from_env();

    // Precedence: RUST_LOG env var > config file > default "info"
    let default_filter = format!("switchyard={},tower_http=info,axum=info", config.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    startup::print_startup(&config);
    startup::log_startup(&config);

    // The gateway is the only component that talks to the cluster; build it
    // once and hand the same handle to everything
    let gateway = ElasticGateway::new(
        &config.elasticsearch_url,
        config.elasticsearch_api_key.clone(),
    )
    .context("Failed to create cluster gateway")?;
    let cluster: SharedCluster = Arc::new(gateway);

    let registry = Arc::new(AliasRegistry::new(cluster.clone()));
    let lifecycle = Arc::new(IndexLifecycle::new(
        cluster.clone(),
        Arc::new(ProductMapping),
    ));
    let probe = Arc::new(HealthProbe::new(cluster.clone()));
    let coordinator = Arc::new(DeploymentCoordinator::new(
        cluster.clone(),
        registry.clone(),
        lifecycle.clone(),
        probe.clone(),
    ));
    let sessions = Arc::new(SessionManager::new(
        cluster.clone(),
        lifecycle,
        probe.clone(),
        coordinator.clone(),
    ));

    // One connectivity probe up front so a bad cluster URL is visible
    // immediately; the service still starts either way
    match cluster.health(None, None, None).await {
        Ok(health) => tracing::info!(
            cluster = ?health.cluster_name,
            status = %health.status,
            "connected to search cluster"
        ),
        Err(err) => tracing::warn!(
            error = %err,
            "search cluster unreachable at startup; requests will fail until it returns"
        ),
    }

    // Background expiry sweep: idle sessions expire after an hour
    tokio::spawn(sessions.clone().run_expiry_sweep());

    let state = AppState {
        cluster,
        sessions,
        coordinator,
        registry,
        probe,
        config: Arc::new(config.clone()),
    };
    let app = api::router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
        })
        .await
        .context("Server error")?;

    tracing::info!("switchyard shut down gracefully");
    Ok(())
}
