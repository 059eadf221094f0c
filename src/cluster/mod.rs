// Cluster gateway - thin typed access to the search cluster
//
// The gateway is the only component that talks to the cluster. It carries no
// policy: every method is a direct translation of one cluster primitive
// (bulk, alias mutation, index lifecycle, count, refresh, health, stats).
// Everything above it - alias registry, index lifecycle, health probe,
// deployment coordinator, session manager - is written against the ClusterOps
// trait, which keeps the control plane testable against an in-memory double.
//
// The concrete implementation (ElasticGateway) is constructed once at program
// start and injected into every component; no process-wide state.

mod gateway;
mod types;

#[cfg(test)]
pub(crate) mod memory;

pub use gateway::ElasticGateway;
pub use types::{
    AliasAction, AliasTarget, BulkItemError, BulkItemOutcome, BulkOp, BulkSummary, ClusterHealth,
    HealthStatus, IndexStats,
};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Errors surfaced by the gateway.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// Transport-level failure (connection refused, timeout, TLS, ...)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The cluster answered with a status the operation cannot interpret
    #[error("unexpected status {status} from cluster: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// A mutation completed but the cluster did not acknowledge it
    #[error("cluster did not acknowledge {operation}")]
    NotAcknowledged { operation: String },

    /// The response body did not match the expected shape
    #[error("malformed cluster response: {0}")]
    Malformed(String),
}

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Shared handle to the cluster gateway, cloned into every component.
pub type SharedCluster = Arc<dyn ClusterOps>;

/// The cluster primitives the control plane depends on.
///
/// Semantics the implementations must preserve:
/// - `update_aliases` applies the whole ordered action list atomically.
/// - `alias_indices` returns an empty set for an absent alias (not an error).
/// - `indices_matching` treats an unmatched pattern as empty
///   (ignore-unavailable), never as an error.
/// - An acknowledged mutation is durable.
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Execute a bulk request, returning per-item outcomes in request order.
    async fn bulk(&self, ops: &[BulkOp], refresh: bool) -> ClusterResult<BulkSummary>;

    /// Apply an ordered list of alias add/remove actions as one transaction.
    /// Returns the acknowledged bit.
    async fn update_aliases(&self, actions: &[AliasAction]) -> ClusterResult<bool>;

    /// Indices currently bound to `alias`; empty if the alias is absent.
    async fn alias_indices(&self, alias: &str) -> ClusterResult<Vec<String>>;

    async fn alias_exists(&self, alias: &str) -> ClusterResult<bool>;

    /// Create an index with the given mapping, optionally binding `alias` in
    /// the same call. Fails if the index already exists.
    async fn create_index(
        &self,
        name: &str,
        mapping: &Value,
        alias: Option<&str>,
    ) -> ClusterResult<bool>;

    /// Delete an index. Absent indices are tolerated (ignore-unavailable).
    async fn delete_index(&self, name: &str) -> ClusterResult<bool>;

    async fn index_exists(&self, name: &str) -> ClusterResult<bool>;

    /// Names of indices matching `pattern`, unmatched pattern → empty.
    async fn indices_matching(&self, pattern: &str) -> ClusterResult<Vec<String>>;

    /// Raw metadata (mappings, settings) for indices matching `pattern`.
    async fn index_metadata(&self, pattern: &str) -> ClusterResult<Value>;

    async fn refresh(&self, name: &str) -> ClusterResult<()>;

    /// Document count for an index.
    async fn count(&self, name: &str) -> ClusterResult<u64>;

    /// Cluster health, optionally filtered to one index, optionally blocking
    /// until `wait_for` (or `timeout`) on the cluster side.
    async fn health(
        &self,
        index: Option<&str>,
        wait_for: Option<HealthStatus>,
        timeout: Option<Duration>,
    ) -> ClusterResult<ClusterHealth>;

    async fn index_stats(&self, name: &str) -> ClusterResult<IndexStats>;

    /// Run a search request against an index or alias; body is an opaque
    /// query DSL document.
    async fn search(&self, index: &str, body: &Value) -> ClusterResult<Value>;

    /// Fetch a single document by id; None if the document is absent.
    async fn get_document(&self, index: &str, id: &str) -> ClusterResult<Option<Value>>;
}
