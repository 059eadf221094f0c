// Wire types for the cluster gateway
//
// These mirror the subset of the search cluster's REST surface the control
// plane relies on: bulk indexing with per-item outcomes, atomic alias action
// lists, cluster health, and index stats. Documents and mappings stay opaque
// (serde_json::Value) end to end.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Bulk operations
// ─────────────────────────────────────────────────────────────────────────────

/// A single operation in a bulk request.
///
/// The control plane only ever issues `index` actions (create-or-replace by
/// id); the enum leaves room for the other action kinds the bulk endpoint
/// understands without widening the public surface today.
#[derive(Debug, Clone)]
pub enum BulkOp {
    /// Index `source` into `index` under document id `id`.
    Index {
        index: String,
        id: String,
        source: Value,
    },
}

impl BulkOp {
    /// The action name as it appears on the wire and in per-item outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Index { .. } => "index",
        }
    }
}

/// Error payload attached to a failed bulk item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemError {
    /// Cluster-side error type, e.g. "mapper_parsing_exception"
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable reason
    pub reason: String,
    /// Optional nested status (some clusters repeat it here)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Outcome of one item in a bulk request.
#[derive(Debug, Clone, Serialize)]
pub struct BulkItemOutcome {
    /// Operation kind ("index")
    pub op: String,
    /// Document id the item addressed
    pub id: String,
    /// Per-item HTTP-style status code
    pub status: u16,
    /// Error payload, present iff the item failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BulkItemError>,
}

impl BulkItemOutcome {
    /// Success means a 2xx created/ok status and no error payload.
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200 | 201) && self.error.is_none()
    }
}

/// Result of a whole bulk request.
#[derive(Debug, Clone)]
pub struct BulkSummary {
    /// True if any item carried an error
    pub any_errors: bool,
    /// Per-item outcomes, in request order
    pub items: Vec<BulkItemOutcome>,
}

impl BulkSummary {
    pub fn failed(&self) -> usize {
        self.items.iter().filter(|i| !i.is_success()).count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Alias actions
// ─────────────────────────────────────────────────────────────────────────────

/// One entry in an atomic alias update. The cluster applies the whole ordered
/// list as a single transaction; serialization matches the `_aliases` wire
/// format exactly (`{"add": {...}}` / `{"remove": {...}}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AliasAction {
    Add(AliasTarget),
    Remove(AliasTarget),
}

/// Index/alias pair addressed by an alias action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AliasTarget {
    pub index: String,
    pub alias: String,
}

impl AliasAction {
    pub fn add(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Add(AliasTarget {
            index: index.into(),
            alias: alias.into(),
        })
    }

    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Remove(AliasTarget {
            index: index.into(),
            alias: alias.into(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Health and stats
// ─────────────────────────────────────────────────────────────────────────────

/// Cluster health traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Green => write!(f, "green"),
            Self::Yellow => write!(f, "yellow"),
            Self::Red => write!(f, "red"),
        }
    }
}

/// Response from the cluster health endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterHealth {
    pub status: HealthStatus,
    /// Cluster name, useful for the service health endpoint
    #[serde(default)]
    pub cluster_name: Option<String>,
    /// True if a wait_for_status request gave up before reaching it
    #[serde(default)]
    pub timed_out: bool,
}

/// Slimmed index statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub doc_count: u64,
    pub store_size_bytes: u64,
    pub indexing_rate: u64,
    pub search_rate: u64,
}
