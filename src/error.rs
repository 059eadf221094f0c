// Control-plane error taxonomy
//
// Every fallible operation in the deployment control plane surfaces one of
// these kinds. The HTTP layer maps them onto status codes (see api::ApiError);
// nothing below the HTTP layer knows about status codes.
//
// Per-document bulk failures are NOT errors at this level: they are recorded
// in batch results and session error lists, and the batch call itself
// succeeds. Only transport/serialization failures of a whole batch raise.

use crate::cluster::ClusterError;

/// Errors produced by the deployment control plane.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Caller passed something unusable: blank alias, empty batch, batch over
    /// the size limit, duplicate document ids, unknown strategy. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The named thing does not exist: unknown or expired session, alias with
    /// no bound index where one is required, missing rollback target.
    #[error("not found: {0}")]
    NotFound(String),

    /// The thing exists but is in the wrong state: session no longer active,
    /// staging color mismatch on swap, alias already bound at initialize.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A precondition of the operation does not hold: index already exists at
    /// create, swap requested with no staging index.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Post-ingest health validation of an index failed.
    #[error("health validation failed for index '{0}'")]
    HealthCheckFailed(String),

    /// A readiness wait exceeded its wall-clock deadline.
    #[error("timed out waiting for index '{index}' after {seconds}s")]
    Timeout { index: String, seconds: u64 },

    /// Wrapped cluster failure: transport error, non-acknowledged mutation,
    /// malformed response.
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),
}

impl ControlError {
    /// Shorthand constructors - keeps call sites to a single line.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }
}

pub type ControlResult<T> = Result<T, ControlError>;
