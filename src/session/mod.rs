// Streaming ingest sessions
//
// A session is a named, in-memory coordinator for streaming millions of
// documents into one staging index. The client opens a session against an
// alias, streams batches (each processed end-to-end before the call returns,
// which is the backpressure boundary), then completes - at which point the
// index is refreshed, validated, and either left staged (SAFE) or swapped
// live (AUTO_SWAP).
//
// Concurrency: the session map sits behind one async mutex covering lookup
// and insert/remove; each session carries its own async mutex held across
// the bulk call, so operations on the same session serialize in arrival
// order while distinct sessions ingest in parallel. Different sessions write
// to distinct timestamped indices by construction, so there is no
// inter-session write contention.
//
// Sessions are not persisted. A control-plane restart forgets them; their
// staging indices remain for manual promotion or cleanup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cluster::{ClusterOps, SharedCluster};
use crate::deploy::ingest::{self, IngestError};
use crate::deploy::{
    Color, DeploymentCoordinator, DeploymentState, DeploymentStatus, HealthProbe, IndexLifecycle,
    Strategy, WaitOptions,
};
use crate::error::{ControlError, ControlResult};

// ─────────────────────────────────────────────────────────────────────────────
// Limits and timing
// ─────────────────────────────────────────────────────────────────────────────

/// Hard cap on documents per batch. An older surface accepted 5000; the
/// tighter duplicate-checking contract is the one callers may rely on.
pub const MAX_BATCH_DOCUMENTS: usize = 1000;

/// Bound on a session's accumulated error list.
const MAX_SESSION_ERRORS: usize = 100;

/// Idle time after which a non-terminal session expires.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Cadence of the background expiry sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Deadline for the readiness wait during complete.
const COMPLETE_READY_TIMEOUT: Duration = Duration::from_secs(300);

// ─────────────────────────────────────────────────────────────────────────────
// Session model
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
    Expired,
}

impl SessionStatus {
    /// Terminal states are sticky: no operation mutates a terminal session.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Completed => f.write_str("completed"),
            Self::Failed => f.write_str("failed"),
            Self::Expired => f.write_str("expired"),
        }
    }
}

/// One recorded failure within a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ref: Option<String>,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&IngestError> for SessionError {
    fn from(err: &IngestError) -> Self {
        SessionError {
            batch_number: None,
            phase: Some("indexing".to_string()),
            document_ref: Some(err.document_id.clone()),
            error: format!("{}: {} (status {})", err.kind, err.reason, err.status),
            timestamp: Utc::now(),
        }
    }
}

/// A streaming ingest session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub alias: String,
    pub target_index: String,
    pub target_color: Color,
    pub strategy: Strategy,
    pub total_batches: u64,
    pub processed_batches: u64,
    pub total_documents: u64,
    pub processed_documents: u64,
    pub failed_documents: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_total: Option<u64>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_batch_at: DateTime<Utc>,
    pub errors: Vec<SessionError>,
}

impl Session {
    /// Percent complete against the caller's estimate, if one was given.
    pub fn progress(&self) -> Option<f64> {
        self.estimated_total
            .filter(|est| *est > 0)
            .map(|est| 100.0 * self.processed_documents as f64 / est as f64)
    }

    /// Append an error, dropping the oldest past the bound.
    fn push_error(&mut self, error: SessionError) {
        if self.errors.len() >= MAX_SESSION_ERRORS {
            self.errors.remove(0);
        }
        self.errors.push(error);
    }
}

/// Result of one processed batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub session_id: String,
    pub batch_number: u64,
    pub successful: u64,
    pub failed: u64,
    pub errors: Vec<SessionError>,
    pub session_status: SessionStatus,
    pub total_processed: u64,
    pub total_failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

/// Generate a session id: `batch_{epoch_ms}_{9 base-36 chars}`.
///
/// Randomness comes from a hasher seeded by RandomState, which avoids an RNG
/// dependency for a non-cryptographic id.
fn generate_session_id() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let epoch_ms = Utc::now().timestamp_millis();
    let mut random = RandomState::new().build_hasher().finish();

    let mut suffix = String::with_capacity(9);
    for _ in 0..9 {
        let digit = (random % 36) as u32;
        suffix.push(char::from_digit(digit, 36).unwrap_or('0'));
        random /= 36;
    }

    format!("batch_{}_{}", epoch_ms, suffix)
}

// ─────────────────────────────────────────────────────────────────────────────
// Session manager
// ─────────────────────────────────────────────────────────────────────────────

/// A session entry: the per-session mutex is what serializes same-session
/// operations, including across the bulk call.
struct SessionSlot {
    state: tokio::sync::Mutex<Session>,
}

/// Shared handle to the session manager.
pub type SharedSessions = Arc<SessionManager>;

/// Owns every in-flight ingest session.
pub struct SessionManager {
    cluster: SharedCluster,
    lifecycle: Arc<IndexLifecycle>,
    probe: Arc<HealthProbe>,
    coordinator: Arc<DeploymentCoordinator>,
    sessions: tokio::sync::Mutex<HashMap<String, Arc<SessionSlot>>>,
    session_timeout: Duration,
    complete_timeout: Duration,
    ready_check_interval: Duration,
}

impl SessionManager {
    pub fn new(
        cluster: SharedCluster,
        lifecycle: Arc<IndexLifecycle>,
        probe: Arc<HealthProbe>,
        coordinator: Arc<DeploymentCoordinator>,
    ) -> Self {
        Self {
            cluster,
            lifecycle,
            probe,
            coordinator,
            sessions: tokio::sync::Mutex::new(HashMap::new()),
            session_timeout: SESSION_TIMEOUT,
            complete_timeout: COMPLETE_READY_TIMEOUT,
            ready_check_interval: Duration::from_secs(2),
        }
    }

    /// Shrink wait timing; test-only tuning.
    #[cfg(test)]
    fn with_timing(mut self, complete_timeout: Duration, interval: Duration) -> Self {
        self.complete_timeout = complete_timeout;
        self.ready_check_interval = interval;
        self
    }

    /// Open a session: pick the staging color, create the timestamped target
    /// index with the configured mapping, and register the session.
    pub async fn start(
        &self,
        alias: &str,
        strategy: Strategy,
        estimated_total: Option<u64>,
    ) -> ControlResult<Session> {
        if alias.is_empty() || alias.chars().any(char::is_whitespace) {
            return Err(ControlError::invalid(
                "alias must be non-empty and contain no whitespace",
            ));
        }

        let target_color = self.coordinator.next_color(alias).await?;
        let target_index = self.lifecycle.generate_name(alias, Some(target_color));

        // Fails if the index already exists; a second start in the same
        // second against the same color collides here rather than silently
        // sharing an index.
        self.lifecycle.create(&target_index, None).await?;

        let now = Utc::now();
        let session = Session {
            session_id: generate_session_id(),
            alias: alias.to_string(),
            target_index,
            target_color,
            strategy,
            total_batches: 0,
            processed_batches: 0,
            total_documents: 0,
            processed_documents: 0,
            failed_documents: 0,
            estimated_total,
            status: SessionStatus::Active,
            created_at: now,
            last_batch_at: now,
            errors: Vec::new(),
        };

        tracing::info!(
            session_id = session.session_id.as_str(),
            alias = alias,
            target_index = session.target_index.as_str(),
            color = %target_color,
            strategy = %strategy,
            "session started"
        );

        let slot = Arc::new(SessionSlot {
            state: tokio::sync::Mutex::new(session.clone()),
        });
        self.sessions
            .lock()
            .await
            .insert(session.session_id.clone(), slot);

        Ok(session)
    }

    /// Snapshot a session by id.
    pub async fn get(&self, session_id: &str) -> Option<Session> {
        let slot = self.slot(session_id).await?;
        let state = slot.state.lock().await.clone();
        Some(state)
    }

    /// Snapshots of every non-terminal session.
    pub async fn list_active(&self) -> Vec<Session> {
        let slots: Vec<Arc<SessionSlot>> =
            self.sessions.lock().await.values().cloned().collect();

        let mut active = Vec::new();
        for slot in slots {
            let session = slot.state.lock().await;
            if session.status == SessionStatus::Active {
                active.push(session.clone());
            }
        }
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        active
    }

    /// Ingest one batch into the session's target index.
    ///
    /// Ids are normalized (`id`, then `recordId`, then a positional
    /// placeholder) and must be unique within the batch: a duplicate rejects
    /// the whole batch before anything reaches the cluster. Per-document
    /// failures are counted and recorded, not raised.
    pub async fn process_batch(
        &self,
        session_id: &str,
        documents: &[Value],
    ) -> ControlResult<BatchResult> {
        if documents.is_empty() {
            return Err(ControlError::invalid("batch contains no documents"));
        }
        if documents.len() > MAX_BATCH_DOCUMENTS {
            return Err(ControlError::invalid(format!(
                "batch of {} documents exceeds the {} limit",
                documents.len(),
                MAX_BATCH_DOCUMENTS
            )));
        }

        let slot = self.slot(session_id).await.ok_or_else(|| {
            ControlError::not_found(format!("session '{}' not found", session_id))
        })?;

        // Per-session serialization point: one in-flight batch per session.
        let mut session = slot.state.lock().await;
        if session.status != SessionStatus::Active {
            return Err(ControlError::conflict(format!(
                "session '{}' is {}, not active",
                session_id, session.status
            )));
        }

        let batch_number = session.total_batches + 1;
        let epoch_ms = Utc::now().timestamp_millis();
        let docs = ingest::assign_doc_ids(documents, |position| {
            format!("doc_{}_{}_{}_{}", session_id, batch_number, position, epoch_ms)
        });

        if let Some(duplicate) = ingest::find_duplicate_id(&docs) {
            return Err(ControlError::invalid(format!(
                "duplicate document id '{}' in batch",
                duplicate
            )));
        }

        let target_index = session.target_index.clone();
        let bulk_result = self.coordinator.bulk_index(&target_index, &docs).await;
        let outcome = match bulk_result {
            Ok(outcome) => outcome,
            Err(err) => {
                // Whole-batch failure (transport, serialization): record and
                // propagate; the session stays active for further batches.
                session.total_batches = batch_number;
                session.last_batch_at = Utc::now();
                session.push_error(SessionError {
                    batch_number: Some(batch_number),
                    phase: Some("indexing".to_string()),
                    document_ref: None,
                    error: err.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(err);
            }
        };

        let batch_errors: Vec<SessionError> = outcome
            .errors
            .iter()
            .map(|e| {
                let mut session_error = SessionError::from(e);
                session_error.batch_number = Some(batch_number);
                session_error
            })
            .collect();

        session.total_batches = batch_number;
        session.processed_batches += 1;
        session.total_documents += documents.len() as u64;
        session.processed_documents += outcome.successful;
        session.failed_documents += outcome.failed;
        session.last_batch_at = Utc::now();
        for error in &batch_errors {
            session.push_error(error.clone());
        }

        tracing::debug!(
            session_id = session_id,
            batch = batch_number,
            successful = outcome.successful,
            failed = outcome.failed,
            total_processed = session.processed_documents,
            "batch processed"
        );

        Ok(BatchResult {
            session_id: session_id.to_string(),
            batch_number,
            successful: outcome.successful,
            failed: outcome.failed,
            errors: batch_errors,
            session_status: session.status,
            total_processed: session.processed_documents,
            total_failed: session.failed_documents,
            progress: session.progress(),
        })
    }

    /// Finish a session: refresh, reconcile counts, wait for readiness,
    /// validate, and (under AUTO_SWAP) move the alias.
    ///
    /// Any failure after the refresh marks the session failed with
    /// phase=completion and surfaces the error.
    pub async fn complete(&self, session_id: &str) -> ControlResult<DeploymentState> {
        let slot = self.slot(session_id).await.ok_or_else(|| {
            ControlError::not_found(format!("session '{}' not found", session_id))
        })?;

        let mut session = slot.state.lock().await;
        if session.status != SessionStatus::Active {
            return Err(ControlError::conflict(format!(
                "session '{}' is {}, not active",
                session_id, session.status
            )));
        }

        let finished = self.finish(&mut session).await;
        match finished {
            Ok(state) => Ok(state),
            Err(err) => {
                session.status = SessionStatus::Failed;
                session.push_error(SessionError {
                    batch_number: None,
                    phase: Some("completion".to_string()),
                    document_ref: None,
                    error: err.to_string(),
                    timestamp: Utc::now(),
                });
                tracing::error!(
                    session_id = session.session_id.as_str(),
                    target_index = session.target_index.as_str(),
                    error = %err,
                    "session completion failed"
                );
                Err(err)
            }
        }
    }

    async fn finish(&self, session: &mut Session) -> ControlResult<DeploymentState> {
        let target_index = session.target_index.clone();

        self.cluster.refresh(&target_index).await?;

        // The cluster's count is authoritative. Using it as the readiness
        // expectation avoids waiting forever when a source under-reported.
        let actual_count = self.cluster.count(&target_index).await?;
        if actual_count != session.processed_documents {
            tracing::warn!(
                session_id = session.session_id.as_str(),
                target_index = target_index.as_str(),
                processed = session.processed_documents,
                actual = actual_count,
                "document count mismatch at completion; trusting the cluster"
            );
        }

        self.probe
            .wait_ready(
                &target_index,
                WaitOptions {
                    timeout: self.complete_timeout,
                    check_interval: self.ready_check_interval,
                    expected_doc_count: Some(actual_count),
                },
            )
            .await?;

        if !self.probe.validate(&target_index).await {
            return Err(ControlError::HealthCheckFailed(target_index));
        }

        if session.strategy == Strategy::AutoSwap {
            self.coordinator
                .swap_alias(&session.alias, session.target_color)
                .await?;
        }
        session.status = SessionStatus::Completed;

        tracing::info!(
            session_id = session.session_id.as_str(),
            alias = session.alias.as_str(),
            target_index = target_index.as_str(),
            documents = actual_count,
            strategy = %session.strategy,
            "session completed"
        );

        let mut state = self.coordinator.status(&session.alias).await?;
        state.strategy = session.strategy;
        if session.strategy == Strategy::Safe {
            // The freshly built index is the staging side regardless of what
            // else exists; report it explicitly.
            state.staging_color = Some(session.target_color);
            state.staging_index = Some(target_index);
            state.status = DeploymentStatus::ReadyForSwap;
        }
        Ok(state)
    }

    /// Abort a session: best-effort delete of the target index, session
    /// marked failed. The alias is never touched.
    pub async fn cancel(&self, session_id: &str) -> ControlResult<()> {
        let slot = self.slot(session_id).await.ok_or_else(|| {
            ControlError::not_found(format!("session '{}' not found", session_id))
        })?;

        let mut session = slot.state.lock().await;
        if session.status != SessionStatus::Active {
            return Err(ControlError::conflict(format!(
                "session '{}' is {}, not active",
                session_id, session.status
            )));
        }

        if let Err(err) = self.cluster.delete_index(&session.target_index).await {
            tracing::warn!(
                session_id = session_id,
                target_index = session.target_index.as_str(),
                error = %err,
                "failed to delete target index on cancel"
            );
        }
        session.status = SessionStatus::Failed;

        tracing::info!(
            session_id = session_id,
            target_index = session.target_index.as_str(),
            "session cancelled"
        );
        Ok(())
    }

    /// One pass of the expiry sweep.
    ///
    /// Idle non-terminal sessions are marked expired and dropped; terminal
    /// sessions are retained for status queries until they age out the same
    /// way. Target indices are never deleted here - an expired session's
    /// index may still be promoted manually.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> usize {
        let timeout = chrono::Duration::from_std(self.session_timeout)
            .unwrap_or_else(|_| chrono::Duration::hours(1));

        let mut sessions = self.sessions.lock().await;
        let mut removed = Vec::new();

        for (id, slot) in sessions.iter() {
            // A held lock means a batch is in flight; that session is alive.
            let Ok(mut session) = slot.state.try_lock() else {
                continue;
            };
            if now - session.last_batch_at <= timeout {
                continue;
            }

            if !session.status.is_terminal() {
                session.status = SessionStatus::Expired;
                tracing::info!(
                    session_id = id.as_str(),
                    target_index = session.target_index.as_str(),
                    "session expired; target index retained"
                );
            }
            removed.push(id.clone());
        }

        for id in &removed {
            sessions.remove(id);
        }
        removed.len()
    }

    /// Run the sweep forever at the configured cadence.
    pub async fn run_expiry_sweep(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = self.sweep_once(Utc::now()).await;
            if removed > 0 {
                tracing::info!(removed = removed, "expiry sweep removed sessions");
            }
        }
    }

    async fn slot(&self, session_id: &str) -> Option<Arc<SessionSlot>> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    #[cfg(test)]
    async fn backdate(&self, session_id: &str, by: Duration) {
        let slot = self.slot(session_id).await.unwrap();
        let mut session = slot.state.lock().await;
        session.last_batch_at = session.last_batch_at - chrono::Duration::from_std(by).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory::MemoryCluster;
    use crate::cluster::ClusterOps;
    use crate::deploy::AliasRegistry;
    use crate::mapping::ProductMapping;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn build(cluster: Arc<MemoryCluster>) -> SessionManager {
        let shared: SharedCluster = cluster;
        let registry = Arc::new(AliasRegistry::new(shared.clone()));
        let lifecycle = Arc::new(IndexLifecycle::new(shared.clone(), Arc::new(ProductMapping)));
        let probe = Arc::new(HealthProbe::new(shared.clone()));
        let coordinator = Arc::new(DeploymentCoordinator::new(
            shared.clone(),
            registry,
            lifecycle.clone(),
            probe.clone(),
        ));
        SessionManager::new(shared, lifecycle, probe, coordinator)
            .with_timing(Duration::from_millis(80), Duration::from_millis(5))
    }

    fn docs(ids: &[&str]) -> Vec<Value> {
        ids.iter().map(|id| json!({ "id": id, "name": id })).collect()
    }

    #[test]
    fn test_session_id_shape() {
        let id = generate_session_id();
        let mut parts = id.splitn(3, '_');
        assert_eq!(parts.next(), Some("batch"));
        let epoch = parts.next().unwrap();
        assert!(epoch.bytes().all(|b| b.is_ascii_digit()));
        let suffix = parts.next().unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_start_creates_target_index() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster.clone());

        let session = manager.start("products", Strategy::Safe, Some(100)).await.unwrap();

        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.target_color, Color::Blue);
        assert!(session.target_index.starts_with("products_blue_"));
        assert_eq!(session.total_batches, 0);
        assert!(cluster.index_exists(&session.target_index).await.unwrap());
    }

    #[tokio::test]
    async fn test_start_rejects_blank_or_spaced_alias() {
        let manager = build(Arc::new(MemoryCluster::new()));
        for alias in ["", "bad alias"] {
            let err = manager.start(alias, Strategy::Safe, None).await.unwrap_err();
            assert!(matches!(err, ControlError::InvalidArgument(_)));
        }
    }

    #[tokio::test]
    async fn test_process_batch_updates_counters_and_progress() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster.clone());
        let session = manager.start("products", Strategy::Safe, Some(6)).await.unwrap();

        let first = manager
            .process_batch(&session.session_id, &docs(&["A", "B", "C"]))
            .await
            .unwrap();
        assert_eq!(first.batch_number, 1);
        assert_eq!(first.successful, 3);
        assert_eq!(first.failed, 0);
        assert_eq!(first.progress, Some(50.0));

        let second = manager
            .process_batch(&session.session_id, &docs(&["D", "E", "F"]))
            .await
            .unwrap();
        assert_eq!(second.batch_number, 2);
        assert_eq!(second.total_processed, 6);
        assert_eq!(second.progress, Some(100.0));

        let snapshot = manager.get(&session.session_id).await.unwrap();
        assert_eq!(snapshot.total_batches, 2);
        assert_eq!(snapshot.processed_batches, 2);
        assert_eq!(snapshot.total_documents, 6);
        assert_eq!(snapshot.processed_documents, 6);
        assert_eq!(snapshot.failed_documents, 0);
        assert_eq!(cluster.docs(&session.target_index).len(), 6);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected_before_any_write() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster.clone());
        let session = manager.start("products", Strategy::Safe, None).await.unwrap();

        let err = manager
            .process_batch(&session.session_id, &docs(&["X", "Y", "X"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidArgument(_)));

        // No bulk request went out and counters are untouched
        assert_eq!(cluster.bulk_calls.load(Ordering::SeqCst), 0);
        let snapshot = manager.get(&session.session_id).await.unwrap();
        assert_eq!(snapshot.total_batches, 0);
        assert_eq!(snapshot.total_documents, 0);
    }

    #[tokio::test]
    async fn test_batch_size_boundaries() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster.clone());
        let session = manager.start("products", Strategy::Safe, None).await.unwrap();

        let empty: Vec<Value> = Vec::new();
        assert!(matches!(
            manager.process_batch(&session.session_id, &empty).await,
            Err(ControlError::InvalidArgument(_))
        ));

        let exactly_limit: Vec<Value> =
            (0..MAX_BATCH_DOCUMENTS).map(|i| json!({ "id": i.to_string() })).collect();
        let result = manager
            .process_batch(&session.session_id, &exactly_limit)
            .await
            .unwrap();
        assert_eq!(result.successful, MAX_BATCH_DOCUMENTS as u64);

        let over_limit: Vec<Value> =
            (0..=MAX_BATCH_DOCUMENTS).map(|i| json!({ "id": i.to_string() })).collect();
        assert!(matches!(
            manager.process_batch(&session.session_id, &over_limit).await,
            Err(ControlError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let manager = build(Arc::new(MemoryCluster::new()));
        let err = manager
            .process_batch("batch_0_aaaaaaaaa", &docs(&["A"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_partial_failures_recorded_not_raised() {
        let cluster = Arc::new(MemoryCluster::new());
        cluster.reject_id("bad");
        let manager = build(cluster.clone());
        let session = manager.start("products", Strategy::Safe, None).await.unwrap();

        let result = manager
            .process_batch(&session.session_id, &docs(&["good", "bad"]))
            .await
            .unwrap();

        assert_eq!(result.successful, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].document_ref.as_deref(), Some("bad"));
        assert_eq!(result.errors[0].batch_number, Some(1));
        assert_eq!(result.session_status, SessionStatus::Active);

        let snapshot = manager.get(&session.session_id).await.unwrap();
        assert_eq!(snapshot.failed_documents, 1);
        assert_eq!(snapshot.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_ids_get_placeholders() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster.clone());
        let session = manager.start("products", Strategy::Safe, None).await.unwrap();

        let result = manager
            .process_batch(
                &session.session_id,
                &[json!({ "recordId": 42 }), json!({ "name": "anonymous" })],
            )
            .await
            .unwrap();
        assert_eq!(result.successful, 2);

        let stored = cluster.docs(&session.target_index);
        assert!(stored.contains_key("42"));
        assert!(stored
            .keys()
            .any(|id| id.starts_with(&format!("doc_{}_1_1_", session.session_id))));
    }

    #[tokio::test]
    async fn test_complete_safe_reports_ready_for_swap() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster.clone());
        let session = manager.start("products", Strategy::Safe, None).await.unwrap();
        manager
            .process_batch(&session.session_id, &docs(&["A", "B", "C"]))
            .await
            .unwrap();

        let state = manager.complete(&session.session_id).await.unwrap();

        assert_eq!(state.status, DeploymentStatus::ReadyForSwap);
        assert_eq!(state.staging_index.as_deref(), Some(session.target_index.as_str()));
        assert_eq!(state.active_index, None);
        assert!(!cluster.alias_exists("products").await.unwrap());

        let snapshot = manager.get(&session.session_id).await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_complete_auto_swap_binds_alias() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster.clone());
        let session = manager
            .start("products", Strategy::AutoSwap, None)
            .await
            .unwrap();
        manager
            .process_batch(&session.session_id, &docs(&["A", "B", "C"]))
            .await
            .unwrap();

        let state = manager.complete(&session.session_id).await.unwrap();

        assert_eq!(state.status, DeploymentStatus::Completed);
        assert_eq!(state.active_index.as_deref(), Some(session.target_index.as_str()));
        assert_eq!(
            cluster.alias_indices("products").await.unwrap(),
            vec![session.target_index.clone()]
        );
        // Active count equals unique successfully indexed documents
        assert_eq!(cluster.count("products").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_complete_failure_marks_session_failed() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster.clone());
        let session = manager.start("products", Strategy::Safe, None).await.unwrap();
        manager
            .process_batch(&session.session_id, &docs(&["A"]))
            .await
            .unwrap();

        // Health goes red before completion; validation must fail
        cluster.mark_red(&session.target_index);

        let err = manager.complete(&session.session_id).await.unwrap_err();
        assert!(matches!(err, ControlError::HealthCheckFailed(_)));

        let snapshot = manager.get(&session.session_id).await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Failed);
        let last = snapshot.errors.last().unwrap();
        assert_eq!(last.phase.as_deref(), Some("completion"));

        // Terminal stickiness: no further batches
        let err = manager
            .process_batch(&session.session_id, &docs(&["B"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cancel_deletes_target_index() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster.clone());
        let session = manager.start("products", Strategy::Safe, None).await.unwrap();

        manager.cancel(&session.session_id).await.unwrap();

        assert!(!cluster.index_exists(&session.target_index).await.unwrap());
        let snapshot = manager.get(&session.session_id).await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Failed);

        // Alias untouched, completion now conflicts
        assert!(!cluster.alias_exists("products").await.unwrap());
        assert!(matches!(
            manager.complete(&session.session_id).await,
            Err(ControlError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_expiry_sweep_removes_idle_sessions_keeps_index() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster.clone());
        let session = manager.start("products", Strategy::Safe, None).await.unwrap();
        manager
            .process_batch(&session.session_id, &docs(&["A", "B"]))
            .await
            .unwrap();

        // One hour and one minute of silence
        manager
            .backdate(&session.session_id, Duration::from_secs(61 * 60))
            .await;
        let removed = manager.sweep_once(Utc::now()).await;
        assert_eq!(removed, 1);

        // Gone from the map, so a late batch reads as not-found
        assert!(manager.get(&session.session_id).await.is_none());
        assert!(matches!(
            manager.process_batch(&session.session_id, &docs(&["C"])).await,
            Err(ControlError::NotFound(_))
        ));

        // The staging index survives for manual promotion
        assert!(cluster.index_exists(&session.target_index).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_leaves_fresh_sessions_alone() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster);
        let session = manager.start("products", Strategy::Safe, None).await.unwrap();

        assert_eq!(manager.sweep_once(Utc::now()).await, 0);
        assert!(manager.get(&session.session_id).await.is_some());
    }

    #[tokio::test]
    async fn test_sessions_alternate_colors_per_alias() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster.clone());

        // First session goes blue, completes with auto-swap
        let first = manager
            .start("products", Strategy::AutoSwap, None)
            .await
            .unwrap();
        manager
            .process_batch(&first.session_id, &docs(&["A"]))
            .await
            .unwrap();
        manager.complete(&first.session_id).await.unwrap();
        assert_eq!(first.target_color, Color::Blue);

        // Next session stages the opposite color
        let second = manager.start("products", Strategy::Safe, None).await.unwrap();
        assert_eq!(second.target_color, Color::Green);
    }

    #[tokio::test]
    async fn test_list_active_excludes_terminal() {
        let cluster = Arc::new(MemoryCluster::new());
        let manager = build(cluster);

        let keep = manager.start("products-a", Strategy::Safe, None).await.unwrap();
        let cancelled = manager.start("products-b", Strategy::Safe, None).await.unwrap();
        manager.cancel(&cancelled.session_id).await.unwrap();

        let active = manager.list_active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].session_id, keep.session_id);
    }
}
