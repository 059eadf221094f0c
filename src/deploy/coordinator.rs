// Deployment coordinator - the blue/green state machine
//
// Owns color assignment, swap, rollback, and cleanup for every alias. State
// is derived on demand from the cluster (see state.rs); the coordinator's job
// is sequencing: build the staging index, fill it, prove it healthy, then
// hand the alias over atomically - or put it back where it was.
//
// Tie-break rule used everywhere: when several candidate indices exist, the
// lexicographically greatest name wins, which by construction is the most
// recent timestamp.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::cluster::SharedCluster;
use crate::error::{ControlError, ControlResult};

use super::alias::AliasRegistry;
use super::color::Color;
use super::health::{HealthProbe, WaitOptions};
use super::ingest::{self, IngestOutcome};
use super::lifecycle::IndexLifecycle;
use super::state::{DeploymentState, Strategy};

/// Deadline for the post-ingest readiness wait.
const DEPLOY_READY_TIMEOUT: Duration = Duration::from_secs(300);

/// Sequences blue/green deployments for all aliases.
pub struct DeploymentCoordinator {
    cluster: SharedCluster,
    registry: Arc<AliasRegistry>,
    lifecycle: Arc<IndexLifecycle>,
    probe: Arc<HealthProbe>,
    chunk_size: usize,
    ready_timeout: Duration,
    ready_check_interval: Duration,
}

impl DeploymentCoordinator {
    pub fn new(
        cluster: SharedCluster,
        registry: Arc<AliasRegistry>,
        lifecycle: Arc<IndexLifecycle>,
        probe: Arc<HealthProbe>,
    ) -> Self {
        Self {
            cluster,
            registry,
            lifecycle,
            probe,
            chunk_size: ingest::DEFAULT_CHUNK_SIZE,
            ready_timeout: DEPLOY_READY_TIMEOUT,
            ready_check_interval: Duration::from_secs(2),
        }
    }

    /// Shrink ingest chunks and wait timing; test-only tuning.
    #[cfg(test)]
    pub fn with_timing(mut self, chunk_size: usize, timeout: Duration, interval: Duration) -> Self {
        self.chunk_size = chunk_size;
        self.ready_timeout = timeout;
        self.ready_check_interval = interval;
        self
    }

    /// Derive the current deployment state for an alias.
    pub async fn status(&self, alias: &str) -> ControlResult<DeploymentState> {
        let active = self.registry.indices_for(alias).await?;
        let all = self
            .lifecycle
            .indices_matching(&format!("{}_*", alias))
            .await?;
        Ok(DeploymentState::derive(alias, &active, &all))
    }

    /// The color the next deployment of `alias` targets.
    pub async fn next_color(&self, alias: &str) -> ControlResult<Color> {
        Ok(self.status(alias).await?.next_color())
    }

    /// Run a whole deployment in one call: create the staging index, ingest
    /// every document, wait for readiness, validate, and - under
    /// `Strategy::AutoSwap` - move the alias over.
    pub async fn deploy(
        &self,
        alias: &str,
        documents: &[Value],
        strategy: Strategy,
    ) -> ControlResult<DeploymentState> {
        let target_color = self.next_color(alias).await?;
        let target_index = self.lifecycle.generate_name(alias, Some(target_color));

        tracing::info!(
            alias = alias,
            index = target_index.as_str(),
            color = %target_color,
            docs = documents.len(),
            strategy = %strategy,
            "starting deployment"
        );
        self.lifecycle.create(&target_index, None).await?;

        let docs = ingest::assign_doc_ids(documents, |position| {
            format!("doc_{}_{}", alias, position)
        });
        let outcome = self
            .bulk_index(&target_index, &docs)
            .await?;
        if outcome.failed > 0 {
            tracing::warn!(
                index = target_index.as_str(),
                failed = outcome.failed,
                "deployment ingest had per-document failures"
            );
        }

        self.probe
            .wait_ready(
                &target_index,
                WaitOptions {
                    timeout: self.ready_timeout,
                    check_interval: self.ready_check_interval,
                    expected_doc_count: Some(documents.len() as u64),
                },
            )
            .await?;

        if !self.probe.validate(&target_index).await {
            return Err(ControlError::HealthCheckFailed(target_index));
        }

        if strategy == Strategy::AutoSwap {
            self.swap_alias(alias, target_color).await?;
        }

        let mut state = self.status(alias).await?;
        state.strategy = strategy;
        if outcome.failed > 0 {
            state.error = Some(format!(
                "{} of {} documents failed to index",
                outcome.failed,
                documents.len()
            ));
        }
        Ok(state)
    }

    /// Atomically point the alias at its staging index.
    ///
    /// Preconditions: a staging index exists and its color matches
    /// `target_color`. The registry builds the remove+add action list, so the
    /// cluster linearizes the change.
    pub async fn swap_alias(&self, alias: &str, target_color: Color) -> ControlResult<()> {
        let state = self.status(alias).await?;

        let staging_index = state.staging_index.ok_or_else(|| {
            ControlError::precondition(format!("alias '{}' has no staging index to swap to", alias))
        })?;
        if state.staging_color != Some(target_color) {
            return Err(ControlError::conflict(format!(
                "staging index '{}' is {}, not {}",
                staging_index,
                state
                    .staging_color
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "untagged".to_string()),
                target_color
            )));
        }

        tracing::info!(
            alias = alias,
            from = ?state.active_index,
            to = staging_index.as_str(),
            "swapping alias to staging index"
        );
        self.registry.swap(alias, &staging_index, false).await?;
        Ok(())
    }

    /// Swap the alias back to the most recent index of the non-active color.
    pub async fn rollback(&self, alias: &str) -> ControlResult<DeploymentState> {
        let state = self.status(alias).await?;

        let active_index = state.active_index.clone().ok_or_else(|| {
            ControlError::not_found(format!("alias '{}' has no active index", alias))
        })?;
        let active_color = state.active_color.ok_or_else(|| {
            ControlError::precondition(format!(
                "active index '{}' carries no color tag; cannot infer rollback target",
                active_index
            ))
        })?;

        let previous_color = active_color.opposite();
        let mut candidates = self
            .lifecycle
            .indices_matching(&format!("{}_{}_*", alias, previous_color))
            .await?;
        candidates.sort_by(|a, b| b.cmp(a));

        let previous_index = candidates.first().cloned().ok_or_else(|| {
            ControlError::not_found(format!(
                "no {} index exists for alias '{}' to roll back to",
                previous_color, alias
            ))
        })?;

        tracing::info!(
            alias = alias,
            from = active_index.as_str(),
            to = previous_index.as_str(),
            "rolling back alias"
        );
        self.registry.swap(alias, &previous_index, false).await?;
        self.status(alias).await
    }

    /// Delete every index of the non-active color, never touching the active
    /// index. Deletes are best-effort and sequential; failures are logged and
    /// skipped. Returns the names actually deleted.
    pub async fn cleanup(&self, alias: &str) -> ControlResult<Vec<String>> {
        let state = self.status(alias).await?;

        let active_index = state.active_index.clone().ok_or_else(|| {
            ControlError::not_found(format!("alias '{}' has no active index", alias))
        })?;
        let active_color = state.active_color.ok_or_else(|| {
            ControlError::precondition(format!(
                "active index '{}' carries no color tag; cannot infer cleanup targets",
                active_index
            ))
        })?;

        let pattern = format!("{}_{}_*", alias, active_color.opposite());
        let mut deleted = Vec::new();

        for index in self.lifecycle.indices_matching(&pattern).await? {
            if index == active_index {
                continue;
            }
            match self.lifecycle.delete(&index).await {
                Ok(_) => deleted.push(index),
                Err(err) => tracing::warn!(
                    alias = alias,
                    index = index.as_str(),
                    error = %err,
                    "cleanup failed to delete index; skipping"
                ),
            }
        }

        tracing::info!(alias = alias, deleted = deleted.len(), "cleanup finished");
        Ok(deleted)
    }

    /// Chunked bulk ingest into one index; shared with the session manager.
    pub async fn bulk_index(
        &self,
        index: &str,
        docs: &[(String, Value)],
    ) -> ControlResult<IngestOutcome> {
        ingest::bulk_index(&self.cluster, index, docs, self.chunk_size).await
    }

    /// Promote a specific existing index to be the alias's active index.
    pub async fn promote(&self, alias: &str, target_index: &str) -> ControlResult<()> {
        if !self.lifecycle.exists(target_index).await? {
            return Err(ControlError::not_found(format!(
                "target index '{}' does not exist",
                target_index
            )));
        }
        self.registry.swap(alias, target_index, false).await?;
        Ok(())
    }
}
