// Health probe - readiness checks for freshly built indices
//
// The probe only ever reads: existence, health, count, stats. Transient
// failures inside a wait tick are swallowed and retried; only the wall-clock
// deadline turns them into an error.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::cluster::{ClusterOps, HealthStatus, SharedCluster};
use crate::error::{ControlError, ControlResult};

/// How long a health request may block cluster-side per wait tick.
const TICK_HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for a readiness wait.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Wall-clock deadline for the whole wait
    pub timeout: Duration,
    /// Pause between ticks
    pub check_interval: Duration,
    /// Minimum document count before the index counts as ready
    pub expected_doc_count: Option<u64>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            check_interval: Duration::from_secs(2),
            expected_doc_count: None,
        }
    }
}

/// Probe report for an index, shaped for operators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeStats {
    pub doc_count: u64,
    pub store_size: String,
    pub indexing_rate: u64,
    pub search_rate: u64,
    pub health: HealthStatus,
}

/// Read-only validation of index readiness.
pub struct HealthProbe {
    cluster: SharedCluster,
}

impl HealthProbe {
    pub fn new(cluster: SharedCluster) -> Self {
        Self { cluster }
    }

    /// True when the index exists, its health is not red, and stats are
    /// retrievable. Yellow is acceptable: single-node clusters never go
    /// green on replicated indices.
    pub async fn validate(&self, index: &str) -> bool {
        match self.cluster.index_exists(index).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(index = index, "validation failed: index does not exist");
                return false;
            }
            Err(err) => {
                tracing::warn!(index = index, error = %err, "validation failed: existence check errored");
                return false;
            }
        }

        match self.cluster.health(Some(index), None, None).await {
            Ok(health) if health.status != HealthStatus::Red => {}
            Ok(health) => {
                tracing::warn!(index = index, status = %health.status, "validation failed: index is red");
                return false;
            }
            Err(err) => {
                tracing::warn!(index = index, error = %err, "validation failed: health check errored");
                return false;
            }
        }

        match self.cluster.index_stats(index).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(index = index, error = %err, "validation failed: stats unavailable");
                false
            }
        }
    }

    /// Poll until the index is ready or the deadline passes.
    ///
    /// A tick succeeds when the index exists, the expected document count (if
    /// any) is met, and a yellow-or-better health report comes back. Errors
    /// inside a tick are treated as not-ready-yet and retried.
    pub async fn wait_ready(&self, index: &str, opts: WaitOptions) -> ControlResult<()> {
        let started = Utc::now();

        loop {
            if self.ready_tick(index, opts.expected_doc_count).await {
                return Ok(());
            }

            let elapsed = (Utc::now() - started)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if elapsed >= opts.timeout {
                tracing::error!(
                    index = index,
                    timeout_secs = opts.timeout.as_secs(),
                    "index did not become ready before the deadline"
                );
                return Err(ControlError::Timeout {
                    index: index.to_string(),
                    seconds: opts.timeout.as_secs(),
                });
            }

            tokio::time::sleep(opts.check_interval).await;
        }
    }

    async fn ready_tick(&self, index: &str, expected: Option<u64>) -> bool {
        match self.cluster.index_exists(index).await {
            Ok(true) => {}
            _ => return false,
        }

        if let Some(expected) = expected {
            match self.cluster.count(index).await {
                Ok(count) if count >= expected => {}
                Ok(count) => {
                    tracing::debug!(
                        index = index,
                        count = count,
                        expected = expected,
                        "waiting for documents"
                    );
                    return false;
                }
                Err(_) => return false,
            }
        }

        matches!(
            self.cluster
                .health(Some(index), Some(HealthStatus::Yellow), Some(TICK_HEALTH_TIMEOUT))
                .await,
            Ok(health) if health.status != HealthStatus::Red
        )
    }

    /// Operator-facing stats snapshot for an index.
    pub async fn stats(&self, index: &str) -> ControlResult<ProbeStats> {
        let stats = self.cluster.index_stats(index).await?;
        let health = self.cluster.health(Some(index), None, None).await?;

        Ok(ProbeStats {
            doc_count: stats.doc_count,
            store_size: format_bytes(stats.store_size_bytes),
            indexing_rate: stats.indexing_rate,
            search_rate: stats.search_rate,
            health: health.status,
        })
    }
}

/// Human-readable byte size (binary units).
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
