// Deployment state model
//
// DeploymentState is computed, never persisted: it is derived on demand from
// what the cluster reports (alias bindings plus the `{alias}_*` index
// pattern). The derivation is a pure function so the state machine's edges
// can be tested without a cluster.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::color::Color;

// ─────────────────────────────────────────────────────────────────────────────
// Status and strategy
// ─────────────────────────────────────────────────────────────────────────────

/// Per-alias deployment state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    Idle,
    Deploying,
    ReadyForSwap,
    Swapping,
    Completed,
    Failed,
    RollingBack,
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "IDLE",
            Self::Deploying => "DEPLOYING",
            Self::ReadyForSwap => "READY_FOR_SWAP",
            Self::Swapping => "SWAPPING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::RollingBack => "ROLLING_BACK",
        };
        f.write_str(s)
    }
}

/// Policy controlling what happens after a validated ingest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Leave the alias untouched; an operator promotes the staging index.
    #[default]
    Safe,
    /// Swap the alias to the new index as soon as validation passes.
    AutoSwap,
}

impl Strategy {
    /// Parse the wire form used in query strings.
    pub fn parse(s: &str) -> Option<Strategy> {
        match s {
            "safe" => Some(Strategy::Safe),
            "auto-swap" | "auto_swap" => Some(Strategy::AutoSwap),
            _ => None,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => f.write_str("safe"),
            Self::AutoSwap => f.write_str("auto-swap"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Deployment state
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of an alias's blue/green deployment state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentState {
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_index: Option<String>,
    pub status: DeploymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_deployment: Option<DateTime<Utc>>,
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeploymentState {
    /// Derive the state for an alias from what the cluster reports.
    ///
    /// `active` is the set of indices the alias is bound to; `all` is every
    /// index matching `{alias}_*`. The staging index is the most recent
    /// (lexicographically greatest name, which equals newest timestamp)
    /// non-active index whose color differs from the active color. Indices
    /// without a recognizable color tag are excluded and reported via a
    /// structured warning so legacy dash-named indices surface to operators
    /// instead of silently participating.
    pub fn derive(alias: &str, active: &[String], all: &[String]) -> DeploymentState {
        // The alias invariant is ≤1 bound index outside an atomic swap; if the
        // cluster ever reports more, pick the newest and flag it.
        let active_index = active.iter().max().cloned();
        if active.len() > 1 {
            tracing::warn!(
                alias = alias,
                bound = ?active,
                "alias bound to multiple indices; using the most recent"
            );
        }
        let active_color = active_index.as_deref().and_then(Color::from_index_name);

        let staging_index = all
            .iter()
            .filter(|name| Some(*name) != active_index.as_ref())
            .filter(|name| match Color::from_index_name(name) {
                Some(color) => match active_color {
                    Some(active) => color != active,
                    None => true,
                },
                None => {
                    tracing::warn!(
                        alias = alias,
                        index = name.as_str(),
                        "index name has no recognizable color tag; excluded from deployment state"
                    );
                    false
                }
            })
            .max()
            .cloned();
        let staging_color = staging_index.as_deref().and_then(Color::from_index_name);

        let status = if staging_index.is_some() {
            DeploymentStatus::ReadyForSwap
        } else if active_index.is_some() {
            DeploymentStatus::Completed
        } else {
            DeploymentStatus::Idle
        };

        let last_deployment = all
            .iter()
            .max()
            .and_then(|name| timestamp_from_name(name));

        DeploymentState {
            alias: alias.to_string(),
            active_color,
            active_index,
            staging_color,
            staging_index,
            status,
            last_deployment,
            strategy: Strategy::Safe,
            error: None,
        }
    }

    /// The color the next deployment should target.
    pub fn next_color(&self) -> Color {
        self.active_color
            .map(Color::opposite)
            .unwrap_or(Color::DEFAULT)
    }
}

/// Parse the 14-character `YYYYMMDDHHMMSS` timestamp embedded in a
/// system-generated index name.
pub fn timestamp_from_name(name: &str) -> Option<DateTime<Utc>> {
    let raw = name.rsplit('_').next()?;
    if raw.len() != 14 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}
