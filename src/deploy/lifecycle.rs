// Index lifecycle - creation, deletion, timestamped name generation
//
// Index names carry their own provenance: `{alias}_{color}_{YYYYMMDDHHMMSS}`
// for deployment slots, `{alias}_{YYYYMMDDHHMMSSfff}` for colorless ad-hoc
// indices. The timestamp is the wall clock at creation, so lexicographic
// order on names equals creation order - every tie-break in the control
// plane leans on that.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cluster::{ClusterOps, SharedCluster};
use crate::error::{ControlError, ControlResult};
use crate::mapping::MappingProvider;

use super::color::Color;
use super::state::timestamp_from_name;

/// Creates and deletes the physical indices deployments run against.
pub struct IndexLifecycle {
    cluster: SharedCluster,
    mapping: Arc<dyn MappingProvider>,
}

impl IndexLifecycle {
    pub fn new(cluster: SharedCluster, mapping: Arc<dyn MappingProvider>) -> Self {
        Self { cluster, mapping }
    }

    /// Generate a timestamped index name from the current wall clock.
    ///
    /// With a color: 14-character second resolution. Without: 17-character
    /// millisecond resolution, enough to keep colorless names unique under
    /// rapid creation.
    pub fn generate_name(&self, alias: &str, color: Option<Color>) -> String {
        let now = Utc::now();
        match color {
            Some(color) => format!("{}_{}_{}", alias, color, now.format("%Y%m%d%H%M%S")),
            None => format!("{}_{}", alias, now.format("%Y%m%d%H%M%S%3f")),
        }
    }

    /// Create an index with the configured mapping, optionally binding an
    /// alias in the same call. Fails if the index already exists.
    pub async fn create(&self, name: &str, alias: Option<&str>) -> ControlResult<()> {
        if self.cluster.index_exists(name).await? {
            return Err(ControlError::precondition(format!(
                "index '{}' already exists",
                name
            )));
        }

        let mapping = self.mapping.mapping();
        self.cluster.create_index(name, &mapping, alias).await?;
        tracing::info!(index = name, alias = ?alias, "created index");
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> ControlResult<bool> {
        let deleted = self.cluster.delete_index(name).await?;
        if deleted {
            tracing::info!(index = name, "deleted index");
        }
        Ok(deleted)
    }

    pub async fn exists(&self, name: &str) -> ControlResult<bool> {
        Ok(self.cluster.index_exists(name).await?)
    }

    /// All index names matching a pattern; unmatched patterns are empty.
    pub async fn indices_matching(&self, pattern: &str) -> ControlResult<Vec<String>> {
        Ok(self.cluster.indices_matching(pattern).await?)
    }

    /// Color tag embedded in an index name, if any.
    pub fn extract_color(name: &str) -> Option<Color> {
        Color::from_index_name(name)
    }

    /// Decompose a system-generated name into `(alias, color, timestamp)`.
    ///
    /// Total on names this module generates: the trailing
    /// `_{color}_{YYYYMMDDHHMMSS}` suffix is stripped off and whatever
    /// precedes it is the alias, so aliases containing underscores parse
    /// correctly. Colorless base-form names and legacy dash-separated names
    /// return None.
    pub fn parse_name(name: &str) -> Option<(&str, Color, DateTime<Utc>)> {
        let timestamp = timestamp_from_name(name)?;
        let (rest, _) = name.rsplit_once('_')?;
        let (alias, color_tag) = rest.rsplit_once('_')?;
        let color: Color = color_tag.parse().ok()?;
        if alias.is_empty() {
            return None;
        }
        Some((alias, color, timestamp))
    }
}
