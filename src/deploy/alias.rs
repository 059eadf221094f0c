// Alias registry - CRUD over alias→index bindings
//
// The single place alias membership is ever changed. Every mutation goes
// through one atomic action list, so external observers only ever see the old
// binding or the new one, never both and never neither.

use crate::cluster::{AliasAction, ClusterOps, SharedCluster};
use crate::error::{ControlError, ControlResult};

/// Registry over the cluster's alias bindings.
pub struct AliasRegistry {
    cluster: SharedCluster,
}

impl AliasRegistry {
    pub fn new(cluster: SharedCluster) -> Self {
        Self { cluster }
    }

    pub async fn exists(&self, alias: &str) -> ControlResult<bool> {
        Ok(self.cluster.alias_exists(alias).await?)
    }

    /// Indices bound to the alias; an absent alias is an empty set, not an
    /// error.
    pub async fn indices_for(&self, alias: &str) -> ControlResult<Vec<String>> {
        Ok(self.cluster.alias_indices(alias).await?)
    }

    /// Bind a fresh alias to an index with a single add action.
    pub async fn create(&self, alias: &str, index: &str) -> ControlResult<()> {
        if self.exists(alias).await? {
            return Err(ControlError::conflict(format!(
                "alias '{}' already exists",
                alias
            )));
        }
        self.cluster
            .update_aliases(&[AliasAction::add(index, alias)])
            .await?;
        Ok(())
    }

    /// Atomically move the alias onto `new_index`.
    ///
    /// Builds one remove per currently bound index different from the target,
    /// followed by one add, and applies the list as a single transaction. A
    /// failed update leaves the prior binding intact. With `delete_old`, every
    /// removed index is then deleted sequentially; a delete failure is logged
    /// and skipped, never reverting the swap.
    pub async fn swap(&self, alias: &str, new_index: &str, delete_old: bool) -> ControlResult<bool> {
        let current = self.indices_for(alias).await?;

        let removed: Vec<String> = current
            .iter()
            .filter(|index| index.as_str() != new_index)
            .cloned()
            .collect();

        let mut actions: Vec<AliasAction> = removed
            .iter()
            .map(|index| AliasAction::remove(index, alias))
            .collect();
        actions.push(AliasAction::add(new_index, alias));

        tracing::info!(
            alias = alias,
            new_index = new_index,
            removed = ?removed,
            "swapping alias"
        );
        let acknowledged = self.cluster.update_aliases(&actions).await?;

        if delete_old && acknowledged {
            for index in &removed {
                match self.cluster.delete_index(index).await {
                    Ok(_) => tracing::info!(index = index.as_str(), "deleted old index after swap"),
                    Err(err) => tracing::warn!(
                        alias = alias,
                        index = index.as_str(),
                        error = %err,
                        "failed to delete old index after swap; leaving it in place"
                    ),
                }
            }
        }

        Ok(acknowledged)
    }
}
