// In-memory cluster double for control-plane tests
//
// Implements ClusterOps over plain HashMaps so coordinator and session tests
// can run whole deployment scenarios without a cluster. Mutations follow the
// contract the real cluster guarantees: alias action lists apply atomically,
// absent aliases read as empty, unmatched index patterns read as empty.
//
// Failure injection is deliberately narrow: per-id bulk rejections, red
// health per index, and stats failures - the knobs the scenarios need.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::types::{
    AliasAction, BulkItemError, BulkItemOutcome, BulkOp, BulkSummary, ClusterHealth, HealthStatus,
    IndexStats,
};
use super::{ClusterError, ClusterOps, ClusterResult};

#[derive(Default)]
struct MemoryIndex {
    mapping: Value,
    docs: HashMap<String, Value>,
}

#[derive(Default)]
struct MemoryState {
    indices: HashMap<String, MemoryIndex>,
    aliases: HashMap<String, HashSet<String>>,
}

/// In-memory ClusterOps implementation.
#[derive(Default)]
pub struct MemoryCluster {
    state: Mutex<MemoryState>,
    /// Document ids whose bulk items fail with a parse error
    pub reject_ids: Mutex<HashSet<String>>,
    /// Indices reporting red health
    pub red_indices: Mutex<HashSet<String>>,
    /// Indices whose stats calls fail
    pub stats_failures: Mutex<HashSet<String>>,
    /// Number of bulk requests received (for no-write assertions)
    pub bulk_calls: AtomicUsize,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents currently in an index, by id.
    pub fn docs(&self, index: &str) -> HashMap<String, Value> {
        let state = self.state.lock().unwrap();
        state
            .indices
            .get(index)
            .map(|i| i.docs.clone())
            .unwrap_or_default()
    }

    pub fn mark_red(&self, index: &str) {
        self.red_indices.lock().unwrap().insert(index.to_string());
    }

    pub fn reject_id(&self, id: &str) {
        self.reject_ids.lock().unwrap().insert(id.to_string());
    }

    /// Resolve a name that may be an alias into concrete index names.
    fn resolve(state: &MemoryState, name: &str) -> Vec<String> {
        if let Some(members) = state.aliases.get(name) {
            members.iter().cloned().collect()
        } else if state.indices.contains_key(name) {
            vec![name.to_string()]
        } else {
            Vec::new()
        }
    }
}

/// Minimal glob: '*' matches any run of characters.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }

    // First part anchors at the start, last at the end, middles in order
    let mut rest = match name.strip_prefix(parts[0]) {
        Some(rest) => rest,
        None => return false,
    };
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(parts[parts.len() - 1])
}

#[async_trait]
impl ClusterOps for MemoryCluster {
    async fn bulk(&self, ops: &[BulkOp], _refresh: bool) -> ClusterResult<BulkSummary> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let rejects = self.reject_ids.lock().unwrap();

        let mut items = Vec::with_capacity(ops.len());
        let mut any_errors = false;

        for op in ops {
            let BulkOp::Index { index, id, source } = op;

            let outcome = if rejects.contains(id) {
                any_errors = true;
                BulkItemOutcome {
                    op: op.kind().to_string(),
                    id: id.clone(),
                    status: 400,
                    error: Some(BulkItemError {
                        kind: "mapper_parsing_exception".to_string(),
                        reason: format!("failed to parse document [{}]", id),
                        status: Some(400),
                    }),
                }
            } else if let Some(target) = state.indices.get_mut(index) {
                let replaced = target.docs.insert(id.clone(), source.clone()).is_some();
                BulkItemOutcome {
                    op: op.kind().to_string(),
                    id: id.clone(),
                    status: if replaced { 200 } else { 201 },
                    error: None,
                }
            } else {
                any_errors = true;
                BulkItemOutcome {
                    op: op.kind().to_string(),
                    id: id.clone(),
                    status: 404,
                    error: Some(BulkItemError {
                        kind: "index_not_found_exception".to_string(),
                        reason: format!("no such index [{}]", index),
                        status: Some(404),
                    }),
                }
            };
            items.push(outcome);
        }

        Ok(BulkSummary { any_errors, items })
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> ClusterResult<bool> {
        let mut state = self.state.lock().unwrap();

        // Validate and apply against a copy so a failed list changes nothing
        let mut aliases = state.aliases.clone();
        for action in actions {
            match action {
                AliasAction::Add(target) => {
                    if !state.indices.contains_key(&target.index) {
                        return Err(ClusterError::UnexpectedStatus {
                            status: 404,
                            body: format!("no such index [{}]", target.index),
                        });
                    }
                    aliases
                        .entry(target.alias.clone())
                        .or_default()
                        .insert(target.index.clone());
                }
                AliasAction::Remove(target) => {
                    let bound = match aliases.get_mut(&target.alias) {
                        Some(members) => members.remove(&target.index),
                        None => false,
                    };
                    if !bound {
                        return Err(ClusterError::UnexpectedStatus {
                            status: 404,
                            body: format!(
                                "aliases [{}] missing from index [{}]",
                                target.alias, target.index
                            ),
                        });
                    }
                }
            }
        }
        aliases.retain(|_, members| !members.is_empty());

        state.aliases = aliases;
        Ok(true)
    }

    async fn alias_indices(&self, alias: &str) -> ClusterResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state
            .aliases
            .get(alias)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }

    async fn alias_exists(&self, alias: &str) -> ClusterResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.aliases.contains_key(alias))
    }

    async fn create_index(
        &self,
        name: &str,
        mapping: &Value,
        alias: Option<&str>,
    ) -> ClusterResult<bool> {
        let mut state = self.state.lock().unwrap();
        if state.indices.contains_key(name) {
            return Err(ClusterError::UnexpectedStatus {
                status: 400,
                body: format!("resource_already_exists_exception: index [{}]", name),
            });
        }

        state.indices.insert(
            name.to_string(),
            MemoryIndex {
                mapping: mapping.clone(),
                docs: HashMap::new(),
            },
        );
        if let Some(alias) = alias {
            state
                .aliases
                .entry(alias.to_string())
                .or_default()
                .insert(name.to_string());
        }
        Ok(true)
    }

    async fn delete_index(&self, name: &str) -> ClusterResult<bool> {
        let mut state = self.state.lock().unwrap();
        if state.indices.remove(name).is_none() {
            return Ok(false);
        }
        for members in state.aliases.values_mut() {
            members.remove(name);
        }
        state.aliases.retain(|_, members| !members.is_empty());
        Ok(true)
    }

    async fn index_exists(&self, name: &str) -> ClusterResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.indices.contains_key(name))
    }

    async fn indices_matching(&self, pattern: &str) -> ClusterResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state
            .indices
            .keys()
            .filter(|name| wildcard_match(pattern, name))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn index_metadata(&self, pattern: &str) -> ClusterResult<Value> {
        let state = self.state.lock().unwrap();
        let mut out = serde_json::Map::new();
        for (name, index) in &state.indices {
            if wildcard_match(pattern, name) {
                out.insert(name.clone(), json!({ "mappings": index.mapping }));
            }
        }
        Ok(Value::Object(out))
    }

    async fn refresh(&self, _name: &str) -> ClusterResult<()> {
        Ok(())
    }

    async fn count(&self, name: &str) -> ClusterResult<u64> {
        let state = self.state.lock().unwrap();
        let total: usize = Self::resolve(&state, name)
            .iter()
            .filter_map(|n| state.indices.get(n))
            .map(|i| i.docs.len())
            .sum();
        Ok(total as u64)
    }

    async fn health(
        &self,
        index: Option<&str>,
        _wait_for: Option<HealthStatus>,
        _timeout: Option<Duration>,
    ) -> ClusterResult<ClusterHealth> {
        let red = self.red_indices.lock().unwrap();
        let status = match index {
            Some(name) if red.contains(name) => HealthStatus::Red,
            _ => HealthStatus::Green,
        };
        Ok(ClusterHealth {
            status,
            cluster_name: Some("memory".to_string()),
            timed_out: false,
        })
    }

    async fn index_stats(&self, name: &str) -> ClusterResult<IndexStats> {
        if self.stats_failures.lock().unwrap().contains(name) {
            return Err(ClusterError::Malformed(format!(
                "stats unavailable for [{}]",
                name
            )));
        }

        let state = self.state.lock().unwrap();
        let index = state.indices.get(name).ok_or_else(|| {
            ClusterError::UnexpectedStatus {
                status: 404,
                body: format!("no such index [{}]", name),
            }
        })?;
        Ok(IndexStats {
            doc_count: index.docs.len() as u64,
            store_size_bytes: 1024,
            indexing_rate: index.docs.len() as u64,
            search_rate: 0,
        })
    }

    async fn search(&self, index: &str, _body: &Value) -> ClusterResult<Value> {
        let state = self.state.lock().unwrap();
        let hits: Vec<Value> = Self::resolve(&state, index)
            .iter()
            .filter_map(|n| state.indices.get(n).map(|i| (n.clone(), i)))
            .flat_map(|(name, i)| {
                i.docs
                    .iter()
                    .map(move |(id, source)| {
                        json!({ "_index": name.as_str(), "_id": id, "_score": 1.0, "_source": source })
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(json!({
            "took": 1,
            "hits": { "total": { "value": hits.len(), "relation": "eq" }, "hits": hits }
        }))
    }

    async fn get_document(&self, index: &str, id: &str) -> ClusterResult<Option<Value>> {
        let state = self.state.lock().unwrap();
        for name in Self::resolve(&state, index) {
            if let Some(doc) = state.indices.get(&name).and_then(|i| i.docs.get(id)) {
                return Ok(Some(doc.clone()));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("products_*", "products_blue_20240101000000"));
        assert!(wildcard_match(
            "products_blue_*",
            "products_blue_20240101000000"
        ));
        assert!(!wildcard_match("products_green_*", "products_blue_x"));
        assert!(wildcard_match("products", "products"));
        assert!(!wildcard_match("products", "products_blue"));
    }

    #[tokio::test]
    async fn test_alias_update_is_atomic() {
        let cluster = MemoryCluster::new();
        cluster
            .create_index("a_blue_20240101000000", &json!({}), None)
            .await
            .unwrap();

        // Remove refers to an unbound pair: whole list must fail, nothing applied
        let result = cluster
            .update_aliases(&[
                AliasAction::remove("a_blue_20240101000000", "a"),
                AliasAction::add("a_blue_20240101000000", "a"),
            ])
            .await;
        assert!(result.is_err());
        assert!(cluster.alias_indices("a").await.unwrap().is_empty());

        // Plain add works
        cluster
            .update_aliases(&[AliasAction::add("a_blue_20240101000000", "a")])
            .await
            .unwrap();
        assert_eq!(
            cluster.alias_indices("a").await.unwrap(),
            vec!["a_blue_20240101000000".to_string()]
        );
    }
}
