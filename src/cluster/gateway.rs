// ElasticGateway - reqwest implementation of ClusterOps
//
// Speaks the Elasticsearch REST dialect: NDJSON `_bulk`, atomic `_aliases`
// action lists, HEAD-based existence checks, `_cluster/health` with
// wait_for_status. Each method maps one REST call; interpretation of results
// (what counts as ready, which color is staging, ...) lives upstream.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::types::{
    AliasAction, BulkItemError, BulkItemOutcome, BulkOp, BulkSummary, ClusterHealth, HealthStatus,
    IndexStats,
};
use super::{ClusterError, ClusterOps, ClusterResult};

/// Concrete gateway over an Elasticsearch-compatible cluster.
pub struct ElasticGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ElasticGateway {
    /// Build the gateway with its own pooled HTTP client.
    ///
    /// The 5 minute request timeout covers the worst case the control plane
    /// issues: a 100-document bulk chunk with refresh against a busy cluster.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> ClusterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach authentication if configured.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, self.url(path));
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("ApiKey {}", key));
        }
        req
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, path)
    }

    fn head(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::HEAD, path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::POST, path)
    }

    fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::PUT, path)
    }

    fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::DELETE, path)
    }

    /// Convert an unexpected response into a ClusterError, consuming the body
    /// for the message.
    async fn unexpected(resp: reqwest::Response) -> ClusterError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        ClusterError::UnexpectedStatus { status, body }
    }

    /// Parse an `{"acknowledged": bool}` response.
    async fn acknowledged(resp: reqwest::Response, operation: &str) -> ClusterResult<bool> {
        #[derive(Deserialize)]
        struct Ack {
            #[serde(default)]
            acknowledged: bool,
        }

        if !resp.status().is_success() {
            return Err(Self::unexpected(resp).await);
        }

        let ack: Ack = resp.json().await?;
        if !ack.acknowledged {
            return Err(ClusterError::NotAcknowledged {
                operation: operation.to_string(),
            });
        }
        Ok(true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw bulk response shape
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawBulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<BTreeMap<String, RawBulkItem>>,
}

#[derive(Deserialize)]
struct RawBulkItem {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    error: Option<BulkItemError>,
}

#[async_trait]
impl ClusterOps for ElasticGateway {
    async fn bulk(&self, ops: &[BulkOp], refresh: bool) -> ClusterResult<BulkSummary> {
        // NDJSON body: one action header line, then one source line per op
        let mut body = String::new();
        for op in ops {
            match op {
                BulkOp::Index { index, id, source } => {
                    let header = json!({ "index": { "_index": index, "_id": id } });
                    body.push_str(&header.to_string());
                    body.push('\n');
                    body.push_str(&source.to_string());
                    body.push('\n');
                }
            }
        }

        let path = if refresh { "_bulk?refresh=true" } else { "_bulk" };
        let resp = self
            .post(path)
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::unexpected(resp).await);
        }

        let raw: RawBulkResponse = resp.json().await?;
        let mut items = Vec::with_capacity(raw.items.len());
        for entry in raw.items {
            // Each item is a single-key map: op kind → outcome
            let (op, item) = entry
                .into_iter()
                .next()
                .ok_or_else(|| ClusterError::Malformed("empty bulk item".to_string()))?;
            items.push(BulkItemOutcome {
                op,
                id: item.id.unwrap_or_default(),
                status: item.status,
                error: item.error,
            });
        }

        Ok(BulkSummary {
            any_errors: raw.errors,
            items,
        })
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> ClusterResult<bool> {
        let resp = self
            .post("_aliases")
            .json(&json!({ "actions": actions }))
            .send()
            .await?;
        Self::acknowledged(resp, "alias update").await
    }

    async fn alias_indices(&self, alias: &str) -> ClusterResult<Vec<String>> {
        let resp = self.get(&format!("_alias/{}", alias)).send().await?;

        // Absent alias is an empty binding, not an error
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(Self::unexpected(resp).await);
        }

        let body: Value = resp.json().await?;
        let names = body
            .as_object()
            .ok_or_else(|| ClusterError::Malformed("alias response is not an object".to_string()))?
            .keys()
            .cloned()
            .collect();
        Ok(names)
    }

    async fn alias_exists(&self, alias: &str) -> ClusterResult<bool> {
        let resp = self.head(&format!("_alias/{}", alias)).send().await?;
        Ok(resp.status().is_success())
    }

    async fn create_index(
        &self,
        name: &str,
        mapping: &Value,
        alias: Option<&str>,
    ) -> ClusterResult<bool> {
        let mut body = json!({ "mappings": mapping });
        if let Some(alias) = alias {
            body["aliases"] = json!({ alias: {} });
        }

        let resp = self.put(name).json(&body).send().await?;
        Self::acknowledged(resp, "index create").await
    }

    async fn delete_index(&self, name: &str) -> ClusterResult<bool> {
        let resp = self.delete(name).send().await?;

        // Already gone counts as nothing-to-delete, not failure
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::acknowledged(resp, "index delete").await
    }

    async fn index_exists(&self, name: &str) -> ClusterResult<bool> {
        let resp = self.head(name).send().await?;
        Ok(resp.status().is_success())
    }

    async fn indices_matching(&self, pattern: &str) -> ClusterResult<Vec<String>> {
        let metadata = self.index_metadata(pattern).await?;
        let names = metadata
            .as_object()
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default();
        Ok(names)
    }

    async fn index_metadata(&self, pattern: &str) -> ClusterResult<Value> {
        let resp = self
            .get(&format!(
                "{}?ignore_unavailable=true&allow_no_indices=true",
                pattern
            ))
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(json!({}));
        }
        if !resp.status().is_success() {
            return Err(Self::unexpected(resp).await);
        }

        Ok(resp.json().await?)
    }

    async fn refresh(&self, name: &str) -> ClusterResult<()> {
        let resp = self.post(&format!("{}/_refresh", name)).send().await?;
        if !resp.status().is_success() {
            return Err(Self::unexpected(resp).await);
        }
        Ok(())
    }

    async fn count(&self, name: &str) -> ClusterResult<u64> {
        #[derive(Deserialize)]
        struct CountResponse {
            count: u64,
        }

        let resp = self.get(&format!("{}/_count", name)).send().await?;
        if !resp.status().is_success() {
            return Err(Self::unexpected(resp).await);
        }

        let body: CountResponse = resp.json().await?;
        Ok(body.count)
    }

    async fn health(
        &self,
        index: Option<&str>,
        wait_for: Option<HealthStatus>,
        timeout: Option<Duration>,
    ) -> ClusterResult<ClusterHealth> {
        let mut path = match index {
            Some(index) => format!("_cluster/health/{}", index),
            None => "_cluster/health".to_string(),
        };

        let mut params = Vec::new();
        if let Some(status) = wait_for {
            params.push(format!("wait_for_status={}", status));
        }
        if let Some(timeout) = timeout {
            params.push(format!("timeout={}s", timeout.as_secs()));
        }
        if !params.is_empty() {
            path.push('?');
            path.push_str(&params.join("&"));
        }

        let resp = self.get(&path).send().await?;

        // A wait_for_status that gives up answers 408 with a normal health
        // body (timed_out=true); still a readable health report.
        let status = resp.status();
        if !status.is_success() && status != reqwest::StatusCode::REQUEST_TIMEOUT {
            return Err(Self::unexpected(resp).await);
        }

        Ok(resp.json().await?)
    }

    async fn index_stats(&self, name: &str) -> ClusterResult<IndexStats> {
        let resp = self.get(&format!("{}/_stats", name)).send().await?;
        if !resp.status().is_success() {
            return Err(Self::unexpected(resp).await);
        }

        let body: Value = resp.json().await?;
        let primaries = &body["_all"]["primaries"];

        Ok(IndexStats {
            doc_count: primaries["docs"]["count"].as_u64().unwrap_or(0),
            store_size_bytes: primaries["store"]["size_in_bytes"].as_u64().unwrap_or(0),
            indexing_rate: primaries["indexing"]["index_total"].as_u64().unwrap_or(0),
            search_rate: primaries["search"]["query_total"].as_u64().unwrap_or(0),
        })
    }

    async fn search(&self, index: &str, body: &Value) -> ClusterResult<Value> {
        let resp = self
            .post(&format!("{}/_search", index))
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::unexpected(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn get_document(&self, index: &str, id: &str) -> ClusterResult<Option<Value>> {
        let resp = self.get(&format!("{}/_doc/{}", index, id)).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::unexpected(resp).await);
        }

        let body: Value = resp.json().await?;
        if body["found"].as_bool() == Some(false) {
            return Ok(None);
        }
        Ok(Some(body["_source"].clone()))
    }
}
