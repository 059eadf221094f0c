// Read-side endpoints - text search, criteria search, document fetch
//
// These are thin query builders over the cluster's search DSL. They always
// query through the alias, so results follow an atomic swap on the very next
// request.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::cluster::ClusterOps;
use crate::error::ControlError;

use super::{ApiError, AppState};

/// Upper bound on page size for both search endpoints.
const MAX_SEARCH_LIMIT: usize = 100;

fn default_limit() -> usize {
    10
}

/// Fields queried when the caller does not narrow them.
const DEFAULT_TEXT_FIELDS: [&str; 6] = [
    "name^3",
    "sku^2",
    "brand^2",
    "description",
    "category",
    "tags",
];

// ─────────────────────────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────────────────────────

/// Body for POST /search/text
#[derive(Debug, Deserialize)]
pub struct TextSearchRequest {
    pub query: String,
    pub alias: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub highlight: bool,
}

/// Body for POST /search/criteria
#[derive(Debug, Deserialize)]
pub struct CriteriaSearchRequest {
    pub criteria: Map<String, Value>,
    pub alias: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    pub sort: Option<Value>,
    pub aggs: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub source: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Value>,
}

/// Query parameters for GET /:product_id
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub alias: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Query construction (pure, unit-tested)
// ─────────────────────────────────────────────────────────────────────────────

fn build_text_query(request: &TextSearchRequest) -> Value {
    let fields: Vec<String> = match &request.fields {
        Some(fields) if !fields.is_empty() => fields.clone(),
        _ => DEFAULT_TEXT_FIELDS.iter().map(|f| f.to_string()).collect(),
    };

    let mut body = json!({
        "from": request.offset,
        "size": request.limit,
        "query": {
            "multi_match": {
                "query": request.query,
                "fields": fields,
                "type": "best_fields",
                "fuzziness": "AUTO"
            }
        }
    });

    if request.highlight {
        body["highlight"] = json!({ "fields": { "*": {} } });
    }
    body
}

/// Translate one criteria entry into a filter clause.
///
/// Arrays become `terms`, objects with range operators become `range`,
/// scalars become `term`.
fn criterion_clause(field: &str, value: &Value) -> Value {
    match value {
        Value::Array(_) => json!({ "terms": { field: value } }),
        Value::Object(map)
            if map
                .keys()
                .any(|k| matches!(k.as_str(), "gte" | "lte" | "gt" | "lt")) =>
        {
            json!({ "range": { field: value } })
        }
        _ => json!({ "term": { field: value } }),
    }
}

fn build_criteria_query(request: &CriteriaSearchRequest) -> Value {
    let filters: Vec<Value> = request
        .criteria
        .iter()
        .map(|(field, value)| criterion_clause(field, value))
        .collect();

    let mut body = json!({
        "from": request.offset,
        "size": request.limit,
        "query": { "bool": { "filter": filters } }
    });

    if let Some(sort) = &request.sort {
        body["sort"] = sort.clone();
    }
    if let Some(aggs) = &request.aggs {
        body["aggs"] = aggs.clone();
    }
    body
}

fn check_limit(limit: usize) -> Result<(), ControlError> {
    if limit == 0 || limit > MAX_SEARCH_LIMIT {
        return Err(ControlError::invalid(format!(
            "limit must be between 1 and {}",
            MAX_SEARCH_LIMIT
        )));
    }
    Ok(())
}

fn into_response(raw: Value) -> SearchResponse {
    let total = raw["hits"]["total"]["value"].as_u64().unwrap_or(0);
    let hits = raw["hits"]["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .map(|hit| SearchHit {
                    id: hit["_id"].as_str().unwrap_or_default().to_string(),
                    score: hit["_score"].as_f64(),
                    source: hit["_source"].clone(),
                    highlight: hit.get("highlight").cloned(),
                })
                .collect()
        })
        .unwrap_or_default();

    SearchResponse {
        total,
        hits,
        aggregations: raw.get("aggregations").cloned(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /search/text - Full-text product search
pub async fn search_text(
    State(state): State<AppState>,
    Json(request): Json<TextSearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    check_limit(request.limit)?;
    if request.query.trim().is_empty() {
        return Err(ControlError::invalid("query must not be empty").into());
    }

    let alias = request
        .alias
        .clone()
        .unwrap_or_else(|| state.config.default_alias.clone());
    let body = build_text_query(&request);

    let raw = state
        .cluster
        .search(&alias, &body)
        .await
        .map_err(ControlError::from)?;
    Ok(Json(into_response(raw)))
}

/// POST /search/criteria - Structured field filtering with optional aggs
pub async fn search_criteria(
    State(state): State<AppState>,
    Json(request): Json<CriteriaSearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    check_limit(request.limit)?;
    if request.criteria.is_empty() {
        return Err(ControlError::invalid("criteria must not be empty").into());
    }

    let alias = request
        .alias
        .clone()
        .unwrap_or_else(|| state.config.default_alias.clone());
    let body = build_criteria_query(&request);

    let raw = state
        .cluster
        .search(&alias, &body)
        .await
        .map_err(ControlError::from)?;
    Ok(Json(into_response(raw)))
}

/// GET /:product_id - Fetch one document through the alias
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Value>, ApiError> {
    let alias = query
        .alias
        .unwrap_or_else(|| state.config.default_alias.clone());

    let doc = state
        .cluster
        .get_document(&alias, &product_id)
        .await
        .map_err(ControlError::from)?
        .ok_or_else(|| {
            ControlError::not_found(format!("product '{}' not found", product_id))
        })?;
    Ok(Json(doc))
}
