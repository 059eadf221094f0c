// Chunked bulk ingest
//
// Shared by the deployment coordinator (whole-corpus deploys) and the session
// manager (streaming batches). Documents go to the cluster in fixed-size
// chunks with a refresh per chunk; per-item failures are collected and
// reported, never raised - only transport-level failures abort an ingest.

use serde_json::Value;

use crate::cluster::{BulkOp, ClusterOps, SharedCluster};
use crate::error::ControlResult;

/// Documents per bulk chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// One failed document from a bulk ingest.
#[derive(Debug, Clone)]
pub struct IngestError {
    pub document_id: String,
    pub kind: String,
    pub reason: String,
    pub status: u16,
}

/// Accumulated result of a chunked ingest.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub successful: u64,
    pub failed: u64,
    pub errors: Vec<IngestError>,
}

/// Resolve the bulk document id for each document.
///
/// Precedence: an `id` field (string or number), then `recordId` rendered to
/// a string, then the caller's positional fallback.
pub fn assign_doc_ids<F>(documents: &[Value], fallback: F) -> Vec<(String, Value)>
where
    F: Fn(usize) -> String,
{
    documents
        .iter()
        .enumerate()
        .map(|(position, doc)| {
            let id = field_as_id(doc, "id")
                .or_else(|| field_as_id(doc, "recordId"))
                .unwrap_or_else(|| fallback(position));
            (id, doc.clone())
        })
        .collect()
}

fn field_as_id(doc: &Value, field: &str) -> Option<String> {
    match doc.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// First id that appears more than once, if any.
pub fn find_duplicate_id(docs: &[(String, Value)]) -> Option<&str> {
    let mut seen = std::collections::HashSet::with_capacity(docs.len());
    docs.iter()
        .map(|(id, _)| id.as_str())
        .find(|id| !seen.insert(*id))
}

/// Index documents into `index` in chunks, refreshing after each chunk.
///
/// Per-item failures are recorded in the outcome and ingestion continues with
/// the next chunk.
pub async fn bulk_index(
    cluster: &SharedCluster,
    index: &str,
    docs: &[(String, Value)],
    chunk_size: usize,
) -> ControlResult<IngestOutcome> {
    let mut outcome = IngestOutcome::default();

    for chunk in docs.chunks(chunk_size.max(1)) {
        let ops: Vec<BulkOp> = chunk
            .iter()
            .map(|(id, source)| BulkOp::Index {
                index: index.to_string(),
                id: id.clone(),
                source: source.clone(),
            })
            .collect();

        let summary = cluster.bulk(&ops, true).await?;

        for item in &summary.items {
            if item.is_success() {
                outcome.successful += 1;
            } else {
                outcome.failed += 1;
                let (kind, reason) = item
                    .error
                    .as_ref()
                    .map(|e| (e.kind.clone(), e.reason.clone()))
                    .unwrap_or_else(|| ("unknown".to_string(), "unspecified failure".to_string()));
                outcome.errors.push(IngestError {
                    document_id: item.id.clone(),
                    kind,
                    reason,
                    status: item.status,
                });
            }
        }

        if summary.any_errors {
            tracing::warn!(
                index = index,
                chunk_failed = summary.failed(),
                "bulk chunk reported per-item failures; continuing"
            );
        }
    }

    Ok(outcome)
}
