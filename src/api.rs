//! HTTP surface for drawing topology enrichment.
//!
//! Routes:
//!
//! - `POST /topology` – Enrich one analyzed page chunk. Returns the chunk with its `topology`
//!   attached plus the rendered text block (`{ "chunk": ..., "text": ... }`).
//! - `POST /topology/batch` – Enrich `{ "chunks": [...] }` concurrently; results keep input order.
//! - `GET /metrics` – Observe enrichment counters.
//! - `GET /commands` – Route catalog with example request bodies.
//!
//! Enrichment never fails on bad page content; only worker failures surface as `500`.

use crate::metrics::MetricsSnapshot;
use crate::topology::{Chunk, EnrichedChunk, EnrichmentError, TopologyApi};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the enrichment API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: TopologyApi + 'static,
{
    Router::new()
        .route("/topology", post(enrich_chunk::<S>))
        .route("/topology/batch", post(enrich_batch::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Enrich a single chunk.
async fn enrich_chunk<S>(
    State(service): State<Arc<S>>,
    Json(chunk): Json<Chunk>,
) -> Result<Json<EnrichedChunk>, AppError>
where
    S: TopologyApi,
{
    let lines = chunk.lines.as_ref().map_or(0, Vec::len);
    let enriched = service.enrich_chunk(chunk).await?;
    tracing::info!(
        lines,
        skipped = enriched
            .chunk
            .topology
            .as_ref()
            .is_some_and(|topology| topology.is_skipped()),
        "Topology request completed"
    );
    Ok(Json(enriched))
}

/// Request body for `POST /topology/batch`.
#[derive(Deserialize)]
struct BatchRequest {
    /// Chunks to enrich independently.
    chunks: Vec<Chunk>,
}

/// Response body for `POST /topology/batch`.
#[derive(Serialize)]
struct BatchResponse {
    results: Vec<EnrichedChunk>,
}

/// Enrich several chunks concurrently.
async fn enrich_batch<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, AppError>
where
    S: TopologyApi,
{
    let count = request.chunks.len();
    let results = service.enrich_chunks(request.chunks).await?;
    tracing::info!(chunks = count, "Topology batch completed");
    Ok(Json(BatchResponse { results }))
}

/// Return the enrichment counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: TopologyApi,
{
    Json(service.metrics_snapshot())
}

/// One catalog entry.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Body of `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// List the routes with a sample request body for each `POST`.
async fn get_commands() -> Json<CommandsResponse> {
    let example_chunk = json!({
        "lines": [
            { "text": "V-101", "polygon": [0, 0, 10, 0, 10, 10, 0, 10] },
            { "text": "SEE DWG. P-002", "polygon": [20, 0, 30, 0, 30, 10, 20, 10] }
        ]
    });
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "topology",
                method: "POST",
                path: "/topology",
                description: "Detect tags, their nearest labels, and cross-sheet connectors in one page chunk. Response returns { \"chunk\": chunk with topology, \"text\": string }.",
                request_example: Some(example_chunk.clone()),
            },
            CommandDescriptor {
                name: "topology_batch",
                method: "POST",
                path: "/topology/batch",
                description: "Enrich several page chunks concurrently. Response returns { \"results\": [...] } in request order.",
                request_example: Some(json!({ "chunks": [example_chunk] })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return enrichment counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(EnrichmentError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Topology request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

impl From<EnrichmentError> for AppError {
    fn from(inner: EnrichmentError) -> Self {
        Self(inner)
    }
}
