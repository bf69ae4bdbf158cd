//! Chunk-level orchestration: geometry, index, detectors, and neighbor ranking.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::{
    config::Config,
    metrics::{MetricsSnapshot, TopologyMetrics},
    topology::{
        connectors::detect_connector,
        format::format_to_text,
        geometry::{bounding_box, try_build_polygon},
        index::{SpatialBackend, SpatialElement, spatial_backend},
        neighbors::{NeighborOptions, resolve_neighbors},
        tags::{detect_tag, detect_tag_outside},
        types::{Chunk, Connector, LineItem, SkipReason, Tag, Topology, TopologyReport},
    },
};

/// Per-analyzer tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopologySettings {
    /// Neighbor query and ranking options.
    pub neighbors: NeighborOptions,
    /// Lines beyond this position are ignored.
    pub max_lines: usize,
}

impl Default for TopologySettings {
    fn default() -> Self {
        Self {
            neighbors: NeighborOptions::default(),
            max_lines: 5000,
        }
    }
}

/// Stateless per-chunk topology analysis bound to one spatial backend.
///
/// Chunks share nothing but the metrics counters, so one analyzer can serve any number of
/// threads at once. Re-analyzing a chunk yields the same topology.
pub struct TopologyAnalyzer {
    backend: Arc<dyn SpatialBackend>,
    settings: TopologySettings,
    metrics: Arc<TopologyMetrics>,
}

impl TopologyAnalyzer {
    /// Build an analyzer around an explicit backend.
    pub fn new(backend: Arc<dyn SpatialBackend>, settings: TopologySettings) -> Self {
        Self {
            backend,
            settings,
            metrics: Arc::new(TopologyMetrics::new()),
        }
    }

    /// Build an analyzer from process configuration, binding the spatial backend once.
    pub fn from_config(config: &Config) -> Self {
        let backend = spatial_backend(config.spatial_backend);
        if backend.is_available() {
            tracing::info!(backend = backend.name(), "Spatial backend ready");
        } else {
            tracing::warn!(
                backend = backend.name(),
                "Spatial backend unavailable; topology enrichment will be skipped"
            );
        }
        Self::new(backend, config.topology_settings())
    }

    /// Settings in effect.
    pub fn settings(&self) -> &TopologySettings {
        &self.settings
    }

    /// Analyze `chunk` and attach the result as `chunk.topology`, replacing any previous value.
    pub fn enrich_chunk<'c>(&self, chunk: &'c mut Chunk) -> &'c Topology {
        let topology = self.analyze_lines(chunk.lines.as_deref());
        chunk.topology.insert(topology)
    }

    /// Analyze a chunk's lines. Never fails: unusable input yields the skipped sentinel.
    pub fn analyze_lines(&self, lines: Option<&[LineItem]>) -> Topology {
        if !self.backend.is_available() {
            return self.skip(SkipReason::CapabilityUnavailable, 0);
        }
        let lines = match lines {
            Some(lines) if !lines.is_empty() => lines,
            _ => return self.skip(SkipReason::EmptyInput, 0),
        };

        let considered = if lines.len() > self.settings.max_lines {
            tracing::warn!(
                lines = lines.len(),
                max_lines = self.settings.max_lines,
                "Chunk exceeds line ceiling; ignoring trailing lines"
            );
            &lines[..self.settings.max_lines]
        } else {
            lines
        };

        let elements = build_elements(considered);
        let invalid = (considered.len() - elements.len()) as u64;
        if elements.is_empty() {
            return self.skip(SkipReason::NoValidGeometry, invalid);
        }

        let index = self.backend.build_index(&elements);
        let mut report = TopologyReport::default();
        for (slot, element) in elements.iter().enumerate() {
            let text = element.line.text.as_str();
            let connector = detect_connector(text);
            // A connector's drawing number is not an equipment tag.
            let tag = match &connector {
                Some(found) => detect_tag_outside(text, &found.span),
                None => detect_tag(text),
            };
            if let Some(tag) = tag {
                report.tags.push(Tag {
                    tag: tag.to_string(),
                    bbox: element.bbox,
                    neighbors: resolve_neighbors(
                        slot,
                        &elements,
                        index.as_ref(),
                        &self.settings.neighbors,
                    ),
                });
            }
            if let Some(found) = connector {
                report.connectors.push(Connector {
                    kind: found.kind,
                    reference: found.reference.to_string(),
                    text: text.to_string(),
                    bbox: element.bbox,
                });
            }
        }

        self.metrics.record_analyzed(
            report.tags.len() as u64,
            report.connectors.len() as u64,
            invalid,
        );
        tracing::debug!(
            lines = considered.len(),
            indexed = index.len(),
            invalid,
            tags = report.tags.len(),
            connectors = report.connectors.len(),
            "Chunk topology analyzed"
        );
        Topology::Analyzed(report)
    }

    /// Retrieve the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn skip(&self, reason: SkipReason, invalid: u64) -> Topology {
        self.metrics.record_skipped(invalid);
        tracing::info!(%reason, "Skipping topology analysis");
        Topology::skipped(reason)
    }
}

fn build_elements(lines: &[LineItem]) -> Vec<SpatialElement<'_>> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(ordinal, line)| {
            let Some(coordinates) = line.coordinates() else {
                tracing::debug!(ordinal, "Skipping line with malformed polygon");
                return None;
            };
            let polygon = match try_build_polygon(&coordinates) {
                Ok(polygon) => polygon,
                Err(error) => {
                    tracing::debug!(ordinal, %error, "Skipping line with invalid polygon");
                    return None;
                }
            };
            let bbox = bounding_box(&polygon)?;
            Some(SpatialElement {
                ordinal,
                line,
                polygon,
                bbox,
            })
        })
        .collect()
}

/// Enriched chunk paired with its rendered topology text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedChunk {
    /// Chunk with `topology` attached.
    pub chunk: Chunk,
    /// Output of [`format_to_text`] for the attached topology.
    pub text: String,
}

impl EnrichedChunk {
    fn from_chunk(chunk: Chunk) -> Self {
        let text = chunk
            .topology
            .as_ref()
            .map(format_to_text)
            .unwrap_or_default();
        Self { chunk, text }
    }
}

/// Errors raised by the async enrichment facade.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// The blocking worker running the analysis panicked or was cancelled.
    #[error("Topology worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Abstraction over topology enrichment used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait TopologyApi: Send + Sync {
    /// Enrich a single chunk.
    async fn enrich_chunk(&self, chunk: Chunk) -> Result<EnrichedChunk, EnrichmentError>;

    /// Enrich several independent chunks concurrently, preserving input order.
    async fn enrich_chunks(
        &self,
        chunks: Vec<Chunk>,
    ) -> Result<Vec<EnrichedChunk>, EnrichmentError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Runs analyses on Tokio's blocking pool so CPU-bound work stays off the async executor.
///
/// Construct once near process start and share through an `Arc`.
#[derive(Clone)]
pub struct TopologyService {
    analyzer: Arc<TopologyAnalyzer>,
}

impl TopologyService {
    /// Wrap an analyzer.
    pub fn new(analyzer: TopologyAnalyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }

    /// Build the service from process configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(TopologyAnalyzer::from_config(config))
    }

    /// Shared analyzer.
    pub fn analyzer(&self) -> &TopologyAnalyzer {
        &self.analyzer
    }
}

#[async_trait]
impl TopologyApi for TopologyService {
    async fn enrich_chunk(&self, mut chunk: Chunk) -> Result<EnrichedChunk, EnrichmentError> {
        let analyzer = Arc::clone(&self.analyzer);
        let enriched = tokio::task::spawn_blocking(move || {
            analyzer.enrich_chunk(&mut chunk);
            EnrichedChunk::from_chunk(chunk)
        })
        .await?;
        Ok(enriched)
    }

    async fn enrich_chunks(
        &self,
        chunks: Vec<Chunk>,
    ) -> Result<Vec<EnrichedChunk>, EnrichmentError> {
        tracing::info!(chunks = chunks.len(), "Enriching chunk batch");
        let workers = chunks.into_iter().map(|mut chunk| {
            let analyzer = Arc::clone(&self.analyzer);
            tokio::task::spawn_blocking(move || {
                analyzer.enrich_chunk(&mut chunk);
                EnrichedChunk::from_chunk(chunk)
            })
        });
        Ok(futures_util::future::try_join_all(workers).await?)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.analyzer.metrics_snapshot()
    }
}
