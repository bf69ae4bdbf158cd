//! Drawing topology pipeline: geometry, spatial index, detectors, neighbor ranking, formatting.

pub mod connectors;
pub mod format;
pub mod geometry;
pub mod index;
pub mod neighbors;
mod service;
pub mod tags;
pub mod types;

pub use format::format_to_text;
pub use index::{
    DisabledBackend, RTreeBackend, SpatialBackend, SpatialBackendKind, SpatialElement,
    SpatialIndex, spatial_backend,
};
pub use neighbors::NeighborOptions;
pub use service::{
    EnrichedChunk, EnrichmentError, TopologyAnalyzer, TopologyApi, TopologyService,
    TopologySettings,
};
pub use types::{
    BoundingBox, Chunk, Connector, ConnectorKind, LineItem, Neighbor, SkipReason, Tag, Topology,
    TopologyReport,
};
