//! Spatial index capability over a chunk's valid line polygons.
//!
//! The pipeline talks to a [`SpatialBackend`] chosen once at configuration time. The R-tree
//! backend builds a real index; the disabled backend reports itself unavailable so every chunk
//! short-circuits to the skipped sentinel.

use geo::Polygon;
use rstar::{AABB, RTree, primitives::GeomWithData, primitives::Rectangle};
use std::str::FromStr;
use std::sync::Arc;

use super::types::{BoundingBox, LineItem};

/// A line whose polygon passed validation, remembered with its position in the chunk.
#[derive(Debug, Clone)]
pub struct SpatialElement<'a> {
    /// Position of the source line within the chunk's `lines`.
    pub ordinal: usize,
    /// Source line.
    pub line: &'a LineItem,
    /// Validated polygon.
    pub polygon: Polygon<f64>,
    /// Bounds of `polygon`.
    pub bbox: BoundingBox,
}

/// Region query over indexed elements.
///
/// Results are slots into the element slice the index was built from. They over-approximate the
/// region (envelope pruning only); callers re-filter with true polygon distance.
pub trait SpatialIndex {
    /// Slots of elements whose bounds intersect `region`, in ascending slot order.
    fn query(&self, region: &BoundingBox) -> Vec<usize>;

    /// Number of indexed elements.
    fn len(&self) -> usize;

    /// True when nothing is indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Factory for per-chunk spatial indexes.
pub trait SpatialBackend: Send + Sync {
    /// Short identifier used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Whether this backend can answer spatial queries at all.
    fn is_available(&self) -> bool;

    /// Build a one-shot index over `elements`.
    fn build_index(&self, elements: &[SpatialElement<'_>]) -> Box<dyn SpatialIndex>;
}

/// Backends selectable through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialBackendKind {
    /// R-tree over polygon envelopes.
    #[default]
    RTree,
    /// No spatial capability; every chunk is skipped.
    Disabled,
}

impl FromStr for SpatialBackendKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rtree" | "r-tree" => Ok(Self::RTree),
            "disabled" | "none" | "noop" => Ok(Self::Disabled),
            _ => Err(()),
        }
    }
}

/// Resolve the backend for a configured kind.
pub fn spatial_backend(kind: SpatialBackendKind) -> Arc<dyn SpatialBackend> {
    match kind {
        SpatialBackendKind::RTree => Arc::new(RTreeBackend),
        SpatialBackendKind::Disabled => Arc::new(DisabledBackend),
    }
}

type Envelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Geometric backend built on `rstar`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RTreeBackend;

impl SpatialBackend for RTreeBackend {
    fn name(&self) -> &'static str {
        "rtree"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn build_index(&self, elements: &[SpatialElement<'_>]) -> Box<dyn SpatialIndex> {
        Box::new(RTreeIndex::new(elements))
    }
}

/// R-tree over element envelopes.
pub struct RTreeIndex {
    tree: RTree<Envelope>,
}

impl RTreeIndex {
    /// Bulk-load the tree from element bounds.
    pub fn new(elements: &[SpatialElement<'_>]) -> Self {
        let entries = elements
            .iter()
            .enumerate()
            .map(|(slot, element)| {
                let BoundingBox {
                    min_x,
                    min_y,
                    max_x,
                    max_y,
                } = element.bbox;
                GeomWithData::new(
                    Rectangle::from_corners([min_x, min_y], [max_x, max_y]),
                    slot,
                )
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }
}

impl SpatialIndex for RTreeIndex {
    fn query(&self, region: &BoundingBox) -> Vec<usize> {
        let envelope =
            AABB::from_corners([region.min_x, region.min_y], [region.max_x, region.max_y]);
        let mut slots: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect();
        slots.sort_unstable();
        slots
    }

    fn len(&self) -> usize {
        self.tree.size()
    }
}

/// Backend used when spatial analysis is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

impl SpatialBackend for DisabledBackend {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn build_index(&self, _elements: &[SpatialElement<'_>]) -> Box<dyn SpatialIndex> {
        Box::new(EmptyIndex)
    }
}

/// Index that never returns candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyIndex;

impl SpatialIndex for EmptyIndex {
    fn query(&self, _region: &BoundingBox) -> Vec<usize> {
        Vec::new()
    }

    fn len(&self) -> usize {
        0
    }
}
