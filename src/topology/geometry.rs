//! Polygon construction and validation for line geometry.
//!
//! A polygon is valid when its ring has at least three distinct vertices, encloses a non-zero
//! area, and its boundary never crosses or touches itself away from shared edge endpoints.
//! Rejections are reported through [`GeometryError`] for logging only; the pipeline treats every
//! rejection as a per-line skip.

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, BoundingRect, Coord, Line, LineString, Polygon};
use thiserror::Error;

use super::types::BoundingBox;

/// Minimum number of flat values (three points) a polygon needs.
pub const MIN_COORDINATE_VALUES: usize = 6;

/// Reasons a coordinate sequence does not yield a valid polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// Fewer than three points were supplied.
    #[error("expected at least 6 coordinate values, got {0}")]
    TooFewCoordinates(usize),
    /// The flat sequence cannot be split into x, y pairs.
    #[error("coordinate sequence has odd length {0}")]
    OddCoordinateCount(usize),
    /// A coordinate was NaN or infinite.
    #[error("coordinate sequence contains a non-finite value")]
    NonFiniteCoordinate,
    /// The ring collapses to fewer than three distinct vertices.
    #[error("polygon has {0} distinct vertices, need at least 3")]
    TooFewDistinctVertices(usize),
    /// The ring encloses no area.
    #[error("polygon encloses zero area")]
    ZeroArea,
    /// Two ring edges cross, touch, or overlap.
    #[error("polygon boundary intersects itself")]
    SelfIntersecting,
}

/// Build a valid polygon from a flat `x0, y0, x1, y1, ...` sequence, or `None`.
pub fn build_polygon(coordinates: &[f64]) -> Option<Polygon<f64>> {
    try_build_polygon(coordinates).ok()
}

/// Build a polygon, reporting why construction was rejected.
pub fn try_build_polygon(coordinates: &[f64]) -> Result<Polygon<f64>, GeometryError> {
    if coordinates.len() < MIN_COORDINATE_VALUES {
        return Err(GeometryError::TooFewCoordinates(coordinates.len()));
    }
    if coordinates.len() % 2 != 0 {
        return Err(GeometryError::OddCoordinateCount(coordinates.len()));
    }
    if coordinates.iter().any(|value| !value.is_finite()) {
        return Err(GeometryError::NonFiniteCoordinate);
    }

    let mut ring: Vec<Coord<f64>> = coordinates
        .chunks_exact(2)
        .map(|pair| Coord {
            x: pair[0],
            y: pair[1],
        })
        .collect();
    ring.dedup();
    // An explicitly closed ring repeats its first vertex at the end.
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    let distinct = distinct_vertex_count(&ring);
    if distinct < 3 {
        return Err(GeometryError::TooFewDistinctVertices(distinct));
    }
    if has_self_intersection(&ring) {
        return Err(GeometryError::SelfIntersecting);
    }

    let polygon = Polygon::new(LineString::from(ring), vec![]);
    if polygon.unsigned_area() <= 0.0 {
        return Err(GeometryError::ZeroArea);
    }
    Ok(polygon)
}

/// Axis-aligned bounds of a polygon's exterior.
pub fn bounding_box(polygon: &Polygon<f64>) -> Option<BoundingBox> {
    polygon.bounding_rect().map(|rect| BoundingBox {
        min_x: rect.min().x,
        min_y: rect.min().y,
        max_x: rect.max().x,
        max_y: rect.max().y,
    })
}

fn distinct_vertex_count(ring: &[Coord<f64>]) -> usize {
    ring.iter()
        .enumerate()
        .filter(|(position, coord)| !ring[..*position].contains(coord))
        .count()
}

/// Check every pair of ring edges. Adjacent edges may only share their common endpoint;
/// non-adjacent edges may not meet at all.
fn has_self_intersection(ring: &[Coord<f64>]) -> bool {
    let count = ring.len();
    let edges: Vec<Line<f64>> = (0..count)
        .map(|i| Line::new(ring[i], ring[(i + 1) % count]))
        .collect();

    for i in 0..count {
        for j in (i + 1)..count {
            let adjacent = j == i + 1 || (i == 0 && j == count - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => return true,
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(LineIntersection::SinglePoint { .. }) => return true,
            }
        }
    }
    false
}
