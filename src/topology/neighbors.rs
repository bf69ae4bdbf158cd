//! Proximity ranking of elements around a tag.

use geo::EuclideanDistance;

use super::index::{SpatialElement, SpatialIndex};
use super::types::Neighbor;

/// Tuning for neighbor resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborOptions {
    /// Expansion applied to the source bounds before querying the index, in coordinate units.
    pub buffer: f64,
    /// Maximum neighbors kept per tag.
    pub max_neighbors: usize,
    /// Optional tighter cutoff on true distance. Candidates farther than `buffer` are always
    /// dropped; this can only lower that limit.
    pub max_distance: Option<f64>,
}

impl Default for NeighborOptions {
    fn default() -> Self {
        Self {
            buffer: 50.0,
            max_neighbors: 5,
            max_distance: None,
        }
    }
}

impl NeighborOptions {
    /// Largest true distance a neighbor may have.
    pub fn distance_limit(&self) -> f64 {
        self.max_distance
            .map_or(self.buffer, |limit| limit.min(self.buffer))
    }
}

/// Rank the elements closest to `elements[source]`.
///
/// Candidates come from an index query over the buffered source bounds. The source itself is
/// excluded, and candidates whose exact polygon distance exceeds
/// [`NeighborOptions::distance_limit`] are dropped, since a box corner reaches farther than the
/// buffer. The rest are ordered by distance with ties going to the lower ordinal, and at most
/// `max_neighbors` are kept. Distances are rounded to two decimals after
/// ranking.
pub fn resolve_neighbors(
    source: usize,
    elements: &[SpatialElement<'_>],
    index: &dyn SpatialIndex,
    options: &NeighborOptions,
) -> Vec<Neighbor> {
    let Some(origin) = elements.get(source) else {
        return Vec::new();
    };
    let region = origin.bbox.expand(options.buffer);
    let limit = options.distance_limit();

    let mut ranked: Vec<(f64, &SpatialElement<'_>)> = index
        .query(&region)
        .into_iter()
        .filter(|&slot| slot != source)
        .filter_map(|slot| elements.get(slot))
        .map(|candidate| {
            (
                origin.polygon.euclidean_distance(&candidate.polygon),
                candidate,
            )
        })
        .filter(|(distance, _)| *distance <= limit)
        .collect();

    ranked.sort_by(|(left_distance, left), (right_distance, right)| {
        left_distance
            .total_cmp(right_distance)
            .then_with(|| left.ordinal.cmp(&right.ordinal))
    });
    ranked.truncate(options.max_neighbors);

    ranked
        .into_iter()
        .map(|(distance, candidate)| Neighbor {
            text: candidate.line.text.clone(),
            distance: round_distance(distance),
        })
        .collect()
}

fn round_distance(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::geometry::{bounding_box, build_polygon};
    use crate::topology::index::RTreeIndex;
    use crate::topology::types::LineItem;

    fn square(x: f64, y: f64, size: f64) -> Vec<f64> {
        vec![x, y, x + size, y, x + size, y + size, x, y + size]
    }

    fn elements(lines: &[LineItem]) -> Vec<SpatialElement<'_>> {
        lines
            .iter()
            .enumerate()
            .filter_map(|(ordinal, line)| {
                let polygon = build_polygon(&line.coordinates()?)?;
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

    #[test]
    fn ranks_by_distance_and_excludes_self() {
        let lines = vec![
            LineItem::new("V-101", square(0.0, 0.0, 10.0)),
            LineItem::new("far label", square(40.0, 0.0, 10.0)),
            LineItem::new("near label", square(12.0, 0.0, 10.0)),
        ];
        let elements = elements(&lines);
        let index = RTreeIndex::new(&elements);

        let neighbors = resolve_neighbors(0, &elements, &index, &NeighborOptions::default());
        let texts: Vec<_> = neighbors.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["near label", "far label"]);
        assert_eq!(neighbors[0].distance, 2.0);
        assert_eq!(neighbors[1].distance, 30.0);
    }

    #[test]
    fn ties_break_on_ordinal() {
        let lines = vec![
            LineItem::new("right", square(15.0, 0.0, 10.0)),
            LineItem::new("V-1", square(0.0, 0.0, 10.0)),
            LineItem::new("left", square(-15.0, 0.0, 10.0)),
        ];
        let elements = elements(&lines);
        let index = RTreeIndex::new(&elements);

        let neighbors = resolve_neighbors(1, &elements, &index, &NeighborOptions::default());
        let texts: Vec<_> = neighbors.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["right", "left"]);
        assert_eq!(neighbors[0].distance, neighbors[1].distance);
    }

    #[test]
    fn keeps_at_most_max_neighbors() {
        let mut lines = vec![LineItem::new("V-1", square(0.0, 0.0, 10.0))];
        for i in 0..8 {
            let offset = 11.0 + f64::from(i) * 3.0;
            lines.push(LineItem::new(format!("L{i}"), square(0.0, offset, 2.0)));
        }
        let elements = elements(&lines);
        let index = RTreeIndex::new(&elements);

        let neighbors = resolve_neighbors(0, &elements, &index, &NeighborOptions::default());
        assert_eq!(neighbors.len(), 5);
        assert_eq!(neighbors[0].text, "L0");
        assert!(
            neighbors
                .windows(2)
                .all(|pair| pair[0].distance <= pair[1].distance)
        );
    }

    #[test]
    fn nothing_inside_buffer_yields_empty_list() {
        let lines = vec![
            LineItem::new("V-1", square(0.0, 0.0, 10.0)),
            LineItem::new("distant", square(500.0, 500.0, 10.0)),
        ];
        let elements = elements(&lines);
        let index = RTreeIndex::new(&elements);

        assert!(resolve_neighbors(0, &elements, &index, &NeighborOptions::default()).is_empty());
    }

    #[test]
    fn envelope_corner_beyond_buffer_is_dropped() {
        // Diagonal square: inside the buffered envelope, but ~56.6 units away.
        let lines = vec![
            LineItem::new("V-1", square(0.0, 0.0, 10.0)),
            LineItem::new("corner", square(50.0, 50.0, 5.0)),
        ];
        let elements = elements(&lines);
        let index = RTreeIndex::new(&elements);

        assert_eq!(index.query(&elements[0].bbox.expand(50.0)), vec![0, 1]);
        assert!(resolve_neighbors(0, &elements, &index, &NeighborOptions::default()).is_empty());

        let wide = NeighborOptions {
            buffer: 60.0,
            ..NeighborOptions::default()
        };
        let found = resolve_neighbors(0, &elements, &index, &wide);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].distance, 56.57);
    }

    #[test]
    fn max_distance_only_tightens_the_buffer() {
        let lines = vec![
            LineItem::new("V-1", square(0.0, 0.0, 10.0)),
            LineItem::new("near", square(15.0, 0.0, 5.0)),
            LineItem::new("mid", square(0.0, 40.0, 5.0)),
        ];
        let elements = elements(&lines);
        let index = RTreeIndex::new(&elements);

        let strict = NeighborOptions {
            max_distance: Some(10.0),
            ..NeighborOptions::default()
        };
        let texts: Vec<_> = resolve_neighbors(0, &elements, &index, &strict)
            .into_iter()
            .map(|n| n.text)
            .collect();
        assert_eq!(texts, vec!["near"]);

        let loose = NeighborOptions {
            max_distance: Some(500.0),
            ..NeighborOptions::default()
        };
        assert_eq!(loose.distance_limit(), 50.0);
        assert_eq!(strict.distance_limit(), 10.0);
        assert_eq!(NeighborOptions::default().distance_limit(), 50.0);
    }

    #[test]
    fn overlapping_elements_are_at_distance_zero() {
        let lines = vec![
            LineItem::new("V-1", square(0.0, 0.0, 10.0)),
            LineItem::new("inside", square(2.0, 2.0, 3.0)),
        ];
        let elements = elements(&lines);
        let index = RTreeIndex::new(&elements);

        let neighbors = resolve_neighbors(0, &elements, &index, &NeighborOptions::default());
        assert_eq!(neighbors[0].distance, 0.0);
    }
}
