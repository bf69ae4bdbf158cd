//! Data model shared by the topology pipeline: chunks, line items, and the topology result.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A page or page region produced by the upstream document-analysis step.
///
/// Only `lines` is read by the pipeline. `words` and any other fields the producer attached are
/// carried through untouched so the enriched chunk can be handed back to its owner.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Text lines in reading order, each with its polygon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<LineItem>>,
    /// Word-level items; accepted but not analyzed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Value>>,
    /// Topology attached by [`crate::topology::TopologyAnalyzer::enrich_chunk`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<Topology>,
    /// Remaining producer fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Chunk {
    /// Build a chunk holding only the given lines.
    pub fn from_lines(lines: Vec<LineItem>) -> Self {
        Self {
            lines: Some(lines),
            ..Self::default()
        }
    }
}

/// One extracted text line and its polygon as delivered by document analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    /// Line text.
    #[serde(default)]
    pub text: String,
    /// Raw polygon value; see [`LineItem::coordinates`] for the accepted shapes.
    #[serde(default)]
    pub polygon: Value,
    /// Remaining producer fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LineItem {
    /// Build a line from text and a flat `x0, y0, x1, y1, ...` coordinate sequence.
    pub fn new(text: impl Into<String>, coordinates: impl IntoIterator<Item = f64>) -> Self {
        let polygon = coordinates
            .into_iter()
            .map(|value| {
                serde_json::Number::from_f64(value)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            })
            .collect();
        Self {
            text: text.into(),
            polygon: Value::Array(polygon),
            extra: Map::new(),
        }
    }

    /// Flatten the raw polygon into alternating x, y values.
    ///
    /// Accepts `[x0, y0, ...]`, `[[x, y], ...]` and `[{"x": .., "y": ..}, ...]`. Returns `None`
    /// for any other shape or for non-numeric entries.
    pub fn coordinates(&self) -> Option<Vec<f64>> {
        flatten_coordinates(&self.polygon)
    }
}

fn flatten_coordinates(value: &Value) -> Option<Vec<f64>> {
    let Value::Array(items) = value else {
        return None;
    };
    let mut coordinates = Vec::with_capacity(items.len() * 2);
    for item in items {
        match item {
            Value::Number(number) => coordinates.push(number.as_f64()?),
            Value::Array(pair) if pair.len() == 2 => {
                coordinates.push(pair[0].as_f64()?);
                coordinates.push(pair[1].as_f64()?);
            }
            Value::Object(point) => {
                coordinates.push(point.get("x")?.as_f64()?);
                coordinates.push(point.get("y")?.as_f64()?);
            }
            _ => return None,
        }
    }
    Some(coordinates)
}

/// Axis-aligned rectangle `(min_x, min_y, max_x, max_y)`; serialized as a four-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    /// Smallest x.
    pub min_x: f64,
    /// Smallest y.
    pub min_y: f64,
    /// Largest x.
    pub max_x: f64,
    /// Largest y.
    pub max_y: f64,
}

impl BoundingBox {
    /// Grow the box by `amount` on every side.
    pub fn expand(&self, amount: f64) -> Self {
        Self {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([min_x, min_y, max_x, max_y]: [f64; 4]) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y]
    }
}

/// A labelled element found close to a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Text of the neighboring line.
    pub text: String,
    /// Boundary-to-boundary distance, rounded to two decimals.
    pub distance: f64,
}

/// Equipment or line identifier together with its closest labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Matched identifier, e.g. `V-101`.
    pub tag: String,
    /// Bounding box of the source line polygon.
    pub bbox: BoundingBox,
    /// Closest elements, ascending by distance.
    pub neighbors: Vec<Neighbor>,
}

/// Kind of cross-sheet reference phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorKind {
    /// `SEE DWG`
    #[serde(rename = "SEE DWG")]
    SeeDwg,
    /// `FROM DWG`
    #[serde(rename = "FROM DWG")]
    FromDwg,
    /// `TO DWG`
    #[serde(rename = "TO DWG")]
    ToDwg,
}

impl ConnectorKind {
    /// Canonical upper-case phrase for the kind.
    pub fn label(self) -> &'static str {
        match self {
            Self::SeeDwg => "SEE DWG",
            Self::FromDwg => "FROM DWG",
            Self::ToDwg => "TO DWG",
        }
    }
}

/// Reference from this sheet to another drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    /// Phrase that introduced the reference.
    #[serde(rename = "type")]
    pub kind: ConnectorKind,
    /// Referenced drawing identifier.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Full text of the source line.
    pub text: String,
    /// Bounding box of the source line polygon.
    pub bbox: BoundingBox,
}

/// Structured result of a completed analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyReport {
    /// Tags in source line order.
    pub tags: Vec<Tag>,
    /// Connectors in source line order.
    pub connectors: Vec<Connector>,
    /// Reserved; always empty.
    #[serde(default)]
    pub valves: Vec<Value>,
}

impl TopologyReport {
    /// True when neither tags nor connectors were found.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.connectors.is_empty()
    }
}

/// Marker serialized as `"skipped"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipStatus {
    /// Analysis did not run.
    Skipped,
}

/// Sentinel attached when analysis could not proceed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTopology {
    /// Always [`SkipStatus::Skipped`].
    pub status: SkipStatus,
    /// Human-readable cause.
    pub reason: String,
}

/// Topology attached to a chunk: either a report or the skipped sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Topology {
    /// Analysis was skipped.
    Skipped(SkippedTopology),
    /// Analysis ran to completion.
    Analyzed(TopologyReport),
}

impl Topology {
    /// Build the sentinel for the given reason.
    pub fn skipped(reason: SkipReason) -> Self {
        Self::Skipped(SkippedTopology {
            status: SkipStatus::Skipped,
            reason: reason.to_string(),
        })
    }

    /// Report for analyzed topologies, `None` for the sentinel.
    pub fn report(&self) -> Option<&TopologyReport> {
        match self {
            Self::Analyzed(report) => Some(report),
            Self::Skipped(_) => None,
        }
    }

    /// True for the skipped sentinel.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

impl<'de> Deserialize<'de> for Topology {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.get("status").is_some() {
            SkippedTopology::deserialize(value)
                .map(Self::Skipped)
                .map_err(serde::de::Error::custom)
        } else {
            TopologyReport::deserialize(value)
                .map(Self::Analyzed)
                .map_err(serde::de::Error::custom)
        }
    }
}

/// Conditions under which a chunk receives the skipped sentinel instead of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The configured spatial backend cannot build indexes.
    #[error("spatial backend unavailable")]
    CapabilityUnavailable,
    /// The chunk has no `lines` field or it is empty.
    #[error("chunk has no lines to analyze")]
    EmptyInput,
    /// Every line was rejected by the geometry builder.
    #[error("no line has valid polygon geometry")]
    NoValidGeometry,
}
