use std::sync::Arc;

use drawtopo::{
    config::Config,
    topology::{
        Chunk, ConnectorKind, DisabledBackend, RTreeBackend, TopologyAnalyzer, TopologyApi,
        TopologyService, TopologySettings, format_to_text,
    },
};
use serde_json::{Value, json};

fn analyzer() -> TopologyAnalyzer {
    TopologyAnalyzer::new(Arc::new(RTreeBackend), TopologySettings::default())
}

fn chunk(value: Value) -> Chunk {
    serde_json::from_value(value).expect("chunk json")
}

fn enrich(value: Value) -> Value {
    let mut chunk = chunk(value);
    analyzer().enrich_chunk(&mut chunk);
    serde_json::to_value(&chunk).expect("serialize chunk")
}

#[test]
fn tag_next_to_connector_reports_both() {
    let enriched = enrich(json!({
        "lines": [
            { "text": "V-101", "polygon": [0, 0, 10, 0, 10, 10, 0, 10] },
            { "text": "SEE DWG. P-002", "polygon": [20, 0, 30, 0, 30, 10, 20, 10] }
        ]
    }));

    let topology = &enriched["topology"];
    assert_eq!(
        topology["tags"],
        json!([{
            "tag": "V-101",
            "bbox": [0.0, 0.0, 10.0, 10.0],
            "neighbors": [{ "text": "SEE DWG. P-002", "distance": 10.0 }]
        }])
    );
    assert_eq!(
        topology["connectors"],
        json!([{
            "type": "SEE DWG",
            "ref": "P-002",
            "text": "SEE DWG. P-002",
            "bbox": [20.0, 0.0, 30.0, 10.0]
        }])
    );
    assert_eq!(topology["valves"], json!([]));
}

#[test]
fn chunk_without_lines_is_skipped_with_reason() {
    let enriched = enrich(json!({ "page_number": 2, "words": [] }));

    let topology = &enriched["topology"];
    assert_eq!(topology["status"], "skipped");
    let reason = topology["reason"].as_str().expect("reason");
    assert!(!reason.is_empty());
    assert_eq!(enriched["page_number"], 2);
    assert_eq!(enriched["words"], json!([]));
}

#[test]
fn distant_elements_are_not_neighbors() {
    let enriched = enrich(json!({
        "lines": [
            { "text": "P-301", "polygon": [0, 0, 10, 0, 10, 10, 0, 10] },
            { "text": "far label", "polygon": [100, 0, 110, 0, 110, 10, 100, 10] }
        ]
    }));

    let tags = enriched["topology"]["tags"].as_array().expect("tags");
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["neighbors"], json!([]));
}

#[test]
fn diagonal_element_inside_search_box_but_beyond_buffer_is_not_a_neighbor() {
    // Its bounds fall inside the tag's box grown by 50, yet the true gap is ~63.6.
    let enriched = enrich(json!({
        "lines": [
            { "text": "V-1", "polygon": [0, 0, 10, 0, 10, 10, 0, 10] },
            { "text": "corner", "polygon": [55, 55, 60, 55, 60, 60, 55, 60] }
        ]
    }));

    let tags = enriched["topology"]["tags"].as_array().expect("tags");
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["neighbors"], json!([]));
}

#[test]
fn degenerate_polygon_is_excluded_everywhere() {
    let enriched = enrich(json!({
        "lines": [
            { "text": "V-101", "polygon": [0, 0, 10, 0, 10, 10, 0, 10] },
            { "text": "V-202", "polygon": [0, 0, 0, 0] },
            { "text": "GATE", "polygon": [12, 0, 20, 0, 20, 10, 12, 10] }
        ]
    }));

    let tags = enriched["topology"]["tags"].as_array().expect("tags");
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["tag"], "V-101");
    assert_eq!(
        tags[0]["neighbors"],
        json!([{ "text": "GATE", "distance": 2.0 }])
    );
}

#[test]
fn disabled_backend_skips_every_chunk() {
    let analyzer = TopologyAnalyzer::new(Arc::new(DisabledBackend), TopologySettings::default());
    let mut chunk = chunk(json!({
        "lines": [{ "text": "V-101", "polygon": [0, 0, 10, 0, 10, 10, 0, 10] }]
    }));

    let topology = analyzer.enrich_chunk(&mut chunk);
    assert!(topology.is_skipped());
    assert_eq!(format_to_text(topology), "");
}

#[test]
fn text_block_matches_report() {
    let mut chunk = chunk(json!({
        "lines": [
            { "text": "V-101", "polygon": [0, 0, 10, 0, 10, 10, 0, 10] },
            { "text": "FROM DWG 12-A", "polygon": [20, 0, 30, 0, 30, 10, 20, 10] },
            { "text": "LIC-7", "polygon": [500, 500, 510, 500, 510, 510, 500, 510] }
        ]
    }));

    let topology = analyzer().enrich_chunk(&mut chunk).clone();
    let report = topology.report().expect("report");
    assert_eq!(report.connectors[0].kind, ConnectorKind::FromDwg);
    assert_eq!(report.connectors[0].reference, "12-A");

    assert_eq!(
        format_to_text(&topology),
        "[Drawing Topology]\n\
         Tags:\n\
         - V-101 | near: FROM DWG 12-A (dist: 10.0)\n\
         - LIC-7 | near: none\n\
         Connectors:\n\
         - FROM DWG -> 12-A | text: FROM DWG 12-A\n"
    );
}

#[test]
fn enriched_chunk_survives_json_round_trip() {
    let mut chunk = chunk(json!({
        "id": "page-1",
        "lines": [
            { "text": "V-101", "polygon": [[0, 0], [10, 0], [10, 10], [0, 10]], "confidence": 0.9 },
            { "text": "TO DWG P-9", "polygon": [{"x": 15, "y": 0}, {"x": 25, "y": 0}, {"x": 25, "y": 10}] }
        ]
    }));
    analyzer().enrich_chunk(&mut chunk);

    let encoded = serde_json::to_string(&chunk).expect("encode");
    let decoded: Chunk = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(decoded, chunk);
    assert_eq!(decoded.extra["id"], "page-1");
    let lines = decoded.lines.as_ref().expect("lines");
    assert_eq!(lines[0].extra["confidence"], 0.9);
}

#[tokio::test]
async fn service_from_default_config_enriches_batches() {
    let service = TopologyService::from_config(&Config::default());
    let chunks = vec![
        chunk(json!({ "id": 1, "lines": [{ "text": "V-1", "polygon": [0, 0, 4, 0, 4, 4] }] })),
        chunk(json!({ "id": 2 })),
    ];

    let results = service.enrich_chunks(chunks).await.expect("batch");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.extra["id"], 1);
    assert!(results[0].text.starts_with("[Drawing Topology]\n"));
    assert_eq!(results[1].chunk.extra["id"], 2);
    assert!(
        results[1]
            .chunk
            .topology
            .as_ref()
            .is_some_and(|topology| topology.is_skipped())
    );

    let snapshot = service.metrics_snapshot();
    assert_eq!(snapshot.chunks_analyzed, 1);
    assert_eq!(snapshot.chunks_skipped, 1);
}
