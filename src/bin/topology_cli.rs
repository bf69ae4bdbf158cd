//! Offline enrichment of analyzed drawing pages.
//!
//! Reads chunk JSON (a single chunk, an array of chunks, or every `*.json` file under a
//! directory), attaches topology, and writes either the enriched JSON or the rendered text.
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use drawtopo::{
    config::Config,
    logging,
    topology::{Chunk, EnrichedChunk, TopologyApi, TopologyService, format_to_text},
};
use serde_json::Value;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "topology-cli",
    about = "Detect tags, nearby labels, and cross-sheet connectors in analyzed drawing pages"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enrich chunks and print the result.
    Analyze {
        /// Chunk file, chunk-array file, or directory of `*.json` files.
        #[arg(long)]
        input: PathBuf,
        /// Write output here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Emit the rendered text blocks instead of JSON.
        #[arg(long)]
        text: bool,
    },
    /// Render the topology already attached to enriched chunks.
    Format {
        /// Enriched chunk file or chunk-array file.
        #[arg(long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_cli_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            input,
            output,
            text,
        } => analyze(&input, output.as_deref(), text).await,
        Command::Format { input } => format_chunks(&input),
    }
}

async fn analyze(input: &Path, output: Option<&Path>, text: bool) -> Result<()> {
    let config = Config::from_env().context("invalid topology configuration")?;
    let service = TopologyService::from_config(&config);
    let chunks = load_chunks(input)?;
    tracing::info!(
        chunks = chunks.len(),
        buffer = service.analyzer().settings().neighbors.buffer,
        "Analyzing chunks"
    );

    let results = service
        .enrich_chunks(chunks)
        .await
        .context("topology enrichment failed")?;

    let rendered = if text {
        render_text(results.iter().map(|result| result.text.as_str()))
    } else {
        render_json(&results)?
    };
    write_output(output, &rendered)?;

    let snapshot = service.metrics_snapshot();
    tracing::info!(
        analyzed = snapshot.chunks_analyzed,
        skipped = snapshot.chunks_skipped,
        tags = snapshot.tags_detected,
        connectors = snapshot.connectors_detected,
        invalid_geometries = snapshot.invalid_geometries,
        "Analysis finished"
    );
    Ok(())
}

fn format_chunks(input: &Path) -> Result<()> {
    let chunks = read_chunk_file(input)?;
    let blocks: Vec<String> = chunks
        .iter()
        .map(|chunk| chunk.topology.as_ref().map(format_to_text).unwrap_or_default())
        .collect();
    write_output(None, &render_text(blocks.iter().map(String::as_str)))
}

fn load_chunks(input: &Path) -> Result<Vec<Chunk>> {
    if !input.is_dir() {
        return read_chunk_file(input);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("no .json files found under {}", input.display());
    }

    let mut chunks = Vec::new();
    for file in files {
        chunks.extend(read_chunk_file(&file)?);
    }
    Ok(chunks)
}

fn read_chunk_file(path: &Path) -> Result<Vec<Chunk>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    let values = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    values
        .into_iter()
        .map(|item| {
            // Enriched output nests the chunk under `chunk`.
            let item = match item {
                Value::Object(mut map) if map.contains_key("chunk") && map.contains_key("text") => {
                    map.remove("chunk").unwrap_or(Value::Null)
                }
                other => other,
            };
            serde_json::from_value(item)
                .with_context(|| format!("decoding chunk in {}", path.display()))
        })
        .collect()
}

fn render_json(results: &[EnrichedChunk]) -> Result<String> {
    let rendered = if results.len() == 1 {
        serde_json::to_string_pretty(&results[0])
    } else {
        serde_json::to_string_pretty(results)
    };
    rendered.context("serializing enriched chunks")
}

fn render_text<'a>(blocks: impl Iterator<Item = &'a str>) -> String {
    blocks
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn write_output(output: Option<&Path>, rendered: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            if !rendered.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("topology-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(name);
        fs::write(&path, contents).expect("write temp file");
        path
    }

    #[test]
    fn reads_single_chunk_and_arrays() {
        let single = write_temp("single.json", r#"{"lines": []}"#);
        assert_eq!(read_chunk_file(&single).expect("single").len(), 1);

        let array = write_temp("array.json", r#"[{"id": 1}, {"id": 2}]"#);
        let chunks = read_chunk_file(&array).expect("array");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].extra["id"], 2);
    }

    #[test]
    fn unwraps_enriched_output() {
        let path = write_temp(
            "enriched.json",
            r#"{"chunk": {"id": "p1", "topology": {"status": "skipped", "reason": "x"}}, "text": ""}"#,
        );
        let chunks = read_chunk_file(&path).expect("enriched");
        assert_eq!(chunks[0].extra["id"], "p1");
        assert!(chunks[0].topology.as_ref().is_some_and(|t| t.is_skipped()));
    }

    #[test]
    fn text_output_drops_empty_blocks() {
        let block = "[Drawing Topology]\nTags:\n- V-1 | near: none\n";
        let rendered = render_text(["", block, ""].into_iter());
        assert_eq!(rendered, block);
    }
}
