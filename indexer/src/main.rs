use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docsearch_core::timestamp::{format_output, parse_input};
use docsearch_core::{Document, EngineConfig, SearchEngine};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputDoc {
    content: String,
    created_date: String,
}

impl InputDoc {
    fn into_document(self) -> Result<Document> {
        let created = parse_input(&self.created_date)?;
        Ok(Document::new(self.content, created))
    }
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Load documents into a docsearch index and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents from JSON/JSONL files or a directory of them
    Ingest {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Index directory
        #[arg(long)]
        index: String,
        /// Documents per commit
        #[arg(long, default_value_t = 1_000)]
        batch_size: usize,
    },
    /// Run one query and print hits as JSON lines
    Search {
        /// Index directory
        #[arg(long)]
        index: String,
        /// Search string; empty matches everything in range
        #[arg(long, default_value = "")]
        query: String,
        /// Inclusive lower bound on the creation date
        #[arg(long)]
        since: String,
        /// Print at most this many hits
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { input, index, batch_size } => ingest(&input, &index, batch_size),
        Commands::Search { index, query, since, limit } => search(&index, &query, &since, limit),
    }
}

fn ingest(input: &str, index: &str, batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        bail!("--batch-size must be at least 1");
    }
    let engine = SearchEngine::open(EngineConfig::new(index))?;
    let files = collect_files(Path::new(input));
    if files.is_empty() {
        bail!("no .json or .jsonl files under {input}");
    }

    let mut pending: Vec<Document> = Vec::with_capacity(batch_size);
    let mut total = 0usize;
    for file in files {
        let docs = read_docs(&file).with_context(|| format!("reading {}", file.display()))?;
        tracing::debug!(file = %file.display(), docs = docs.len(), "parsed input");
        for doc in docs {
            pending.push(doc);
            if pending.len() >= batch_size {
                total += engine.index_content(&pending)?;
                pending.clear();
                tracing::info!(total, "committed batch");
            }
        }
    }
    if !pending.is_empty() {
        total += engine.index_content(&pending)?;
    }

    tracing::info!(total, num_docs = engine.num_docs(), index, "ingest complete");
    engine.close()?;
    Ok(())
}

fn search(index: &str, query: &str, since: &str, limit: usize) -> Result<()> {
    let engine = SearchEngine::open(EngineConfig::new(index))?;
    let lower = parse_input(since)?;
    let hits = engine.search(query, lower)?;
    tracing::info!(total_hits = hits.len(), "search complete");
    for hit in hits.into_iter().take(limit) {
        let line = serde_json::json!({
            "docId": hit.doc_id,
            "score": hit.score,
            "content": hit.content,
            "createdDate": format_output(hit.created_date)?,
        });
        println!("{line}");
    }
    engine.close()?;
    Ok(())
}

fn collect_files(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

fn read_docs(file: &Path) -> Result<Vec<Document>> {
    let reader = BufReader::new(File::open(file)?);
    let mut docs = Vec::new();
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let doc: InputDoc =
                serde_json::from_str(&line).with_context(|| format!("line {}", lineno + 1))?;
            docs.push(doc.into_document()?);
        }
        return Ok(docs);
    }
    match serde_json::from_reader::<_, serde_json::Value>(reader)? {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v)?;
                docs.push(doc.into_document()?);
            }
        }
        json @ serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json)?;
            docs.push(doc.into_document()?);
        }
        _ => bail!("expected an object or an array of objects"),
    }
    Ok(docs)
}
