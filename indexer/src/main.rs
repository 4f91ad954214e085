use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use search_core::{
    process_queries, remove_duplicates, DocumentStatus, ExecutionPolicy, LogDuration, SearchConfig,
    SearchIndex,
};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: i32,
    text: String,
    #[serde(default)]
    status: DocumentStatus,
    #[serde(default)]
    ratings: Vec<i32>,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Load documents into a TF-IDF index and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IndexArgs {
    /// Input path (JSON/JSONL file or a directory of them)
    #[arg(long)]
    input: String,
    /// Space separated stop words
    #[arg(long, default_value = "")]
    stop_words: String,
    /// Optional JSON file with search settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Use the parallel implementation
    #[arg(long, default_value_t = false)]
    parallel: bool,
}

impl IndexArgs {
    fn policy(&self) -> ExecutionPolicy {
        if self.parallel {
            ExecutionPolicy::Parallel
        } else {
            ExecutionPolicy::Sequential
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the top documents for a query
    Search {
        #[command(flatten)]
        index: IndexArgs,
        /// Query text; prefix a word with '-' to exclude documents containing it
        #[arg(long)]
        query: String,
        /// Only return documents with this status
        #[arg(long, value_parser = parse_status, default_value = "ACTUAL")]
        status: DocumentStatus,
    },
    /// Print the query words found in one document
    Match {
        #[command(flatten)]
        index: IndexArgs,
        #[arg(long)]
        query: String,
        #[arg(long)]
        id: i32,
    },
    /// Remove documents that repeat the word set of an earlier document
    Dedup {
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Run every line of a file as a query, concurrently
    Batch {
        #[command(flatten)]
        index: IndexArgs,
        /// File with one query per line
        #[arg(long)]
        queries: PathBuf,
    },
}

fn parse_status(s: &str) -> Result<DocumentStatus, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_uppercase()))
        .map_err(|_| {
            format!("unknown status {s:?}, expected ACTUAL, IRRELEVANT, BANNED or REMOVED")
        })
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { index, query, status } => {
            let idx = load_index(&index)?;
            let top = idx.find_top_documents_with_status(index.policy(), &query, status)?;
            if top.is_empty() {
                println!("no documents found");
            }
            for doc in top {
                println!("{doc}");
            }
        }
        Commands::Match { index, query, id } => {
            let idx = load_index(&index)?;
            let (words, status) = idx
                .match_document_with(index.policy(), &query, id)
                .with_context(|| format!("matching document {id}"))?;
            let words: Vec<&str> = words.iter().map(|w| &**w).collect();
            println!("{{ document_id = {id}, status = {status:?}, words = {words:?} }}");
        }
        Commands::Dedup { index } => {
            let mut idx = load_index(&index)?;
            let removed = remove_duplicates(&mut idx)?;
            for id in &removed {
                println!("Found duplicate document id {id}");
            }
            tracing::info!(
                removed = removed.len(),
                remaining = idx.document_count(),
                "dedup complete"
            );
        }
        Commands::Batch { index, queries } => {
            let idx = load_index(&index)?;
            let text = fs::read_to_string(&queries)
                .with_context(|| format!("reading queries from {}", queries.display()))?;
            let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
            for (query, top) in lines.iter().zip(process_queries(&idx, &lines)?) {
                println!("{query}:");
                for doc in top {
                    println!("  {doc}");
                }
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SearchConfig> {
    match path {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
            let config: SearchConfig = serde_json::from_reader(BufReader::new(f))
                .with_context(|| format!("parsing config {}", path.display()))?;
            Ok(config)
        }
        None => Ok(SearchConfig::default()),
    }
}

fn load_index(args: &IndexArgs) -> Result<SearchIndex> {
    let _timer = LogDuration::new("load index");
    let config = load_config(args.config.as_deref())?;
    let stop_words: Vec<&str> = args.stop_words.split(' ').collect();
    let mut idx = SearchIndex::with_config(stop_words, config)?;

    for file in input_files(Path::new(&args.input)) {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            index_jsonl(&file, &mut idx)?;
        } else {
            index_json(&file, &mut idx)?;
        }
    }
    tracing::info!(
        input = %args.input,
        num_docs = idx.document_count(),
        num_terms = idx.term_count(),
        "ingested documents"
    );
    Ok(idx)
}

fn input_files(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        let entries = WalkDir::new(input_path).sort_by_file_name().into_iter();
        for entry in entries.filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

fn index_jsonl(file: &Path, idx: &mut SearchIndex) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(f);
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: InputDoc = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), line_no + 1))?;
        ingest_doc(doc, idx)?;
    }
    Ok(())
}

fn index_json(file: &Path, idx: &mut SearchIndex) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v)?;
                ingest_doc(doc, idx)?;
            }
        }
        serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json)?;
            ingest_doc(doc, idx)?;
        }
        _ => {}
    }
    Ok(())
}

fn ingest_doc(doc: InputDoc, idx: &mut SearchIndex) -> Result<()> {
    idx.add_document(doc.id, &doc.text, doc.status, &doc.ratings)
        .with_context(|| format!("adding document {}", doc.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(input: &Path) -> IndexArgs {
        IndexArgs {
            input: input.to_string_lossy().to_string(),
            stop_words: "и в".into(),
            config: None,
            parallel: false,
        }
    }

    #[test]
    fn loads_json_and_jsonl_from_directory() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.jsonl"),
            "{\"id\": 0, \"text\": \"белый кот и модный ошейник\", \"ratings\": [8, -3]}\n\n\
             {\"id\": 1, \"text\": \"пушистый кот пушистый хвост\", \"status\": \"ACTUAL\", \"ratings\": [7, 2, 7]}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"[{"id": 2, "text": "ухоженный пёс выразительные глаза", "status": "BANNED"}]"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let idx = load_index(&args(dir.path())).unwrap();
        assert_eq!(idx.document_count(), 3);
        assert_eq!(idx.document_status(2).unwrap(), DocumentStatus::Banned);
        let top = idx.find_top_documents("пушистый кот").unwrap();
        assert_eq!(top.iter().map(|d| d.id).collect::<Vec<_>>(), vec![1, 0]);
    }

    #[test]
    fn duplicate_id_reports_context() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("docs.jsonl");
        fs::write(&file, "{\"id\": 1, \"text\": \"cat\"}\n{\"id\": 1, \"text\": \"dog\"}\n")
            .unwrap();
        let err = load_index(&args(&file)).unwrap_err();
        assert!(format!("{err:#}").contains("adding document 1"));
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"max_results": 1}"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.max_results, 1);
        assert_eq!(config.accumulator_buckets, SearchConfig::default().accumulator_buckets);
    }

    #[test]
    fn status_flag_is_case_insensitive() {
        assert_eq!(parse_status("banned"), Ok(DocumentStatus::Banned));
        assert!(parse_status("gone").is_err());
    }
}
