
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::database::{IndexPersistence, VectorStore};
use crate::embeddings::{Embedder, OllamaClient};
use crate::generation::{generate_response, generate_structured};
use crate::indexer::{Indexer, collect_documents};
use crate::retrieval::{JsonlQueryLog, RetrievalEngine, RetrievedChunk};

/// Query log location, relative to the base directory
pub const QUERY_LOG_FILE: &str = "logs/queries.jsonl";

const NO_INDEX_MESSAGE: &str = "No index found. Run 'insight-rag ingest' first.";

fn open_store(config: &Config) -> Result<Arc<VectorStore>> {
    let store = VectorStore::new(
        config.index_path(),
        config.ollama.embedding_dimension as usize,
    )
    .context("Failed to open vector store")?;
    Ok(Arc::new(store))
}

fn connect(config: &Config) -> Result<Arc<OllamaClient>> {
    let client = OllamaClient::connect(&config.ollama).with_context(|| {
        format!(
            "Failed to reach Ollama at {}:{}",
            config.ollama.host, config.ollama.port
        )
    })?;
    Ok(Arc::new(client))
}

/// Print the active configuration
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("📋 Current Configuration");
    println!();

    println!("Ollama Settings:");
    match config.ollama_url() {
        Ok(url) => println!("  URL: {}", url),
        Err(e) => println!("  URL: Invalid ({})", e),
    }
    println!("  Embedding Model: {}", config.ollama.model);
    println!("  Generation Model: {}", config.ollama.generation_model);
    println!("  Embedding Dimension: {}", config.ollama.embedding_dimension);
    println!("  Batch Size: {}", config.ollama.batch_size);
    println!();

    println!("Chunking:");
    println!("  Max Chunk Size: {} words", config.chunking.max_chunk_size);
    println!("  Min Chunk Size: {} words", config.chunking.min_chunk_size);
    println!("  Overlap: {} words", config.chunking.overlap);
    println!();

    println!("Retrieval:");
    println!("  Top K: {}", config.retrieval.top_k);
    println!();

    println!("Storage:");
    println!("  Index: {}", config.index_path().display());
    println!("  Documents: {}", config.documents_dir().display());
    println!("  Log Level: {}", config.logging.level);
    println!();

    println!("Config file: {}", config.config_file_path().display());
    Ok(())
}

/// Write the configuration file, creating it with defaults when absent
#[inline]
pub fn write_config(config: &Config) -> Result<()> {
    let existed = config.config_file_path().exists();
    config.save().context("Failed to save configuration")?;

    if existed {
        println!("Configuration saved to {}", config.config_file_path().display());
    } else {
        println!(
            "Created default configuration at {}",
            config.config_file_path().display()
        );
    }
    println!("Edit the file and run 'insight-rag config --show' to review it.");
    Ok(())
}

/// Index every `.txt` file in `dir` (or the configured documents directory) not indexed yet
#[inline]
pub fn ingest(config: &Config, dir: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| config.documents_dir());
    info!("Ingesting documents from {}", dir.display());

    let documents = collect_documents(&dir)
        .with_context(|| format!("Failed to read documents from {}", dir.display()))?;
    if documents.is_empty() {
        warn!("No documents found in {}", dir.display());
        println!(
            "No documents found. Add .txt files to {} and run ingest again.",
            dir.display()
        );
        return Ok(());
    }

    let store = open_store(config)?;
    let embedder: Arc<dyn Embedder> = connect(config)?;
    let chunking = config
        .chunking
        .to_config()
        .context("Invalid chunking configuration")?;
    let indexer = Indexer::new(store, embedder, chunking)?;

    let pending = indexer.pending(&documents)?;
    if pending.is_empty() {
        println!("All {} document(s) are already indexed.", documents.len());
        return Ok(());
    }

    let ingested = indexer.ingest(&pending).context("Failed to index documents")?;

    for document in &ingested {
        println!(
            "📄 {} ({} chunks)",
            document.record.title,
            document.chunks.len()
        );
    }
    let chunk_total: usize = ingested.iter().map(|d| d.ids.len()).sum();
    println!(
        "Indexed {} chunks from {} document(s); {} skipped.",
        chunk_total,
        ingested.len(),
        documents.len() - ingested.len()
    );
    Ok(())
}

fn print_results(results: &[RetrievedChunk]) {
    if results.is_empty() {
        println!("No matching chunks.");
        return;
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. {} (chunk {}, relevance {:.3})",
            rank + 1,
            result.metadata.title,
            result.metadata.chunk_index,
            result.relevance
        );
        println!("   {}", result.metadata.text);
    }
}

/// Retrieve chunks for `text`, optionally composing an answer from them
#[inline]
pub fn query(
    config: &Config,
    text: &str,
    top_k: Option<usize>,
    answer: bool,
    structured: bool,
) -> Result<()> {
    // Check the index first: connecting can spend seconds on retries.
    let store = open_store(config)?;
    match store.snapshot() {
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            println!("{}", NO_INDEX_MESSAGE);
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to load index"),
    }

    let client = connect(config)?;
    let embedder: Arc<dyn Embedder> = Arc::clone(&client) as Arc<dyn Embedder>;
    let query_log = Arc::new(JsonlQueryLog::new(
        config.get_base_dir().join(QUERY_LOG_FILE),
    ));
    let engine = RetrievalEngine::new(store, embedder, config.retrieval.top_k)
        .with_query_log(query_log);

    let k = top_k.unwrap_or_else(|| engine.default_top_k());
    let results = match engine.retrieve_top(text, k) {
        Ok(results) => results,
        Err(e) if e.is_not_found() => {
            println!("{}", NO_INDEX_MESSAGE);
            return Ok(());
        }
        Err(e) => return Err(e).context("Retrieval failed"),
    };

    if structured {
        let outcome = generate_structured(client.as_ref(), text, &results)
            .context("Failed to generate structured answer")?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print_results(&results);

    if answer {
        let response = generate_response(client.as_ref(), text, &results)
            .context("Failed to generate answer")?;
        println!();
        println!("💡 {}", response);
    }
    Ok(())
}

/// Report index, metadata and model server health
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("📊 Insight RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!("   ✅ Ollama: Connected ({})", client.base_url());
                println!("   📋 Model: {}", config.ollama.model);
            }
            Err(e) => println!("   ⚠️  Ollama: Unavailable - {}", e),
        },
        Err(e) => println!("   ❌ Ollama: Invalid configuration - {}", e),
    }
    println!();

    println!("🔍 Index Status:");
    for line in index_status(&IndexPersistence::new(config.index_path())) {
        println!("   {}", line);
    }

    Ok(())
}

fn index_status(persistence: &IndexPersistence) -> Vec<String> {
    let mut lines = Vec::new();
    match persistence.read_manifest() {
        Ok(manifest) => {
            lines.push(format!("Path: {}", persistence.path().display()));
            lines.push(format!("Generation: {}", manifest.generation));
            lines.push(format!("Vectors: {}", manifest.count));
            lines.push(format!("Dimension: {}", manifest.dimension));
            lines.push(format!(
                "Last Saved: {}",
                manifest.saved_at.format("%Y-%m-%d %H:%M:%S")
            ));
        }
        Err(e) if e.is_not_found() => {
            lines.push("💤 No index yet. Run 'insight-rag ingest' to build one.".to_string());
            return lines;
        }
        Err(e) => {
            lines.push(format!("❌ Manifest unreadable - {}", e));
            return lines;
        }
    }

    match persistence.inspect() {
        Ok((state, report)) => {
            lines.push(format!("Documents: {}", state.metadata.sources().len()));
            if report.is_consistent {
                lines.push(format!("✅ {}", report.summary()));
            } else {
                lines.push(format!("⚠️  {}", report.summary()));
            }
        }
        Err(e) => lines.push(format!("❌ Failed to load index - {}", e)),
    }
    lines
}
