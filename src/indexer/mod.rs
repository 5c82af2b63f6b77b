// Indexer module
// Turns source documents into chunks, embeddings and index entries


use chrono::{DateTime, Utc};
use serde::Serialize;
use std::borrow::Borrow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::database::{ChunkMetadata, VectorStore};
use crate::embeddings::{Chunk, ChunkingConfig, Embedder, chunk_text, validate_embeddings};

pub const DEFAULT_SOURCE: &str = "file_upload";
pub const DEFAULT_DOCUMENT_TYPE: &str = "text";

/// A document waiting to be indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Stable key of the document, stored with every chunk
    pub path: String,
    pub title: String,
    pub source: String,
    pub document_type: String,
    pub text: String,
}

impl SourceDocument {
    /// A plain-text upload titled by its file name
    #[inline]
    pub fn from_text(path: impl Into<String>, text: impl Into<String>) -> Self {
        let path = path.into();
        let title = Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        Self {
            path,
            title,
            source: DEFAULT_SOURCE.to_string(),
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            text: text.into(),
        }
    }
}

/// Read every `*.txt` file in `dir`, sorted by path.
///
/// The directory is created when missing. Files that cannot be read as UTF-8 are
/// logged and skipped.
#[inline]
pub fn collect_documents(dir: &Path) -> Result<Vec<SourceDocument>> {
    fs::create_dir_all(dir)?;

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    paths.sort();

    info!("Found {} document(s) in {}", paths.len(), dir.display());

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        match fs::read_to_string(&path) {
            Ok(text) => documents.push(SourceDocument::from_text(
                path.to_string_lossy().into_owned(),
                text,
            )),
            Err(e) => error!("Error reading {}: {}", path.display(), e),
        }
    }
    Ok(documents)
}

/// Bookkeeping for one ingested document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub path: String,
    pub title: String,
    pub source: String,
    pub document_type: String,
    pub ingested_at: DateTime<Utc>,
    pub processed: bool,
}

/// A document after ingestion, with the ids its chunks received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedDocument {
    pub record: DocumentRecord,
    pub chunks: Vec<Chunk>,
    pub ids: Vec<u64>,
}

/// Chunks, embeds and indexes documents into a [`VectorStore`]
pub struct Indexer {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
}

impl Indexer {
    #[inline]
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
        chunking: ChunkingConfig,
    ) -> Result<Self> {
        chunking.validate()?;
        Ok(Self {
            store,
            embedder,
            chunking,
        })
    }

    #[inline]
    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Documents whose path has no chunks in the index yet
    #[inline]
    pub fn pending<'a>(&self, documents: &'a [SourceDocument]) -> Result<Vec<&'a SourceDocument>> {
        let mut pending = Vec::with_capacity(documents.len());
        for document in documents {
            if self.store.contains_source(&document.path)? {
                info!("Document {} already indexed, skipping", document.path);
            } else {
                pending.push(document);
            }
        }
        Ok(pending)
    }

    /// Index `documents` in a single store update.
    ///
    /// Embeddings are computed before the store is touched, so a failing embedder
    /// leaves the index unchanged. Documents already present are indexed again;
    /// use [`Indexer::pending`] to filter them first.
    #[inline]
    pub fn ingest<D>(&self, documents: &[D]) -> Result<Vec<IngestedDocument>>
    where
        D: Borrow<SourceDocument>,
    {
        let mut prepared = Vec::with_capacity(documents.len());
        for document in documents {
            let document: &SourceDocument = document.borrow();
            let chunks = chunk_text(&document.text, &self.chunking)?;
            if chunks.is_empty() {
                warn!("Document {} produced no chunks", document.path);
            } else {
                debug!(
                    "Document {} split into {} chunk(s)",
                    document.path,
                    chunks.len()
                );
            }
            prepared.push((document, chunks));
        }

        let texts: Vec<String> = prepared
            .iter()
            .flat_map(|(_, chunks)| chunks.iter().map(|c| c.text.clone()))
            .collect();

        let ids = if texts.is_empty() {
            Vec::new()
        } else {
            let vectors = self.embedder.embed(&texts)?;
            validate_embeddings(&vectors, texts.len(), self.store.dimension())?;

            let metadata = prepared
                .iter()
                .flat_map(|(document, chunks)| {
                    chunks.iter().map(|chunk| ChunkMetadata {
                        file_path: document.path.clone(),
                        title: document.title.clone(),
                        chunk_index: chunk.index,
                        text: chunk.text.clone(),
                    })
                })
                .collect();
            self.store.add(&vectors, metadata)?
        };

        let ingested_at = Utc::now();
        let mut remaining = ids.into_iter();
        let ingested: Vec<IngestedDocument> = prepared
            .into_iter()
            .map(|(document, chunks)| {
                let ids: Vec<u64> = remaining.by_ref().take(chunks.len()).collect();
                IngestedDocument {
                    record: DocumentRecord {
                        path: document.path.clone(),
                        title: document.title.clone(),
                        source: document.source.clone(),
                        document_type: document.document_type.clone(),
                        ingested_at,
                        processed: true,
                    },
                    chunks,
                    ids,
                }
            })
            .collect();

        info!(
            "Indexed {} chunks from {} document(s)",
            texts.len(),
            ingested.len()
        );
        Ok(ingested)
    }
}
