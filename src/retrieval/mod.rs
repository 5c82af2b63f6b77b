// Retrieval module
// Query embedding, nearest-neighbor search and metadata join

pub mod query_log;

#[cfg(test)]
mod tests;

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::database::{ChunkMetadata, VectorStore};
use crate::embeddings::Embedder;
use crate::{RagError, Result};

pub use query_log::{
    JsonlQueryLog, LoggedChunk, MemoryQueryLog, NoopQueryLog, QueryLog, QueryLogEntry,
};

/// A chunk returned for a query, closest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub id: u64,
    pub metadata: ChunkMetadata,
    /// Squared Euclidean distance to the query embedding
    pub distance: f32,
    /// `1 / (1 + distance)`
    pub relevance: f32,
}

pub struct RetrievalEngine {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    query_log: Arc<dyn QueryLog>,
    default_top_k: usize,
}

impl RetrievalEngine {
    #[inline]
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>, default_top_k: usize) -> Self {
        Self {
            store,
            embedder,
            query_log: Arc::new(NoopQueryLog),
            default_top_k,
        }
    }

    #[inline]
    pub fn with_query_log(mut self, query_log: Arc<dyn QueryLog>) -> Self {
        self.query_log = query_log;
        self
    }

    #[inline]
    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Retrieve the configured default number of chunks
    #[inline]
    pub fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        self.retrieve_top(query, self.default_top_k)
    }

    /// Retrieve up to `k` chunks ordered by ascending distance.
    ///
    /// Fails with [`RagError::NotFound`] when no index has been built yet and with
    /// [`RagError::InvalidInput`] for a blank query. Ids without metadata are
    /// skipped.
    #[inline]
    pub fn retrieve_top(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }

        let started = Instant::now();

        // Fixed for the whole query; later adds are not observed.
        let snapshot = self.store.snapshot()?;

        if self.embedder.dimension() != snapshot.index.dimension() {
            return Err(RagError::Config(format!(
                "embedder {} produces {} dimensions but the index holds {}",
                self.embedder.model_name(),
                self.embedder.dimension(),
                snapshot.index.dimension()
            )));
        }

        let query_vector = self.embedder.embed_query(query)?;
        let neighbors = snapshot.index.search(&query_vector, k)?;
        debug!("Search returned {} candidates for k={}", neighbors.len(), k);

        let results: Vec<RetrievedChunk> = neighbors
            .into_iter()
            .filter_map(|neighbor| match snapshot.metadata.get(neighbor.id) {
                Some(metadata) => Some(RetrievedChunk {
                    id: neighbor.id,
                    metadata: metadata.clone(),
                    distance: neighbor.distance,
                    relevance: neighbor.relevance(),
                }),
                None => {
                    warn!("No metadata for vector id {}, skipping", neighbor.id);
                    None
                }
            })
            .collect();

        let elapsed = started.elapsed();
        info!(
            "Retrieved {} chunks in {:?} for query: {}",
            results.len(),
            elapsed,
            query
        );

        let entry = QueryLogEntry {
            query: query.to_string(),
            timestamp: Utc::now(),
            response_time_ms: elapsed.as_secs_f64() * 1000.0,
            results: results
                .iter()
                .map(|r| LoggedChunk {
                    id: r.id,
                    file_path: r.metadata.file_path.clone(),
                    relevance: r.relevance,
                })
                .collect(),
        };
        if let Err(e) = self.query_log.record(&entry) {
            warn!("Failed to record query log entry: {}", e);
        }

        Ok(results)
    }
}
