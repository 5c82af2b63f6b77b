
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

use super::index::Neighbor;
use super::metadata::ChunkMetadata;
use super::persistence::{IndexPersistence, IndexState};
use crate::{RagError, Result};

/// Shared handle to the persisted index.
///
/// Mutations (`add`, `save`, `load`) are serialized by one writer lock and each
/// publishes a new immutable [`IndexState`] snapshot. Searches clone the current
/// snapshot and never take the writer lock, so a search that starts before an
/// `add` completes sees the state from before it.
pub struct VectorStore {
    persistence: IndexPersistence,
    dimension: usize,
    writer: Mutex<()>,
    current: RwLock<Option<Arc<IndexState>>>,
}

impl VectorStore {
    #[inline]
    pub fn new(index_path: impl Into<PathBuf>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::InvalidInput(
                "vector dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            persistence: IndexPersistence::new(index_path),
            dimension,
            writer: Mutex::new(()),
            current: RwLock::new(None),
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn index_path(&self) -> &Path {
        self.persistence.path()
    }

    fn published(&self) -> Option<Arc<IndexState>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, state: IndexState) -> Arc<IndexState> {
        let state = Arc::new(state);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&state));
        state
    }

    fn load_from_disk(&self) -> Result<IndexState> {
        let state = self.persistence.load()?;
        if state.index.dimension() != self.dimension {
            return Err(RagError::Config(format!(
                "index at {} holds {}-dimensional vectors but the embedder produces {}",
                self.persistence.path().display(),
                state.index.dimension(),
                self.dimension
            )));
        }
        Ok(state)
    }

    /// Current snapshot, loading it from disk on first use.
    ///
    /// Fails with [`RagError::NotFound`] when nothing has been persisted yet.
    #[inline]
    pub fn snapshot(&self) -> Result<Arc<IndexState>> {
        if let Some(state) = self.published() {
            return Ok(state);
        }

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have loaded while we waited.
        if let Some(state) = self.published() {
            return Ok(state);
        }
        let state = self.load_from_disk()?;
        Ok(self.publish(state))
    }

    /// Append vectors and their metadata, persist the result, and return the new ids.
    ///
    /// Ids are `len..len + vectors.len()`. Either both the index and the metadata
    /// store grow and the new generation is on disk, or nothing changes.
    #[inline]
    pub fn add(&self, vectors: &[Vec<f32>], metadata: Vec<ChunkMetadata>) -> Result<Vec<u64>> {
        if vectors.len() != metadata.len() {
            return Err(RagError::InvalidInput(format!(
                "got {} vectors but {} metadata records",
                vectors.len(),
                metadata.len()
            )));
        }
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let base = match self.published() {
            Some(state) => state,
            None if self.persistence.exists() => Arc::new(self.load_from_disk()?),
            None => {
                debug!(
                    "No index at {}, starting a new one",
                    self.persistence.path().display()
                );
                Arc::new(IndexState::empty(self.dimension)?)
            }
        };

        let mut next = IndexState::clone(&base);
        let ids = next.index.add(vectors)?;
        for (id, record) in ids.clone().zip(metadata) {
            next.metadata.insert(id, record);
        }
        next.generation += 1;
        next.ensure_consistent()?;

        self.persistence.save(&next)?;
        let published = self.publish(next);

        info!(
            "Added {} vectors (total {}, generation {})",
            vectors.len(),
            published.len(),
            published.generation
        );
        Ok(ids.collect())
    }

    /// Persist the current snapshot as a new generation
    #[inline]
    pub fn save(&self) -> Result<()> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(current) = self.published() else {
            return Err(RagError::NotFound(crate::Missing::Index));
        };
        let mut next = IndexState::clone(&current);
        next.generation += 1;
        self.persistence.save(&next)?;
        self.publish(next);
        Ok(())
    }

    /// Replace the in-memory snapshot with what is on disk
    #[inline]
    pub fn load(&self) -> Result<Arc<IndexState>> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.load_from_disk()?;
        Ok(self.publish(state))
    }

    /// Nearest neighbors of `query` in the current snapshot
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.snapshot()?.index.search(query, k)
    }

    /// Number of indexed vectors, or 0 when nothing has been persisted
    #[inline]
    pub fn vector_count(&self) -> Result<usize> {
        match self.snapshot() {
            Ok(state) => Ok(state.len()),
            Err(e) if e.is_not_found() && !self.persistence.exists() => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Whether any chunk of the document at `file_path` is indexed
    #[inline]
    pub fn contains_source(&self, file_path: &str) -> Result<bool> {
        match self.snapshot() {
            Ok(state) => Ok(state.metadata.contains_source(file_path)),
            Err(e) if e.is_not_found() && !self.persistence.exists() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
