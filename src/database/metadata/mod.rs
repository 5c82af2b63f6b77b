#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What is known about the chunk behind a vector id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Stable key of the source document
    pub file_path: String,
    pub title: String,
    /// Position of the chunk within its document
    pub chunk_index: usize,
    pub text: String,
}

/// Vector id to chunk metadata. Replaced wholesale on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataStore {
    records: BTreeMap<u64, ChunkMetadata>,
}

impl MetadataStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, id: u64) -> Option<&ChunkMetadata> {
        self.records.get(&id)
    }

    #[inline]
    pub fn insert(&mut self, id: u64, metadata: ChunkMetadata) -> Option<ChunkMetadata> {
        self.records.insert(id, metadata)
    }

    #[inline]
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.records.keys().copied()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (u64, &ChunkMetadata)> + '_ {
        self.records.iter().map(|(id, metadata)| (*id, metadata))
    }

    /// Whether any chunk of the document at `file_path` has been indexed
    #[inline]
    pub fn contains_source(&self, file_path: &str) -> bool {
        self.records.values().any(|m| m.file_path == file_path)
    }

    /// Distinct document paths, sorted
    #[inline]
    pub fn sources(&self) -> BTreeSet<&str> {
        self.records
            .values()
            .map(|m| m.file_path.as_str())
            .collect()
    }
}

impl FromIterator<(u64, ChunkMetadata)> for MetadataStore {
    #[inline]
    fn from_iter<I: IntoIterator<Item = (u64, ChunkMetadata)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
