// Consistency validation between the vector index and its metadata store


use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::index::FlatIndex;
use super::metadata::MetadataStore;

/// Result of comparing an index with its metadata store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Number of vectors in the index
    pub vector_count: usize,
    /// Number of metadata records
    pub metadata_count: usize,
    /// Vector ids with no metadata record
    pub missing_metadata: Vec<u64>,
    /// Metadata ids with no vector behind them
    pub orphaned_metadata: Vec<u64>,
    pub is_consistent: bool,
}

impl ConsistencyReport {
    #[inline]
    pub fn check(index: &FlatIndex, metadata: &MetadataStore) -> Self {
        let vector_count = index.len();
        let known: BTreeSet<u64> = metadata.ids().collect();

        let missing_metadata: Vec<u64> = (0..vector_count as u64)
            .filter(|id| !known.contains(id))
            .collect();
        let orphaned_metadata: Vec<u64> = known
            .range(vector_count as u64..)
            .copied()
            .collect();

        let is_consistent = missing_metadata.is_empty()
            && orphaned_metadata.is_empty()
            && vector_count == metadata.len();

        let report = Self {
            vector_count,
            metadata_count: metadata.len(),
            missing_metadata,
            orphaned_metadata,
            is_consistent,
        };

        if report.is_consistent {
            debug!("{}", report.summary());
        } else {
            warn!("{}", report.summary());
        }

        report
    }

    /// Get a human-readable summary of the consistency report
    #[inline]
    pub fn summary(&self) -> String {
        if self.is_consistent {
            format!(
                "Index is consistent: {} vectors, {} metadata records",
                self.vector_count, self.metadata_count
            )
        } else {
            format!(
                "Index inconsistencies found: {} vectors without metadata, {} orphaned metadata records ({} vectors, {} records)",
                self.missing_metadata.len(),
                self.orphaned_metadata.len(),
                self.vector_count,
                self.metadata_count
            )
        }
    }

    /// Get the total number of consistency issues
    #[inline]
    pub fn total_issues(&self) -> usize {
        self.missing_metadata.len() + self.orphaned_metadata.len()
    }
}
