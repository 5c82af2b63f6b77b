//! Durable storage for an index and its metadata as a matched pair.
//!
//! For an index path `P` a save of generation `N` writes:
//!
//! * `P.gNNNNNN` with the bincode-encoded vectors,
//! * `P.gNNNNNN.meta` with the JSON metadata records,
//! * `P` itself, a small JSON manifest naming generation `N`.
//!
//! Every file goes through temp-write, fsync, rename. The manifest is written
//! last, so its rename is the single step that publishes the new pair; a crash
//! before it leaves the previous generation in place.


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::consistency::ConsistencyReport;
use super::index::FlatIndex;
use super::metadata::MetadataStore;
use crate::{Missing, RagError, Result};

pub const FORMAT_VERSION: u32 = 1;
const METADATA_SUFFIX: &str = ".meta";
const TEMP_SUFFIX: &str = ".tmp";

/// An index and its metadata at a given generation
#[derive(Debug, Clone, PartialEq)]
pub struct IndexState {
    pub generation: u64,
    pub index: FlatIndex,
    pub metadata: MetadataStore,
}

impl IndexState {
    #[inline]
    pub fn empty(dimension: usize) -> Result<Self> {
        Ok(Self {
            generation: 0,
            index: FlatIndex::new(dimension)?,
            metadata: MetadataStore::new(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn consistency(&self) -> ConsistencyReport {
        ConsistencyReport::check(&self.index, &self.metadata)
    }

    /// Fail with [`RagError::InvariantViolation`] unless every vector has exactly one metadata record
    #[inline]
    pub fn ensure_consistent(&self) -> Result<()> {
        let report = self.consistency();
        if report.is_consistent {
            Ok(())
        } else {
            error!("Refusing inconsistent index state: {}", report.summary());
            Err(RagError::InvariantViolation(report.summary()))
        }
    }
}

/// Pointer to the live generation, stored at the index path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub generation: u64,
    pub count: usize,
    pub dimension: usize,
    pub saved_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    generation: u64,
    index: FlatIndex,
}

#[derive(Serialize, Deserialize)]
struct MetadataFile {
    generation: u64,
    records: MetadataStore,
}

/// Reads and writes [`IndexState`] at one index path
#[derive(Debug, Clone)]
pub struct IndexPersistence {
    path: PathBuf,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn not_found_as(err: io::Error, missing: Missing) -> RagError {
    if err.kind() == io::ErrorKind::NotFound {
        RagError::NotFound(missing)
    } else {
        RagError::Io(err)
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = with_suffix(path, TEMP_SUFFIX);

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;

    // Persist the rename itself; not every platform can open a directory.
    if let Some(Ok(dir)) = path.parent().map(File::open) {
        let _ = dir.sync_all();
    }
    Ok(())
}

impl IndexPersistence {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Manifest location
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn index_file(&self, generation: u64) -> PathBuf {
        with_suffix(&self.path, &format!(".g{:06}", generation))
    }

    #[inline]
    pub fn metadata_file(&self, generation: u64) -> PathBuf {
        with_suffix(&self.index_file(generation), METADATA_SUFFIX)
    }

    /// Whether a manifest has ever been published here
    #[inline]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    #[inline]
    pub fn read_manifest(&self) -> Result<Manifest> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| not_found_as(e, Missing::Index))?;
        let manifest: Manifest = serde_json::from_str(&content)?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(RagError::Serialization(format!(
                "unsupported index format version {} (expected {})",
                manifest.format_version, FORMAT_VERSION
            )));
        }
        Ok(manifest)
    }

    /// Write `state` as its generation and publish it
    #[inline]
    pub fn save(&self, state: &IndexState) -> Result<Manifest> {
        state.ensure_consistent()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let index_path = self.index_file(state.generation);
        let index_bytes = bincode::serialize(&IndexFile {
            generation: state.generation,
            index: state.index.clone(),
        })?;
        write_atomically(&index_path, &index_bytes)?;

        let metadata_path = self.metadata_file(state.generation);
        let metadata_bytes = serde_json::to_vec(&MetadataFile {
            generation: state.generation,
            records: state.metadata.clone(),
        })?;
        write_atomically(&metadata_path, &metadata_bytes)?;

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            generation: state.generation,
            count: state.len(),
            dimension: state.index.dimension(),
            saved_at: Utc::now(),
        };
        write_atomically(&self.path, &serde_json::to_vec_pretty(&manifest)?)?;

        info!(
            "Saved index generation {} with {} vectors to {}",
            manifest.generation,
            manifest.count,
            self.path.display()
        );

        self.prune_before(state.generation.saturating_sub(1));
        Ok(manifest)
    }

    /// Load the generation named by the manifest
    #[inline]
    pub fn load(&self) -> Result<IndexState> {
        let state = self.read_live_pair()?;
        state.ensure_consistent()?;

        debug!(
            "Loaded index generation {} with {} vectors from {}",
            state.generation,
            state.len(),
            self.path.display()
        );
        Ok(state)
    }

    /// Read the live pair for diagnostics, reporting rather than refusing an
    /// id mismatch between vectors and metadata. Disagreement with the manifest
    /// still fails as in [`IndexPersistence::load`].
    #[inline]
    pub fn inspect(&self) -> Result<(IndexState, ConsistencyReport)> {
        let state = self.read_live_pair()?;
        let report = state.consistency();
        Ok((state, report))
    }

    fn read_live_pair(&self) -> Result<IndexState> {
        let manifest = self.read_manifest()?;

        let index_bytes = fs::read(self.index_file(manifest.generation))
            .map_err(|e| not_found_as(e, Missing::Index))?;
        let index_file: IndexFile = bincode::deserialize(&index_bytes)?;

        let metadata_bytes = fs::read(self.metadata_file(manifest.generation))
            .map_err(|e| not_found_as(e, Missing::Metadata))?;
        let metadata_file: MetadataFile = serde_json::from_slice(&metadata_bytes)?;

        if index_file.generation != manifest.generation
            || metadata_file.generation != manifest.generation
        {
            return Err(self.violation(format!(
                "generation mismatch: manifest {}, index {}, metadata {}",
                manifest.generation, index_file.generation, metadata_file.generation
            )));
        }
        if index_file.index.dimension() != manifest.dimension || manifest.dimension == 0 {
            return Err(self.violation(format!(
                "dimension mismatch: manifest {}, index {}",
                manifest.dimension,
                index_file.index.dimension()
            )));
        }
        if index_file.index.len() != manifest.count {
            return Err(self.violation(format!(
                "count mismatch: manifest {}, index {}",
                manifest.count,
                index_file.index.len()
            )));
        }

        Ok(IndexState {
            generation: manifest.generation,
            index: index_file.index,
            metadata: metadata_file.records,
        })
    }

    fn violation(&self, detail: String) -> RagError {
        error!("Persisted index at {} is corrupt: {}", self.path.display(), detail);
        RagError::InvariantViolation(detail)
    }

    /// Generations with files beside the manifest, ascending
    #[inline]
    pub fn stored_generations(&self) -> Result<Vec<u64>> {
        let (Some(dir), Some(stem)) = (self.path.parent(), self.path.file_name()) else {
            return Ok(Vec::new());
        };
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        let prefix = format!("{}.g", stem.to_string_lossy());

        let mut generations: Vec<u64> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let rest = name.strip_prefix(&prefix)?;
                let digits = rest.strip_suffix(METADATA_SUFFIX).unwrap_or(rest);
                digits.parse::<u64>().ok()
            })
            .collect();
        generations.sort_unstable();
        generations.dedup();
        Ok(generations)
    }

    /// Best-effort removal of generations older than `keep_from`
    fn prune_before(&self, keep_from: u64) {
        let generations = match self.stored_generations() {
            Ok(generations) => generations,
            Err(e) => {
                warn!("Could not list old index generations: {}", e);
                return;
            }
        };

        for generation in generations.into_iter().filter(|g| *g < keep_from) {
            for path in [self.index_file(generation), self.metadata_file(generation)] {
                match fs::remove_file(&path) {
                    Err(e) if e.kind() != io::ErrorKind::NotFound => {
                        warn!("Failed to remove {}: {}", path.display(), e);
                    }
                    _ => {}
                }
            }
            debug!("Pruned index generation {}", generation);
        }
    }
}
