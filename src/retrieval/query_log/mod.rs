
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::Result;

/// One chunk returned for a logged query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedChunk {
    pub id: u64,
    pub file_path: String,
    pub relevance: f32,
}

/// A completed retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub query: String,
    pub timestamp: DateTime<Utc>,
    /// Wall-clock time spent in retrieval, in milliseconds
    pub response_time_ms: f64,
    pub results: Vec<LoggedChunk>,
}

/// Receives an entry for every completed retrieval
pub trait QueryLog: Send + Sync {
    fn record(&self, entry: &QueryLogEntry) -> Result<()>;
}

/// Discards entries
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopQueryLog;

impl QueryLog for NoopQueryLog {
    #[inline]
    fn record(&self, _entry: &QueryLogEntry) -> Result<()> {
        Ok(())
    }
}

/// Keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryQueryLog {
    entries: Mutex<Vec<QueryLogEntry>>,
}

impl MemoryQueryLog {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn entries(&self) -> Vec<QueryLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl QueryLog for MemoryQueryLog {
    #[inline]
    fn record(&self, entry: &QueryLogEntry) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}

/// Appends entries as JSON lines
#[derive(Debug)]
pub struct JsonlQueryLog {
    path: PathBuf,
    writer: Mutex<()>,
}

impl JsonlQueryLog {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every entry in the log; a missing file is an empty log
    #[inline]
    pub fn read_all(&self) -> Result<Vec<QueryLogEntry>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}

impl QueryLog for JsonlQueryLog {
    #[inline]
    fn record(&self, entry: &QueryLogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
