//! Snapshot Module
//!
//! The sink a cache writes its contents to when it is closed. The format is
//! up to the sink; [`JsonFileSink`] writes a single JSON document.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// == Snapshot Entry ==
/// A single cache entry as written to a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry<V> {
    pub key: String,
    pub value: V,
    /// Wall-clock expiry, None = never expires
    pub expires_at: Option<DateTime<Utc>>,
}

// == Snapshot ==
/// Point-in-time copy of a cache's contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<V> {
    /// Name of the cache the snapshot was taken from
    pub name: String,
    pub written_at: DateTime<Utc>,
    pub entries: Vec<SnapshotEntry<V>>,
}

impl<V> Snapshot<V> {
    pub fn new(name: impl Into<String>, entries: Vec<SnapshotEntry<V>>) -> Self {
        Self {
            name: name.into(),
            written_at: Utc::now(),
            entries,
        }
    }
}

// == Snapshot Sink ==
/// Destination for the snapshot written on close.
///
/// Called at most once per cache, after the sweep task has stopped and
/// without the cache lock held.
pub trait SnapshotSink<V>: Send + Sync {
    fn write(&self, snapshot: &Snapshot<V>) -> Result<()>;
}

// == JSON File Sink ==
/// Writes the snapshot as pretty-printed JSON to a file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<V: Serialize> SnapshotSink<V> for JsonFileSink {
    fn write(&self, snapshot: &Snapshot<V>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.flush()?;
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_json_sink_writes_snapshot() {
        let dir = tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("nested").join("sink.json"));
        let snapshot = Snapshot::new(
            "sink",
            vec![SnapshotEntry {
                key: "a".to_string(),
                value: "one".to_string(),
                expires_at: None,
            }],
        );

        sink.write(&snapshot).unwrap();

        let written: Snapshot<String> =
            serde_json::from_reader(File::open(sink.path()).unwrap()).unwrap();
        assert_eq!(written, snapshot);
    }

    #[test]
    fn test_json_sink_reports_io_error() {
        // A directory cannot be opened as a file
        let dir = tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());
        let snapshot: Snapshot<i32> = Snapshot::new("dir", Vec::new());

        let result = sink.write(&snapshot);
        assert!(matches!(result, Err(crate::error::CacheError::Io(_))));
    }
}
