//! JSON-lines result store.
//!
//! One record per line, appended and synced after every write. Reopening an
//! existing file continues it.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::{ResultSink, SinkError};
use crate::types::ResultRecord;

/// Append-only JSONL file sink.
#[derive(Debug)]
pub struct JsonlResultSink {
    path: PathBuf,
    file: File,
}

impl JsonlResultSink {
    /// Open `path` for appending, creating it and its parent directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let io = |source| SinkError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io)?;
        Ok(Self { path, file })
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonlResultSink {
    fn append(&mut self, record: &ResultRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let write = |file: &mut File| -> std::io::Result<()> {
            file.write_all(&line)?;
            file.flush()?;
            file.sync_data()
        };
        write(&mut self.file).map_err(|source| SinkError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Read every record from a JSONL result store.
///
/// Blank lines are ignored. Lines that do not parse (a write torn by a
/// crash) are skipped with a warning. A missing file reads as empty.
pub fn read_results(path: impl AsRef<Path>) -> Result<Vec<ResultRecord>, SinkError> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(SinkError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ResultRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), line = index + 1, error = %e, "skipping unreadable result");
            }
        }
    }
    Ok(records)
}
