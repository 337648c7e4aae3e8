//! Result sinks.

pub mod jsonl;
pub mod memory;

use std::path::PathBuf;

use crate::types::ResultRecord;

/// Error type for result persistence.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// I/O on the backing file failed.
    #[error("Result store I/O failed for {path}: {source}")]
    Io {
        /// Store path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Serializing a record failed.
    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Trait for result sinks.
///
/// Sinks are append-only. A record handed to `append` must be durable once
/// the call returns `Ok`.
pub trait ResultSink: Send {
    /// Append one record.
    fn append(&mut self, record: &ResultRecord) -> Result<(), SinkError>;
}

pub use jsonl::{read_results, JsonlResultSink};
pub use memory::MemorySink;
