//! In-memory result sink.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{ResultSink, SinkError};
use crate::types::ResultRecord;

/// Sink that keeps records in memory.
///
/// Clones share the same buffer, so a test can hand one clone to the
/// frontier and inspect another. Can be told to reject every write.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<ResultRecord>>>,
    failing: bool,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every append fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Snapshot of the stored records.
    pub fn records(&self) -> Vec<ResultRecord> {
        self.records.lock().clone()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing was stored.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ResultSink for MemorySink {
    fn append(&mut self, record: &ResultRecord) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::Io {
                path: "<memory>".into(),
                source: std::io::Error::other("sink rejects writes"),
            });
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}
