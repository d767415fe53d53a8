use parking_lot::RwLock;

use super::RecordStorage;
use crate::types::GenerationRecord;

/// In-memory record storage (the default).
pub struct MemoryStorage {
    records: RwLock<Vec<GenerationRecord>>,
}

impl MemoryStorage {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Creates an in-memory store pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: Vec<GenerationRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// The most recent record, if any.
    #[must_use]
    pub fn last(&self) -> Option<GenerationRecord> {
        self.records.read().last().cloned()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStorage for MemoryStorage {
    fn push(&self, record: GenerationRecord) {
        self.records.write().push(record);
    }

    fn records(&self) -> Vec<GenerationRecord> {
        self.records.read().clone()
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}
