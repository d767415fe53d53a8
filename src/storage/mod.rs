//! Generation record storage backends.
//!
//! The optimizer appends one [`GenerationRecord`] per processed generation
//! through the [`RecordStorage`] trait. Records are write-once and
//! append-only.
//!
//! # Available backends
//!
//! | Backend | Description | Feature flag |
//! |---------|-------------|-------------|
//! | [`MemoryStorage`] | In-memory `Vec` behind a read-write lock (the default) | none |
//! | `JournalStorage` | JSONL file with `fs2` file locking | `journal` |
//!
//! Hand the optimizer an `Arc` to keep a handle on the records:
//!
//! ```
//! use std::sync::Arc;
//!
//! use enkf_optimizer::prelude::*;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let config = EnkfConfig::default().pop_size(2).n_iteration(1).observations(vec![1.0]);
//! let mut opt = EnkfOptimizer::builder(config)
//!     .storage(Arc::clone(&storage))
//!     .build(|| Individual::new().with("x", 0.5))
//!     .unwrap();
//!
//! opt.tell(&[0.0, 1.0]).unwrap();
//! assert_eq!(storage.records().len(), 1);
//! ```

#[cfg(feature = "journal")]
mod journal;
mod memory;

use std::sync::Arc;

#[cfg(feature = "journal")]
pub use journal::JournalStorage;
pub use memory::MemoryStorage;

use crate::types::GenerationRecord;

/// Trait for persisting per-generation records.
///
/// Implementations must be `Send + Sync` so a storage handle can be shared
/// with the harness that drives the run.
pub trait RecordStorage: Send + Sync {
    /// Append a record.
    fn push(&self, record: GenerationRecord);

    /// All records in insertion order.
    fn records(&self) -> Vec<GenerationRecord>;

    /// Number of stored records.
    fn len(&self) -> usize {
        self.records().len()
    }

    /// Returns `true` if nothing has been stored yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: RecordStorage + ?Sized> RecordStorage for Arc<S> {
    fn push(&self, record: GenerationRecord) {
        (**self).push(record);
    }

    fn records(&self) -> Vec<GenerationRecord> {
        (**self).records()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
