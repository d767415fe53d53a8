//! JSONL-based journal of generation records.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;

use super::{MemoryStorage, RecordStorage};
use crate::types::GenerationRecord;

/// A storage backend that appends generation records as JSON lines.
///
/// Records are kept in memory for fast reads and simultaneously appended
/// to a JSONL file under an exclusive file lock.
///
/// # Examples
///
/// ```no_run
/// use enkf_optimizer::storage::JournalStorage;
///
/// let storage = JournalStorage::new("generations.jsonl");
/// ```
pub struct JournalStorage {
    memory: MemoryStorage,
    path: PathBuf,
    /// Serialise in-process writes so we only hold the file lock briefly.
    write_lock: Mutex<()>,
}

impl JournalStorage {
    /// Creates a journal writing to `path`.
    ///
    /// The file is created on the first write. Existing records are not
    /// loaded; use [`JournalStorage::open`] for that.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            memory: MemoryStorage::new(),
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Opens an existing journal and loads its records.
    ///
    /// A missing file yields an empty storage.
    ///
    /// # Errors
    ///
    /// Returns a [`Storage`](crate::Error::Storage) error if the file
    /// exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = load_records(&path)?;
        Ok(Self {
            memory: MemoryStorage::with_records(records),
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_to_file(&self, record: &GenerationRecord) -> crate::Result<()> {
        let _guard = self.write_lock.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(storage_error)?;

        file.lock_exclusive().map_err(storage_error)?;

        let line = serde_json::to_string(record).map_err(storage_error)?;
        writeln!(file, "{line}").map_err(storage_error)?;
        file.flush().map_err(storage_error)?;

        file.unlock().map_err(storage_error)?;
        Ok(())
    }
}

impl RecordStorage for JournalStorage {
    fn push(&self, record: GenerationRecord) {
        // Best-effort persist; the record stays in memory regardless.
        if let Err(_e) = self.write_to_file(&record) {
            trace_info!(error = %_e, path = %self.path.display(), "failed to append generation record");
        }
        self.memory.push(record);
    }

    fn records(&self) -> Vec<GenerationRecord> {
        self.memory.records()
    }

    fn len(&self) -> usize {
        self.memory.len()
    }
}

fn storage_error(e: impl ToString) -> crate::Error {
    crate::Error::Storage(e.to_string())
}

/// Read all records from a JSONL file. A missing file yields no records.
fn load_records(path: &Path) -> crate::Result<Vec<GenerationRecord>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(storage_error(e)),
    };

    file.lock_shared().map_err(storage_error)?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(storage_error)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        records.push(serde_json::from_str(line).map_err(storage_error)?);
    }

    file.unlock().map_err(storage_error)?;
    Ok(records)
}
