//! Persistence layer for the petition system.
//!
//! One JSON document maps anchor message IDs to petition records, rewritten
//! wholesale on every mutation. Two mechanisms close the read-modify-write
//! race of a naive flat-file store:
//!
//! - a process-wide async mutex: every mutation goes through
//!   [`PetitionStore::update`], which holds the lock across the read, the
//!   mutation, and the save;
//! - atomic writes: temp file, fsync, rename over the target, fsync the
//!   directory. Readers always see either the old or the new document.
//!
//! The in-memory copy under the mutex is the source of truth while the
//! process runs; the file exists for restarts.

pub mod document;
pub mod fsync;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::types::{MessageId, Petition};

pub use document::{PetitionDocument, SCHEMA_VERSION};
pub use fsync::{fsync_dir, fsync_file};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema version mismatch.
    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable store for the petition document.
pub struct PetitionStore {
    path: PathBuf,
    document: Mutex<PetitionDocument>,
}

impl PetitionStore {
    /// Opens the store, loading the document if the file exists.
    ///
    /// A missing file yields an empty document. A document written by a
    /// different schema version is rejected rather than silently migrated.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let document = match std::fs::read(&path) {
            Ok(bytes) => {
                let doc: PetitionDocument = serde_json::from_slice(&bytes)?;
                if doc.schema_version != SCHEMA_VERSION {
                    return Err(StoreError::SchemaMismatch {
                        expected: SCHEMA_VERSION,
                        got: doc.schema_version,
                    });
                }
                doc
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => PetitionDocument::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(PetitionStore {
            path,
            document: Mutex::new(document),
        })
    }

    /// Runs a mutation inside the store's critical section and saves the
    /// document atomically before releasing the lock.
    ///
    /// The mutation is staged on a copy and only committed to the in-memory
    /// document once the save succeeds, so a write failure never leaves
    /// memory ahead of disk.
    pub async fn update<R>(&self, f: impl FnOnce(&mut PetitionDocument) -> R) -> Result<R> {
        let mut doc = self.document.lock().await;
        let mut staged = doc.clone();
        let result = f(&mut staged);
        staged.updated_at = chrono::Utc::now();
        save_atomic(&self.path, &staged)?;
        *doc = staged;
        Ok(result)
    }

    /// Runs a read-only closure against the document.
    pub async fn read<R>(&self, f: impl FnOnce(&PetitionDocument) -> R) -> R {
        let doc = self.document.lock().await;
        f(&doc)
    }

    /// Convenience: a cloned snapshot of one petition.
    pub async fn get(&self, id: MessageId) -> Option<Petition> {
        self.read(|doc| doc.get(id).cloned()).await
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Saves the document atomically: temp file, fsync, rename, directory fsync.
fn save_atomic(path: &Path, document: &PetitionDocument) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(document)?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        fsync_file(&file)?;
    }

    std::fs::rename(&tmp_path, path)?;

    if let Some(parent) = path.parent() {
        fsync_dir(parent)?;
    }

    Ok(())
}
