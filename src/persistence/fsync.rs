//! Low-level fsync operations for durability.
//!
//! The petition document is rewritten wholesale on every mutation; both the
//! file and its directory entry must be synced for the write to survive a
//! power loss.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Syncs a file's contents and metadata to disk.
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory to disk, ensuring directory entries are durable.
///
/// Required after a rename: without this the renamed file may revert to its
/// old name on power loss even though its contents were synced.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}
