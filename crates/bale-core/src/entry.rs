//! Archive entry metadata

use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of filesystem entry represented in the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file, carries a content block
    File,
    /// Directory, no content block
    Directory,
    /// Anything else (symlink, device, fifo), no content block
    Other,
}

/// Metadata record for one entry in the container stream
///
/// The header always precedes the entry's content bytes in the stream;
/// only [`EntryKind::File`] entries carry content, so `size` is zero for
/// every other kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryHeader {
    /// Path within the archive (relative to the archive root)
    pub path: PathBuf,
    /// Entry type tag
    pub kind: EntryKind,
    /// Content size in bytes (regular files only)
    pub size: u64,
    /// Unix permission bits (if available)
    pub mode: Option<u32>,
    /// Modification time (Unix timestamp, seconds)
    pub mtime: Option<i64>,
    /// Access time (Unix timestamp, seconds)
    pub atime: Option<i64>,
}

impl EntryHeader {
    /// Build a header from filesystem metadata
    pub fn from_metadata(path: impl Into<PathBuf>, metadata: &Metadata) -> Self {
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else if metadata.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        Self {
            path: path.into(),
            kind,
            size: if kind == EntryKind::File { metadata.len() } else { 0 },
            mode: permission_bits(metadata),
            mtime: metadata.modified().ok().and_then(unix_seconds),
            atime: metadata.accessed().ok().and_then(unix_seconds),
        }
    }

    /// Whether this entry is a regular file
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Whether this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> Option<u32> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.mode() & 0o7777)
}

#[cfg(not(unix))]
fn permission_bits(_metadata: &Metadata) -> Option<u32> {
    None
}

fn unix_seconds(time: SystemTime) -> Option<i64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|duration| duration.as_secs() as i64)
}
