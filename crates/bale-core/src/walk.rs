//! Filesystem traversal

use crate::{Error, Result};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A filesystem node discovered during a walk
///
/// Created transiently while walking and consumed immediately by the
/// archive pipeline; never persisted.
#[derive(Debug)]
pub struct FilesystemEntry {
    /// Path of the node as discovered
    pub path: PathBuf,
    /// Metadata read at discovery time
    pub metadata: Metadata,
}

/// Walk `root` depth-first in pre-order, yielding the root itself first
///
/// Siblings are visited in file-name order, so discovery order is
/// deterministic. If `root` is a file, exactly one entry is yielded.
/// Symlinks are not followed. The walk is lazy, single-pass, and not
/// restartable; a failure reading any entry or its metadata aborts the
/// remainder of the traversal with [`Error::Walk`]. Entries already
/// yielded are not rolled back.
pub fn walk(root: &Path) -> impl Iterator<Item = Result<FilesystemEntry>> {
    let root = root.to_path_buf();

    WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .map(move |entry| match entry {
            Ok(entry) => {
                let path = entry.path().to_path_buf();
                match entry.metadata() {
                    Ok(metadata) => Ok(FilesystemEntry { path, metadata }),
                    Err(err) => Err(walk_error(path, err)),
                }
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.clone());
                Err(walk_error(path, err))
            }
        })
}

fn walk_error(path: PathBuf, err: walkdir::Error) -> Error {
    Error::Walk {
        path,
        source: err.into(),
    }
}
