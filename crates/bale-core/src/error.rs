//! Error types for bale-core

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for the bale library
#[derive(Error, Debug)]
pub enum Error {
    /// Glob pattern is syntactically malformed
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending pattern as given by the caller
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Filesystem traversal failed while enumerating entries
    #[error("walk failed at {path:?}: {source}")]
    Walk {
        /// The path that could not be read
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Compression, decompression, or container stream failure
    #[error("codec error: {0}")]
    Codec(String),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive entry path would escape the restore directory
    #[error("refusing to restore unsafe path {0:?}")]
    UnsafePath(PathBuf),

    /// Configuration file could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap a decode/encode-side failure as a codec error.
    pub(crate) fn codec(err: impl std::fmt::Display) -> Self {
        Error::Codec(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
