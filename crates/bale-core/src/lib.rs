//! Bale - a streaming build-artifact archiver library
//!
//! Expands glob patterns into filesystem roots, walks them depth-first, and
//! streams every entry through a compressed container into a single archive
//! file; the inverse restores that file to disk preserving paths,
//! permissions, and timestamps. Memory use stays bounded by the largest
//! single file, never by the archive as a whole.

pub mod archive;
pub mod codec;
pub mod config;
pub mod container;
pub mod diag;
pub mod entry;
pub mod error;
pub mod pattern;
pub mod utils;
pub mod walk;

pub use error::{Error, Result};

// Re-export commonly used types
pub use archive::{archive, restore, Archiver};
pub use codec::CompressionCodec;
pub use config::Config;
pub use container::{ContainerReader, ContainerWriter};
pub use diag::{DiagnosticEvent, DiagnosticsSink, MemoryMonitor, MemoryUsage, NullSink};
pub use entry::{EntryHeader, EntryKind};
pub use pattern::{expand_pattern, expand_patterns};
pub use walk::{walk, FilesystemEntry};
