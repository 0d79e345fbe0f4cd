//! Container stream writer and reader
//!
//! The container is a GNU tar record stream: an ordered sequence of
//! (header, content) records terminated by an explicit end-of-stream
//! marker, with no random-access index. Stored paths use forward-slash
//! separators regardless of host OS, each header precedes its content
//! bytes, and directories carry no content block. Entries must be written
//! and read strictly sequentially, in the same order.

use crate::entry::{EntryHeader, EntryKind};
use crate::{Error, Result};
use std::io::{self, Read, Write};
use tar::{Archive, Builder, EntryType, Header};

/// Serializes (header, content) pairs into a container stream
///
/// Single writer, sequential use: entries are appended in discovery order
/// and [`ContainerWriter::finish`] must be called exactly once to write
/// the end-of-stream marker.
pub struct ContainerWriter<W: Write> {
    builder: Builder<W>,
}

impl<W: Write> ContainerWriter<W> {
    /// Create a writer emitting the container stream into `dest`
    pub fn new(dest: W) -> Self {
        Self {
            builder: Builder::new(dest),
        }
    }

    /// Append one entry: its header, then its content streamed from `content`
    ///
    /// Regular files must supply a content source whose length matches
    /// `header.size`; the content is copied through a fixed-size buffer,
    /// never held in memory whole. Directories carry no content. Entries
    /// of kind [`EntryKind::Other`] cannot be written.
    pub fn append(&mut self, header: &EntryHeader, content: Option<&mut dyn Read>) -> Result<()> {
        let mut tar_header = Header::new_gnu();
        tar_header.set_entry_type(entry_type(header.kind)?);
        tar_header.set_size(header.size);
        tar_header.set_mode(header.mode.unwrap_or(default_mode(header.kind)));
        tar_header.set_mtime(header.mtime.unwrap_or(0).max(0) as u64);
        if let Some(gnu) = tar_header.as_gnu_mut() {
            gnu.set_atime(header.atime.unwrap_or(0).max(0) as u64);
        }

        match content {
            Some(reader) => {
                self.builder
                    .append_data(&mut tar_header, &header.path, reader)?
            }
            None if header.kind == EntryKind::File => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("file entry {:?} appended without content", header.path),
                )));
            }
            None => self
                .builder
                .append_data(&mut tar_header, &header.path, io::empty())?,
        }

        Ok(())
    }

    /// Write the end-of-stream marker, flush, and return the inner writer
    pub fn finish(self) -> Result<W> {
        Ok(self.builder.into_inner()?)
    }
}

/// Deserializes a container stream back into (header, content) pairs
pub struct ContainerReader<R: Read> {
    archive: Archive<R>,
}

impl<R: Read> ContainerReader<R> {
    /// Create a reader consuming the container stream from `source`
    pub fn new(source: R) -> Self {
        Self {
            archive: Archive::new(source),
        }
    }

    /// Iterate entries lazily, in write order
    ///
    /// The iterator ends at the end-of-stream marker. Each entry's content
    /// must be fully consumed before advancing; once the iterator moves on,
    /// the previous entry's content reader is invalid.
    pub fn entries(&mut self) -> Result<ContainerEntries<'_, R>> {
        let inner = self.archive.entries().map_err(Error::codec)?;
        Ok(ContainerEntries { inner })
    }
}

/// Lazy iterator over the entries of a container stream
pub struct ContainerEntries<'a, R: 'a + Read> {
    inner: tar::Entries<'a, R>,
}

impl<'a, R: Read> Iterator for ContainerEntries<'a, R> {
    type Item = Result<ContainerEntry<'a, R>>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        Some(
            entry
                .map(|inner| ContainerEntry { inner })
                .map_err(Error::codec),
        )
    }
}

/// One entry of the container stream: a decoded header plus a content reader
pub struct ContainerEntry<'a, R: 'a + Read> {
    inner: tar::Entry<'a, R>,
}

impl<'a, R: Read> ContainerEntry<'a, R> {
    /// Decode this entry's metadata header
    pub fn header(&self) -> Result<EntryHeader> {
        let path = self.inner.path().map_err(Error::codec)?.into_owned();
        let header = self.inner.header();
        let entry_type = header.entry_type();

        let kind = if entry_type.is_dir() {
            EntryKind::Directory
        } else if entry_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        Ok(EntryHeader {
            path,
            kind,
            size: header.size().map_err(Error::codec)?,
            mode: header.mode().ok(),
            mtime: header.mtime().ok().map(|secs| secs as i64),
            atime: header
                .as_gnu()
                .and_then(|gnu| gnu.atime().ok())
                .map(|secs| secs as i64),
        })
    }
}

impl<'a, R: Read> Read for ContainerEntry<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

fn entry_type(kind: EntryKind) -> Result<EntryType> {
    match kind {
        EntryKind::File => Ok(EntryType::Regular),
        EntryKind::Directory => Ok(EntryType::Directory),
        EntryKind::Other => Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "special files cannot be written to the container",
        ))),
    }
}

fn default_mode(kind: EntryKind) -> u32 {
    match kind {
        EntryKind::Directory => 0o755,
        _ => 0o644,
    }
}
