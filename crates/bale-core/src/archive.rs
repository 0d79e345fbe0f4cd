//! Archive and restore orchestration

use crate::codec::CompressionCodec;
use crate::container::{ContainerReader, ContainerWriter};
use crate::diag::{DiagnosticEvent, DiagnosticsSink, MemoryMonitor, NullSink};
use crate::entry::{EntryHeader, EntryKind};
use crate::pattern;
use crate::utils::human_bytes;
use crate::walk;
use crate::{Error, Result};
use filetime::FileTime;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Archive everything matched by `patterns` into `destination` with default settings
pub fn archive<P: AsRef<Path>, S: AsRef<str>>(destination: P, patterns: &[S]) -> Result<()> {
    Archiver::new().archive(destination, patterns)
}

/// Restore `source` onto the filesystem with default settings
pub fn restore<P: AsRef<Path>>(source: P) -> Result<()> {
    Archiver::new().restore(source)
}

/// Drives the archive/restore pipeline
///
/// One logical thread of control end to end; the only concurrency is the
/// worker pool inside the compression codec.
pub struct Archiver {
    codec: CompressionCodec,
    diagnostics: Box<dyn DiagnosticsSink>,
    working_dir: Option<PathBuf>,
    sample_memory: bool,
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Archiver {
    pub fn new() -> Self {
        Self {
            codec: CompressionCodec::default(),
            diagnostics: Box::new(NullSink),
            working_dir: None,
            sample_memory: false,
        }
    }

    /// Use a specific compression configuration
    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Inject a diagnostics sink receiving structured pipeline events
    pub fn with_diagnostics(mut self, sink: Box<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Resolve patterns and materialize entries beneath `dir`
    ///
    /// Stored paths become relative to `dir` (the `tar -C` convention).
    /// Without this, patterns resolve against the process working directory
    /// and paths are stored exactly as matched.
    pub fn with_working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Emit a process memory snapshot event per processed entry
    pub fn with_memory_sampling(mut self, enabled: bool) -> Self {
        self.sample_memory = enabled;
        self
    }

    /// Pack everything matched by `patterns` into a single compressed archive
    ///
    /// The stream is staged in a temporary file beside `destination` and
    /// moved into place by rename once complete, so a failed run never
    /// leaves a partial archive at the destination path. The finished file
    /// is chmod'ed world-open; callers wanting stricter bits re-chmod.
    pub fn archive<P: AsRef<Path>, S: AsRef<str>>(
        &mut self,
        destination: P,
        patterns: &[S],
    ) -> Result<()> {
        let destination = destination.as_ref();
        let start = Instant::now();
        info!("Archiving into {:?}", destination);

        let roots = self.expand_roots(patterns)?;

        let staging_dir = destination
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let staging = NamedTempFile::new_in(staging_dir)?;
        let encoder = self.codec.encoder(staging)?;
        let mut writer = ContainerWriter::new(encoder);
        let mut monitor = self.sample_memory.then(MemoryMonitor::new);

        let mut entries = 0usize;
        for root in &roots {
            for entry in walk::walk(root) {
                let entry = entry?;
                let stored = self.stored_path(&entry.path)?;
                let header = EntryHeader::from_metadata(stored, &entry.metadata);

                if header.kind == EntryKind::Other {
                    warn!("Skipping special file: {:?}", entry.path);
                    continue;
                }

                info!("Adding: {:?}", entry.path);
                if header.kind == EntryKind::File {
                    // handle scoped to this entry; closed before the next one opens
                    let mut file = File::open(&entry.path)?;
                    writer.append(&header, Some(&mut file))?;
                } else {
                    writer.append(&header, None)?;
                }

                self.diagnostics.event(DiagnosticEvent::EntryArchived {
                    path: &header.path,
                    size: header.size,
                });
                if let Some(monitor) = monitor.as_mut() {
                    self.diagnostics
                        .event(DiagnosticEvent::MemorySampled(monitor.sample()));
                }
                entries += 1;
            }
        }

        let encoder = writer.finish()?;
        let staging = encoder.finish().map_err(Error::codec)?;
        staging
            .persist(destination)
            .map_err(|err| Error::Io(err.error))?;
        set_world_open(destination)?;

        let bytes_written = fs::metadata(destination)?.len();
        let elapsed = start.elapsed();
        self.diagnostics.event(DiagnosticEvent::ArchiveFinished {
            bytes_written,
            elapsed,
        });
        info!(
            "Archived {} entries ({}) in {:?}",
            entries,
            human_bytes(bytes_written),
            elapsed
        );
        Ok(())
    }

    /// Unpack `source`, materializing every entry on the filesystem
    ///
    /// Missing parent directories are created, existing files are truncated
    /// and overwritten, and each file's original permission bits and
    /// access/modification times are applied after its content is written.
    /// The first failure aborts the whole restore.
    pub fn restore<P: AsRef<Path>>(&mut self, source: P) -> Result<()> {
        let source = source.as_ref();
        let start = Instant::now();
        info!("Restoring {:?}", source);

        let file = File::open(source)?;
        let decoder = self.codec.decoder(file)?;
        let mut reader = ContainerReader::new(decoder);
        let mut entries = reader.entries()?;

        let mut restored = 0usize;
        while let Some(entry) = entries.next() {
            let mut entry = entry?;
            let header = entry.header()?;
            let target = self.restore_target(&header.path)?;

            match header.kind {
                EntryKind::Directory => {
                    debug!("Creating directory: {:?}", target);
                    fs::create_dir_all(&target)?;
                }
                EntryKind::File => {
                    debug!("Restoring file: {:?}", target);
                    if let Some(parent) = target
                        .parent()
                        .filter(|dir| !dir.as_os_str().is_empty())
                    {
                        fs::create_dir_all(parent)?;
                    }
                    write_file_contents(&mut entry, &target)?;
                    apply_metadata(&target, &header);
                }
                EntryKind::Other => {
                    warn!("Skipping unsupported entry: {:?}", header.path);
                    continue;
                }
            }

            self.diagnostics
                .event(DiagnosticEvent::EntryRestored { path: &header.path });
            restored += 1;
        }

        let elapsed = start.elapsed();
        self.diagnostics
            .event(DiagnosticEvent::RestoreFinished { elapsed });
        info!(
            "Restored {} entries from {:?} in {:?}",
            restored, source, elapsed
        );
        Ok(())
    }

    /// Scan `source` sequentially and return every entry header, in order
    ///
    /// Content blocks are skipped in stream order; nothing touches the
    /// filesystem and no random access is performed.
    pub fn list<P: AsRef<Path>>(&mut self, source: P) -> Result<Vec<EntryHeader>> {
        let source = source.as_ref();
        debug!("Listing {:?}", source);

        let file = File::open(source)?;
        let decoder = self.codec.decoder(file)?;
        let mut reader = ContainerReader::new(decoder);

        let mut headers = Vec::new();
        let mut entries = reader.entries()?;
        while let Some(entry) = entries.next() {
            headers.push(entry?.header()?);
        }

        info!("Found {} entries in archive", headers.len());
        Ok(headers)
    }

    fn expand_roots<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut roots = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let resolved = self.resolve_pattern(pattern);
            let matches = pattern::expand_pattern(&resolved).map_err(|err| match err {
                // report the pattern as the caller wrote it
                Error::InvalidPattern { source, .. } => Error::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                },
                other => other,
            })?;

            self.diagnostics.event(DiagnosticEvent::PatternExpanded {
                pattern,
                matches: matches.len(),
            });

            for path in matches {
                if seen.insert(path.clone()) {
                    roots.push(path);
                }
            }
        }

        Ok(roots)
    }

    fn resolve_pattern(&self, pattern: &str) -> String {
        match &self.working_dir {
            Some(dir) => format!(
                "{}/{}",
                glob::Pattern::escape(&dir.to_string_lossy()),
                pattern
            ),
            None => pattern.to_string(),
        }
    }

    fn stored_path(&self, path: &Path) -> Result<PathBuf> {
        match &self.working_dir {
            Some(dir) => path
                .strip_prefix(dir)
                .map(Path::to_path_buf)
                .map_err(|_| {
                    Error::Io(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("{:?} is outside the working directory {:?}", path, dir),
                    ))
                }),
            None => Ok(path.to_path_buf()),
        }
    }

    /// Map a stored path onto the filesystem, refusing escapes
    fn restore_target(&self, stored: &Path) -> Result<PathBuf> {
        let mut target = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::new(),
        };

        for component in stored.components() {
            match component {
                Component::Normal(name) => target.push(name),
                Component::CurDir => {}
                // absolute paths, prefixes, and `..` could land outside the tree
                _ => return Err(Error::UnsafePath(stored.to_path_buf())),
            }
        }

        Ok(target)
    }
}

/// Stream one entry's content onto disk through a fixed-size buffer
///
/// Read-side failures are codec/stream corruption; write-side failures are
/// plain I/O. The handle is closed on return, before metadata is applied.
fn write_file_contents<R: Read>(content: &mut R, target: &Path) -> Result<()> {
    let mut file = File::create(target)?;
    let mut buf = vec![0u8; COPY_BUF_SIZE];

    loop {
        let read = content
            .read(&mut buf)
            .map_err(|err| Error::Codec(format!("corrupt content stream: {}", err)))?;
        if read == 0 {
            break;
        }
        file.write_all(&buf[..read])?;
    }

    file.flush()?;
    Ok(())
}

/// Apply permission bits and timestamps from a header, best effort
fn apply_metadata(path: &Path, header: &EntryHeader) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = header.mode {
            if let Err(err) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
                debug!("Failed to set permissions on {:?}: {}", path, err);
            }
        }
    }

    if let Some(mtime) = header.mtime {
        let mtime = FileTime::from_unix_time(mtime, 0);
        let atime = header
            .atime
            .map(|secs| FileTime::from_unix_time(secs, 0))
            .unwrap_or(mtime);
        if let Err(err) = filetime::set_file_times(path, atime, mtime) {
            debug!("Failed to set timestamps on {:?}: {}", path, err);
        }
    }
}

fn set_world_open(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o777))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
