//! Compression codec wrapped around the container stream

use crate::{Error, Result};
use std::io::{BufReader, Read, Write};
use zstd::stream::read::Decoder;
use zstd::stream::write::Encoder;

/// Default zstd compression level
pub const DEFAULT_LEVEL: i32 = 3;

/// Default number of encoder worker threads
pub const DEFAULT_WORKERS: u32 = 5;

/// Streaming zstd codec configuration
///
/// Encoding fans buffered blocks out to a small fixed pool of zstd worker
/// threads; the workers never touch live file handles, so the sequential
/// contract of the container stream is unaffected. Decoding is a plain
/// pass-through reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionCodec {
    level: i32,
    workers: u32,
}

impl Default for CompressionCodec {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl CompressionCodec {
    /// Create a codec with an explicit level and worker count
    pub fn new(level: i32, workers: u32) -> Self {
        Self { level, workers }
    }

    /// Configured compression level
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Configured worker count
    pub fn workers(&self) -> u32 {
        self.workers
    }

    /// Wrap `dest` in a compressing writer
    ///
    /// Frame checksums are enabled so corrupted archives fail on decode
    /// instead of extracting garbage. The caller must invoke `finish()` on
    /// the returned encoder to flush the final frame.
    pub fn encoder<W: Write>(&self, dest: W) -> Result<Encoder<'static, W>> {
        let mut encoder = Encoder::new(dest, self.level).map_err(Error::codec)?;
        encoder.include_checksum(true).map_err(Error::codec)?;
        if self.workers > 0 {
            encoder.multithread(self.workers).map_err(Error::codec)?;
        }
        Ok(encoder)
    }

    /// Wrap `source` in a decompressing reader
    pub fn decoder<R: Read>(&self, source: R) -> Result<Decoder<'static, BufReader<R>>> {
        Decoder::new(source).map_err(Error::codec)
    }
}
