//! Injected diagnostics sink and process memory sampling
//!
//! The pipeline reports structured events to a caller-supplied sink instead
//! of any process-global state; how the events are captured is entirely the
//! caller's concern. Memory sampling is opt-in observability and nothing in
//! the core branches on it.

use std::path::Path;
use std::time::Duration;
use sysinfo::{Pid, System};
use tracing::debug;

/// Structured events emitted by the archive pipeline
#[derive(Debug)]
pub enum DiagnosticEvent<'a> {
    /// A glob pattern was expanded into `matches` roots
    PatternExpanded {
        pattern: &'a str,
        matches: usize,
    },
    /// One entry was written to the container
    EntryArchived {
        path: &'a Path,
        size: u64,
    },
    /// One entry was materialized on disk
    EntryRestored {
        path: &'a Path,
    },
    /// Process memory snapshot taken after an entry was processed
    MemorySampled(MemoryUsage),
    /// Archive completed: destination size and elapsed wall time
    ArchiveFinished {
        bytes_written: u64,
        elapsed: Duration,
    },
    /// Restore completed
    RestoreFinished {
        elapsed: Duration,
    },
}

/// Receives structured diagnostic events from the pipeline
pub trait DiagnosticsSink {
    /// Called once per event, in pipeline order
    fn event(&mut self, event: DiagnosticEvent<'_>);
}

/// Sink that discards every event
#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn event(&mut self, _event: DiagnosticEvent<'_>) {}
}

/// Process memory snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Resident set size in bytes
    pub resident_bytes: u64,
    /// Virtual memory size in bytes
    pub virtual_bytes: u64,
}

/// Samples memory usage of the current process
pub struct MemoryMonitor {
    system: System,
    pid: Pid,
}

impl MemoryMonitor {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: Pid::from(std::process::id() as usize),
        }
    }

    /// Take a snapshot of the current process's memory usage
    pub fn sample(&mut self) -> MemoryUsage {
        self.system.refresh_process(self.pid);

        let usage = match self.system.process(self.pid) {
            Some(process) => MemoryUsage {
                resident_bytes: process.memory(),
                virtual_bytes: process.virtual_memory(),
            },
            None => MemoryUsage {
                resident_bytes: 0,
                virtual_bytes: 0,
            },
        };

        debug!(
            "Memory: rss = {} B, virtual = {} B",
            usage.resident_bytes, usage.virtual_bytes
        );
        usage
    }
}

impl Default for MemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}
