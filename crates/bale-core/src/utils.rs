//! Utility functions for bale-core

/// Format a byte count as a human-readable decimal string
///
/// Uses decimal units (1 kB = 1000 B), so sizes line up with what `ls -l`
/// and build logs report.
pub fn human_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1000;

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}B", bytes as f64 / div as f64, ['k', 'M', 'G', 'T', 'P', 'E'][exp])
}
