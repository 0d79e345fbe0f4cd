//! Glob pattern expansion

use crate::{Error, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

/// Expand a single glob pattern into the paths it matches
///
/// Patterns support `*`, `?`, character classes, and recursive `**`, and are
/// resolved against the process working directory unless absolute. A pattern
/// that matches nothing yields an empty result, not an error; malformed
/// syntax fails with [`Error::InvalidPattern`].
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    debug!("Expanding pattern: {}", pattern);

    let paths = glob::glob(pattern).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut matches = Vec::new();
    for path in paths {
        matches.push(path.map_err(|err| Error::Io(err.into_error()))?);
    }

    debug!("Pattern {} matched {} path(s)", pattern, matches.len());
    Ok(matches)
}

/// Expand a list of patterns, deduplicating by matched path
///
/// Overlapping patterns contribute each root exactly once, in first-seen
/// order.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut roots = Vec::new();

    for pattern in patterns {
        for path in expand_pattern(pattern.as_ref())? {
            if seen.insert(path.clone()) {
                roots.push(path);
            }
        }
    }

    Ok(roots)
}
