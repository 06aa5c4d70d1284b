//! # Host List Loading
//!
//! Reads the target host list from a plain text file, one host per line.
//! A host is an opaque string (address or name); it is never interpreted
//! here. Blank lines, surrounding whitespace and `#` comment lines are
//! tolerated so hand-maintained lists stay easy to edit.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Loads the host list from `path`, preserving file order.
pub fn load(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents: String = fs::read_to_string(path)
        .with_context(|| format!("reading host list {}", path.display()))?;

    let hosts: Vec<String> = parse(&contents);
    debug!("loaded {} hosts from {}", hosts.len(), path.display());
    Ok(hosts)
}

/// Parses host-list contents: trims each line, skips empties and comments.
pub fn parse(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}
