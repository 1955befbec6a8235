//! Artifact mapping between source files and their derived images.
//!
//! The filesystem is the source of truth: every function here re-lists the
//! directories instead of trusting incremental state, so a missed or
//! reordered notification heals on the next rescan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::pair::DirectoryPair;
use crate::Result;

/// Source path to derived path, `None` while no artifact has been produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArtifactMap {
    entries: HashMap<PathBuf, Option<PathBuf>>,
}

impl ArtifactMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a source file, with its artifact if one exists.
    pub fn insert(&mut self, source: PathBuf, derived: Option<PathBuf>) {
        self.entries.insert(source, derived);
    }

    /// Remove a source file, returning its recorded artifact.
    pub fn remove(&mut self, source: &Path) -> Option<PathBuf> {
        self.entries.remove(source).flatten()
    }

    /// Artifact recorded for a source file.
    #[must_use]
    pub fn derived(&self, source: &Path) -> Option<&Path> {
        self.entries.get(source).and_then(Option::as_deref)
    }

    /// Whether the source file has an entry at all.
    #[must_use]
    pub fn contains(&self, source: &Path) -> bool {
        self.entries.contains_key(source)
    }

    /// Whether the source file has a produced artifact.
    #[must_use]
    pub fn has_artifact(&self, source: &Path) -> bool {
        self.derived(source).is_some()
    }

    /// Number of source entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build a fresh artifact map from the current directory contents.
///
/// # Errors
///
/// Returns an error if the source directory cannot be listed.
pub fn rescan(pair: &DirectoryPair) -> Result<ArtifactMap> {
    let mut map = ArtifactMap::new();

    for source in list_source_files(pair)? {
        let derived = pair.derived_path(&source).filter(|p| p.is_file());
        map.insert(source, derived);
    }

    tracing::debug!(
        source = %pair.source_dir.display(),
        files = map.len(),
        "Artifact map rebuilt"
    );

    Ok(map)
}

/// List eligible source files in reverse-lexicographic order.
///
/// Only the top level is listed unless the pair is recursive.
///
/// # Errors
///
/// Returns an error if the source directory cannot be listed.
pub fn list_source_files(pair: &DirectoryPair) -> Result<Vec<PathBuf>> {
    let max_depth = if pair.recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(&pair.source_dir)
        .min_depth(1)
        .max_depth(max_depth)
    {
        let entry = match entry {
            Ok(entry) => entry,
            // The root itself failing means the directory is gone.
            Err(e) if e.depth() == 0 => return Err(walk_error(e)),
            Err(e) => {
                tracing::warn!(error = %e, "Error walking source directory");
                continue;
            }
        };

        if entry.file_type().is_file() && pair.accepts(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort_unstable_by(|a, b| b.cmp(a));
    Ok(files)
}

/// Count eligible source files.
///
/// # Errors
///
/// Returns an error if the source directory cannot be listed.
pub fn count_source_files(pair: &DirectoryPair) -> Result<usize> {
    list_source_files(pair).map(|files| files.len())
}

/// List derived artifacts newest-first, keeping only the last `last_n` when given.
///
/// "Newest" is reverse-lexicographic by file name, which matches the
/// timestamped names cameras produce.
///
/// # Errors
///
/// Returns an error if the output directory cannot be read.
pub fn list_artifacts(output_dir: &Path, last_n: Option<usize>) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(output_dir)?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .collect();

    files.sort_unstable();

    if let Some(n) = last_n.filter(|n| *n > 0) {
        let skip = files.len().saturating_sub(n);
        files.drain(..skip);
    }

    files.reverse();
    Ok(files)
}

fn walk_error(e: walkdir::Error) -> crate::Error {
    e.into_io_error().map_or_else(
        || crate::Error::internal("directory walk failed"),
        crate::Error::Io,
    )
}
