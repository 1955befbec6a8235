//! Extension filtering for source images.

use std::collections::BTreeSet;
use std::path::Path;

/// Extensions accepted when the configuration does not name any.
const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Lower-cased set of file extensions eligible for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    allowed: BTreeSet<String>,
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

impl ExtensionFilter {
    /// Create a filter from extensions like `".JPG"` or `"png"`.
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        let allowed = extensions
            .iter()
            .map(|e| normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { allowed }
    }

    /// Check if a path has an allowed extension.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.allowed.contains(&ext.to_lowercase()))
    }

    /// Allowed extensions, without leading dot.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    /// Check if the filter accepts nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

fn normalize(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
