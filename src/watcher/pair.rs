//! Directory pair model.

use std::path::{Path, PathBuf};

use super::filter::ExtensionFilter;
use crate::error::WatcherError;
use crate::Result;

/// Parameters handed to the image transform for every file of a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    /// Target width of the derived image in pixels.
    pub w_max: i64,
    /// Font used to render the capture timestamp. No text overlay when unset.
    pub font_path: Option<PathBuf>,
    /// Glyph height in pixels is `font_scale * 10`.
    pub font_scale: f32,
    /// Text starts at `width - left_border_percent * width`.
    pub left_border_percent: f32,
    /// Distance of the text baseline from the bottom edge.
    pub bottom_border: u32,
    /// RGB text colour.
    pub font_color: [u8; 3],
    /// Logo drawn in the bottom-right corner.
    pub logo_path: Option<PathBuf>,
    /// Distance of the logo from the image border.
    pub logo_padding: u32,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            w_max: 300,
            font_path: None,
            font_scale: 8.0,
            left_border_percent: 0.7,
            bottom_border: 100,
            font_color: [255, 255, 255],
            logo_path: None,
            logo_padding: 50,
        }
    }
}

/// A watched source directory bound to its derived-output directory.
///
/// Built once from configuration and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DirectoryPair {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub recursive: bool,
    pub remove_on_delete: bool,
    pub skip_existing: bool,
    /// Remove the artifact of the old path on a move (requires `remove_on_delete`).
    pub delete_on_move: bool,
    pub extensions: ExtensionFilter,
    pub params: TransformParams,
}

impl DirectoryPair {
    /// Create a pair with default policy flags.
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            recursive: false,
            remove_on_delete: true,
            skip_existing: true,
            delete_on_move: false,
            extensions: ExtensionFilter::default(),
            params: TransformParams::default(),
        }
    }

    /// Default output directory for a source directory: a `proc` sibling.
    #[must_use]
    pub fn default_output_for(source_dir: &Path) -> PathBuf {
        source_dir
            .parent()
            .unwrap_or(source_dir)
            .join("proc")
    }

    /// Path the derived artifact of `source` is written to.
    #[must_use]
    pub fn derived_path(&self, source: &Path) -> Option<PathBuf> {
        source.file_name().map(|name| self.output_dir.join(name))
    }

    /// Resolve both directories to absolute canonical paths.
    ///
    /// The output directory is created if missing. Event paths reported by
    /// the OS are canonical, so map keys must be too.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryNotFound` if the source directory is missing, or an
    /// I/O error if the output directory cannot be created.
    pub fn resolve(mut self) -> Result<Self> {
        if !self.source_dir.is_dir() {
            return Err(WatcherError::not_found(&self.source_dir).into());
        }
        self.source_dir = self.source_dir.canonicalize()?;

        std::fs::create_dir_all(&self.output_dir)?;
        self.output_dir = self.output_dir.canonicalize()?;
        Ok(self)
    }

    /// Whether a source path is eligible for processing.
    #[must_use]
    pub fn accepts(&self, path: &Path) -> bool {
        self.extensions.matches(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_path_uses_basename() {
        let pair = DirectoryPair::new("/data/p1", "/data/out");
        assert_eq!(
            pair.derived_path(Path::new("/data/p1/sub/img001.jpg")),
            Some(PathBuf::from("/data/out/img001.jpg"))
        );
    }

    #[test]
    fn test_default_output_for() {
        assert_eq!(
            DirectoryPair::default_output_for(Path::new("/data/p1")),
            PathBuf::from("/data/proc")
        );
    }

    #[test]
    fn test_resolve_makes_paths_canonical() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();

        let pair = DirectoryPair::new(root.join("src").join("..").join("src"), root.join("out"))
            .resolve()
            .unwrap();

        assert_eq!(pair.source_dir, root.join("src"));
        assert_eq!(pair.output_dir, root.join("out"));
        assert!(pair.output_dir.is_dir());
        assert!(pair.source_dir.is_absolute());
    }

    #[test]
    fn test_resolve_missing_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = DirectoryPair::new(tmp.path().join("absent"), tmp.path().join("out"))
            .resolve()
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Watcher(WatcherError::DirectoryNotFound { .. })
        ));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_new_defaults() {
        let pair = DirectoryPair::new("/a", "/b");
        assert!(pair.remove_on_delete);
        assert!(pair.skip_existing);
        assert!(!pair.recursive);
        assert!(!pair.delete_on_move);
        assert_eq!(pair.params.w_max, 300);
        assert!(pair.accepts(Path::new("/a/x.JPG")));
        assert!(!pair.accepts(Path::new("/a/x.txt")));
    }
}
