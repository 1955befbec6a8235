//! Configuration settings and validation.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::watcher::{DirectoryPair, ExtensionFilter, TransformParams};
use crate::{Error, Result};

/// One watched directory as written in the configuration file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WatchDirConfig {
    /// Source directory.
    pub watch: PathBuf,
    /// Output directory; defaults to a `proc` sibling of `watch`.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Overrides `proc.recursive` for this directory.
    #[serde(default)]
    pub recursive: Option<bool>,
}

/// Processing options shared by every directory.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcOptions {
    pub image_extensions: Vec<String>,
    pub w_max: i64,
    pub recursive: bool,
    pub remove_on_delete: bool,
    pub skip_existing: bool,
    pub delete_on_move: bool,
    pub process_on_start: bool,
    pub font_path: Option<PathBuf>,
    pub font_scale: f32,
    pub left_border_percent: f32,
    pub bottom_border: u32,
    pub font_color: [u8; 3],
    pub logo_path: Option<PathBuf>,
    pub logo_padding: u32,
}

impl Default for ProcOptions {
    fn default() -> Self {
        let params = TransformParams::default();
        Self {
            image_extensions: vec![".jpg".into(), ".jpeg".into(), ".png".into()],
            w_max: params.w_max,
            recursive: false,
            remove_on_delete: true,
            skip_existing: true,
            delete_on_move: false,
            process_on_start: true,
            font_path: params.font_path,
            font_scale: params.font_scale,
            left_border_percent: params.left_border_percent,
            bottom_border: params.bottom_border,
            font_color: params.font_color,
            logo_path: params.logo_path,
            logo_padding: params.logo_padding,
        }
    }
}

impl ProcOptions {
    /// Transform parameters derived from these options.
    #[must_use]
    pub fn transform_params(&self) -> TransformParams {
        TransformParams {
            w_max: self.w_max,
            font_path: self.font_path.clone(),
            font_scale: self.font_scale,
            left_border_percent: self.left_border_percent,
            bottom_border: self.bottom_border,
            font_color: self.font_color,
            logo_path: self.logo_path.clone(),
            logo_padding: self.logo_padding,
        }
    }
}

/// Dashboard (HTTP) settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
    /// Number of images listed per directory; 0 lists everything.
    pub display_last_n_images: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            display_last_n_images: 0,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Enable JSON console output.
    pub json: bool,
    /// Log file also served by the dashboard.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Main configuration for imgwatch.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directories to watch, in dashboard order.
    pub watch_directories: Vec<WatchDirConfig>,
    pub proc: ProcOptions,
    pub dashboard: DashboardConfig,
    pub log: LogConfig,
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid configuration YAML.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::config(format!("invalid YAML: {e}")))
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&text)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.watch_directories.is_empty() {
            return Err(Error::config("at least one watch directory is required"));
        }

        if self.dashboard.port == 0 {
            return Err(Error::config("port cannot be 0"));
        }

        if self.dashboard.host.is_empty() {
            return Err(Error::config("host cannot be empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log.level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log.level,
                valid_levels.join(", ")
            )));
        }

        if self.proc.w_max <= 0 {
            return Err(Error::config(format!(
                "w_max must be positive, got {}",
                self.proc.w_max
            )));
        }

        if !(0.0..=1.0).contains(&self.proc.left_border_percent) {
            return Err(Error::config("left_border_percent must be within 0..=1"));
        }

        if ExtensionFilter::new(&self.proc.image_extensions).is_empty() {
            return Err(Error::config("image_extensions cannot be empty"));
        }

        Ok(())
    }

    /// Build the immutable directory pairs.
    #[must_use]
    pub fn directory_pairs(&self) -> Vec<DirectoryPair> {
        let extensions = ExtensionFilter::new(&self.proc.image_extensions);
        let params = self.proc.transform_params();

        self.watch_directories
            .iter()
            .map(|dir| DirectoryPair {
                source_dir: dir.watch.clone(),
                output_dir: dir
                    .output
                    .clone()
                    .unwrap_or_else(|| DirectoryPair::default_output_for(&dir.watch)),
                recursive: dir.recursive.unwrap_or(self.proc.recursive),
                remove_on_delete: self.proc.remove_on_delete,
                skip_existing: self.proc.skip_existing,
                delete_on_move: self.proc.delete_on_move,
                extensions: extensions.clone(),
                params: params.clone(),
            })
            .collect()
    }

    /// Listing limit for the dashboard, `None` when unlimited.
    #[must_use]
    pub const fn listing_limit(&self) -> Option<usize> {
        match self.dashboard.display_last_n_images {
            0 => None,
            n => Some(n),
        }
    }
}
