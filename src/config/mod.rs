//! Configuration management for imgwatch.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables
//! - YAML configuration file (lowest priority)

mod settings;

pub use settings::{Config, DashboardConfig, LogConfig, ProcOptions, WatchDirConfig};
