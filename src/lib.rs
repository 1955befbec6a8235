//! imgwatch
//!
//! Watches source directories for images and keeps a resized, date-stamped
//! copy of each one in a paired output directory, with a small HTTP
//! dashboard over the results.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod server;
pub mod transform;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
