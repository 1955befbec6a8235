//! Watch-and-synchronize engine.
//!
//! This module provides:
//! - Directory pair model and extension filtering
//! - Artifact mapping rebuilt from directory listings
//! - Per-pair handlers reacting to notify-rs events
//! - A supervisor owning one subscription per pair

mod events;
mod filter;
mod handler;
mod mapper;
mod pair;
mod subscription;
mod supervisor;

pub use events::FileEvent;
pub use filter::ExtensionFilter;
pub use handler::{HandlerState, StatusSnapshot, WatchEvents, WatchHandler};
pub use mapper::{count_source_files, list_artifacts, list_source_files, rescan, ArtifactMap};
pub use pair::{DirectoryPair, TransformParams};
pub use subscription::{Subscription, SubscriptionState};
pub use supervisor::WatchSupervisor;
