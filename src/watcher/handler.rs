//! Per-pair watch handler: artifact bookkeeping, processing and counters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::events::FileEvent;
use super::mapper::{self, ArtifactMap};
use super::pair::DirectoryPair;
use crate::error::WatcherError;
use crate::server::metrics;
use crate::transform::ImageTransform;
use crate::Result;

/// Event callbacks a subscription delivers to.
///
/// Implementations must absorb per-file failures: a callback never fails.
pub trait WatchEvents: Send + Sync {
    fn on_created(&self, path: &Path);
    fn on_modified(&self, path: &Path);
    fn on_moved(&self, from: &Path, to: &Path);
    fn on_deleted(&self, path: &Path);

    /// Route a translated event to the matching callback.
    fn dispatch(&self, event: &FileEvent) {
        match event {
            FileEvent::Created(p) => self.on_created(p),
            FileEvent::Modified(p) => self.on_modified(p),
            FileEvent::Moved { from, to } => self.on_moved(from, to),
            FileEvent::Deleted(p) => self.on_deleted(p),
        }
    }
}

/// Handler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerState {
    Initializing,
    Ready,
    Running,
    Stopping,
    Stopped,
}

/// Point-in-time copy of a handler's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    #[serde(rename = "status", serialize_with = "serialize_running")]
    pub running: bool,
    pub watch_directory: PathBuf,
    pub output_directory: PathBuf,
    #[serde(serialize_with = "serialize_resolution")]
    pub resize_resolution: i64,
    pub total_images: usize,
    pub processed_images: u64,
    pub failed_images: u64,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_running<S: serde::Serializer>(running: &bool, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(if *running { "running..." } else { "stopped." })
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_resolution<S: serde::Serializer>(w: &i64, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{w}px width"))
}

/// Mutable state, always read and written as a unit.
#[derive(Debug)]
struct Inner {
    state: HandlerState,
    artifacts: ArtifactMap,
    processed: u64,
    failed: u64,
    total_sources: usize,
}

/// Owns one directory pair's artifact map and counters.
///
/// Callbacks for the same handler are serialized through `serial`; the
/// state lock is only held for short bookkeeping so `status()` never waits
/// on an image transform.
pub struct WatchHandler {
    index: usize,
    pair: DirectoryPair,
    transform: Arc<dyn ImageTransform>,
    serial: Mutex<()>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for WatchHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandler")
            .field("index", &self.index)
            .field("pair", &self.pair)
            .field("inner", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}

impl WatchHandler {
    /// Create a handler in the `Initializing` state.
    #[must_use]
    pub fn new(index: usize, pair: DirectoryPair, transform: Arc<dyn ImageTransform>) -> Self {
        Self {
            index,
            pair,
            transform,
            serial: Mutex::new(()),
            inner: Mutex::new(Inner {
                state: HandlerState::Initializing,
                artifacts: ArtifactMap::new(),
                processed: 0,
                failed: 0,
                total_sources: 0,
            }),
        }
    }

    /// Validate directories and seed the artifact map.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryNotFound` if the source directory is missing, or an
    /// I/O error if the output directory cannot be created or the source
    /// cannot be listed.
    pub fn initialize(&self) -> Result<()> {
        let _serial = self.serial.lock();

        if !self.pair.source_dir.is_dir() {
            return Err(WatcherError::not_found(&self.pair.source_dir).into());
        }
        std::fs::create_dir_all(&self.pair.output_dir)?;

        let artifacts = mapper::rescan(&self.pair)?;
        let total = artifacts.len();

        {
            let mut inner = self.inner.lock();
            inner.artifacts = artifacts;
            inner.processed = 0;
            inner.failed = 0;
            inner.total_sources = total;
            inner.state = HandlerState::Ready;
        }

        if self.pair.remove_on_delete {
            tracing::info!(
                source = %self.pair.source_dir.display(),
                "Derived images will be deleted on source delete"
            );
        }
        tracing::info!(
            index = self.index,
            source = %self.pair.source_dir.display(),
            output = %self.pair.output_dir.display(),
            files = total,
            "Watch handler ready"
        );

        Ok(())
    }

    /// Backfill artifacts for files that existed before the subscription.
    ///
    /// With `skip_existing`, files that already have an artifact are left alone.
    /// Returns the number of files handed to the transform.
    pub fn process_existing_files(&self) -> usize {
        tracing::info!(source = %self.pair.source_dir.display(), "Processing existing images");

        let files = match mapper::list_source_files(&self.pair) {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(
                    source = %self.pair.source_dir.display(),
                    error = %e,
                    "Failed to list source directory"
                );
                return 0;
            }
        };

        let mut attempted = 0;
        for path in files {
            let _serial = self.serial.lock();
            if self.pair.skip_existing && self.inner.lock().artifacts.has_artifact(&path) {
                continue;
            }
            self.process_locked(&path);
            attempted += 1;
        }

        self.refresh_total();
        attempted
    }

    /// Run the transform for one source file.
    ///
    /// Disallowed extensions are ignored. Failures are counted, never returned.
    pub fn process_one(&self, path: &Path) {
        let _serial = self.serial.lock();
        self.process_locked(path);
    }

    fn process_locked(&self, path: &Path) {
        if !self.pair.accepts(path) {
            tracing::trace!(path = %path.display(), "Skipping file with disallowed extension");
            return;
        }

        let label = self.index.to_string();
        match self
            .transform
            .apply(path, &self.pair.output_dir, &self.pair.params)
        {
            Ok(derived) => {
                tracing::info!(path = %derived.display(), "Resized image saved");
                let mut inner = self.inner.lock();
                inner.artifacts.insert(path.to_path_buf(), Some(derived));
                inner.processed += 1;
                metrics::IMAGES_PROCESSED.with_label_values(&[label.as_str()]).inc();
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to process image");
                self.inner.lock().failed += 1;
                metrics::IMAGES_FAILED.with_label_values(&[label.as_str()]).inc();
            }
        }
    }

    fn delete_locked(&self, path: &Path) {
        let removed = self.inner.lock().artifacts.remove(path);
        let Some(derived) = removed else {
            return;
        };

        match std::fs::remove_file(&derived) {
            Ok(()) => {
                tracing::info!(path = %derived.display(), "Deleted resized image");
            }
            Err(e) => {
                let err = WatcherError::ArtifactDeleteFailed {
                    path: derived.display().to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!(error = %err, "Derived image not removed");
            }
        }
    }

    /// Re-count eligible source files from a live listing.
    fn refresh_total(&self) {
        match mapper::count_source_files(&self.pair) {
            Ok(total) => self.inner.lock().total_sources = total,
            Err(e) => tracing::warn!(
                source = %self.pair.source_dir.display(),
                error = %e,
                "Failed to count source files"
            ),
        }
    }

    /// Consistent copy of the handler's status.
    ///
    /// The source count is refreshed from a live listing before the copy is taken.
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        let live_total = mapper::count_source_files(&self.pair).ok();

        let mut inner = self.inner.lock();
        if let Some(total) = live_total {
            inner.total_sources = total;
        }

        StatusSnapshot {
            running: inner.state == HandlerState::Running,
            watch_directory: self.pair.source_dir.clone(),
            output_directory: self.pair.output_dir.clone(),
            resize_resolution: self.pair.params.w_max,
            total_images: inner.total_sources,
            processed_images: inner.processed,
            failed_images: inner.failed,
        }
    }

    /// Derived artifacts in the output directory, newest-first.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be read.
    pub fn list_artifacts(&self, last_n: Option<usize>) -> Result<Vec<PathBuf>> {
        mapper::list_artifacts(&self.pair.output_dir, last_n)
    }

    /// Artifact currently recorded for a source file.
    #[must_use]
    pub fn artifact_for(&self, source: &Path) -> Option<PathBuf> {
        self.inner
            .lock()
            .artifacts
            .derived(source)
            .map(Path::to_path_buf)
    }

    /// Whether the source file has an entry in the artifact map.
    #[must_use]
    pub fn is_tracked(&self, source: &Path) -> bool {
        self.inner.lock().artifacts.contains(source)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> HandlerState {
        self.inner.lock().state
    }

    pub(crate) fn set_state(&self, state: HandlerState) {
        let mut inner = self.inner.lock();
        tracing::debug!(index = self.index, from = ?inner.state, to = ?state, "Handler state change");
        inner.state = state;
    }

    /// Position of the pair in the configuration.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The pair this handler owns.
    #[must_use]
    pub const fn pair(&self) -> &DirectoryPair {
        &self.pair
    }
}

impl WatchEvents for WatchHandler {
    fn on_created(&self, path: &Path) {
        tracing::info!(path = %path.display(), "New file created");
        self.process_one(path);
        self.refresh_total();
    }

    fn on_modified(&self, path: &Path) {
        tracing::info!(path = %path.display(), "File modified");
        self.process_one(path);
        self.refresh_total();
    }

    fn on_moved(&self, from: &Path, to: &Path) {
        tracing::info!(from = %from.display(), to = %to.display(), "File moved");
        {
            let _serial = self.serial.lock();
            if self.pair.delete_on_move && self.pair.remove_on_delete {
                self.delete_locked(from);
            }
            self.process_locked(to);
        }
        self.refresh_total();
    }

    fn on_deleted(&self, path: &Path) {
        if self.pair.remove_on_delete {
            tracing::info!(path = %path.display(), "File deleted");
            let _serial = self.serial.lock();
            self.delete_locked(path);
        }
        self.refresh_total();
    }
}
