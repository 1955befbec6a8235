//! Supervisor owning every pair's handler and subscription.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use super::handler::{StatusSnapshot, WatchHandler};
use super::pair::DirectoryPair;
use super::subscription::{Subscription, SubscriptionState};
use crate::error::WatcherError;
use crate::transform::ImageTransform;
use crate::Result;

/// Starts and stops one subscription per directory pair.
///
/// Handlers are addressed by their position in the configuration.
#[derive(Debug)]
pub struct WatchSupervisor {
    handlers: Vec<Arc<WatchHandler>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl WatchSupervisor {
    /// Initialize a handler and open a subscription for every pair.
    ///
    /// # Errors
    ///
    /// Returns the first initialization or watch error; subscriptions opened
    /// before the failure are stopped again.
    pub fn start(pairs: Vec<DirectoryPair>, transform: Arc<dyn ImageTransform>) -> Result<Self> {
        let mut handlers = Vec::with_capacity(pairs.len());
        let mut subscriptions = Vec::with_capacity(pairs.len());

        for (index, pair) in pairs.into_iter().enumerate() {
            let pair = pair.resolve()?;
            let handler = Arc::new(WatchHandler::new(index, pair, Arc::clone(&transform)));
            handler.initialize()?;

            let mut subscription = Subscription::new(Arc::clone(&handler));
            subscription.start()?;

            handlers.push(handler);
            subscriptions.push(subscription);
        }

        tracing::info!(directories = handlers.len(), "Watch supervisor started");

        Ok(Self {
            handlers,
            subscriptions: Mutex::new(subscriptions),
        })
    }

    /// Stop every subscription, letting in-flight events finish.
    ///
    /// Safe to call repeatedly.
    pub fn stop(&self) {
        let mut subscriptions = self.subscriptions.lock();
        let live = subscriptions
            .iter()
            .filter(|s| s.state() != SubscriptionState::Stopped)
            .count();
        if live == 0 {
            return;
        }

        for subscription in subscriptions.iter_mut() {
            subscription.stop();
        }
        tracing::info!(stopped = live, "Watch supervisor stopped");
    }

    /// Run the backfill sweep on every handler.
    ///
    /// Returns the number of files handed to the transform across all pairs.
    pub fn process_existing_files(&self) -> usize {
        self.handlers
            .iter()
            .map(|h| h.process_existing_files())
            .sum()
    }

    /// Handler for a directory index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDirectoryIndex` if out of range.
    pub fn handler(&self, index: usize) -> Result<Arc<WatchHandler>> {
        self.handlers
            .get(index)
            .cloned()
            .ok_or_else(|| {
                WatcherError::InvalidDirectoryIndex {
                    index,
                    count: self.handlers.len(),
                }
                .into()
            })
    }

    /// All handlers in configuration order.
    #[must_use]
    pub fn handlers(&self) -> &[Arc<WatchHandler>] {
        &self.handlers
    }

    /// Status snapshot for a directory index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDirectoryIndex` if out of range.
    pub fn status(&self, index: usize) -> Result<StatusSnapshot> {
        self.handler(index).map(|h| h.status())
    }

    /// Derived artifacts of a directory, newest-first, optionally the last `last_n`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDirectoryIndex` if out of range, or an I/O error.
    pub fn list_artifacts(&self, index: usize, last_n: Option<usize>) -> Result<Vec<PathBuf>> {
        self.handler(index)?.list_artifacts(last_n)
    }

    /// Number of configured directory pairs.
    #[must_use]
    pub fn directory_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Drop for WatchSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::watcher::{TransformParams, WatchEvents};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct CopyTransform;

    impl ImageTransform for CopyTransform {
        fn apply(
            &self,
            source: &Path,
            output_dir: &Path,
            _params: &TransformParams,
        ) -> std::result::Result<PathBuf, TransformError> {
            let out = output_dir.join(source.file_name().unwrap());
            fs::copy(source, &out).map_err(|e| TransformError::Open {
                path: source.display().to_string(),
                reason: e.to_string(),
            })?;
            Ok(out)
        }
    }

    fn pairs(tmp: &TempDir, n: usize) -> Vec<DirectoryPair> {
        (0..n)
            .map(|i| {
                let src = tmp.path().join(format!("src{i}"));
                fs::create_dir_all(&src).unwrap();
                DirectoryPair::new(src, tmp.path().join(format!("out{i}")))
            })
            .collect()
    }

    #[test]
    fn test_start_and_lookup() {
        let tmp = TempDir::new().unwrap();
        let supervisor = WatchSupervisor::start(pairs(&tmp, 2), Arc::new(CopyTransform)).unwrap();

        assert_eq!(supervisor.directory_count(), 2);
        assert!(supervisor.status(0).unwrap().running);
        assert_eq!(
            supervisor.status(1).unwrap().watch_directory,
            tmp.path().join("src1")
        );

        let err = supervisor.status(2).unwrap_err();
        assert!(err.is_client_error());
        assert!(supervisor.list_artifacts(5, None).is_err());

        supervisor.stop();
        assert!(!supervisor.status(0).unwrap().running);
        supervisor.stop();
    }

    #[test]
    fn test_start_missing_source_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut pairs = pairs(&tmp, 1);
        pairs.push(DirectoryPair::new(
            tmp.path().join("missing"),
            tmp.path().join("out_missing"),
        ));

        let err = WatchSupervisor::start(pairs, Arc::new(CopyTransform)).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Watcher(WatcherError::DirectoryNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_source_tracks_canonical_paths() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let real = root.join("real");
        fs::create_dir_all(&real).unwrap();
        std::os::unix::fs::symlink(&real, root.join("link")).unwrap();
        fs::write(real.join("a.jpg"), b"a").unwrap();

        let pair = DirectoryPair::new(root.join("link"), root.join("out"));
        let supervisor = WatchSupervisor::start(vec![pair], Arc::new(CopyTransform)).unwrap();
        let handler = supervisor.handler(0).unwrap();
        assert_eq!(handler.pair().source_dir, real);
        assert_eq!(supervisor.status(0).unwrap().watch_directory, real);

        assert_eq!(supervisor.process_existing_files(), 1);
        let derived = root.join("out").join("a.jpg");
        assert_eq!(handler.artifact_for(&real.join("a.jpg")), Some(derived.clone()));

        // Delete events arrive with the resolved path.
        fs::remove_file(real.join("a.jpg")).unwrap();
        handler.on_deleted(&real.join("a.jpg"));
        assert!(!derived.exists());
        assert!(!handler.is_tracked(&real.join("a.jpg")));
    }

    #[test]
    fn test_backfill_across_pairs() {
        let tmp = TempDir::new().unwrap();
        let pairs = pairs(&tmp, 2);
        fs::write(pairs[0].source_dir.join("a.jpg"), b"a").unwrap();
        fs::write(pairs[1].source_dir.join("b.jpg"), b"b").unwrap();
        fs::write(pairs[1].source_dir.join("c.png"), b"c").unwrap();

        let supervisor = WatchSupervisor::start(pairs, Arc::new(CopyTransform)).unwrap();
        assert_eq!(supervisor.process_existing_files(), 3);

        assert_eq!(supervisor.status(0).unwrap().processed_images, 1);
        assert_eq!(supervisor.status(1).unwrap().processed_images, 2);

        let listed = supervisor.list_artifacts(1, Some(1)).unwrap();
        let out1 = tmp.path().join("out1").canonicalize().unwrap();
        assert_eq!(listed, vec![out1.join("c.png")]);
    }
}
