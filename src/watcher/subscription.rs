//! One notify subscription per directory pair.
//!
//! The notify callback only enqueues; a dedicated dispatch thread pairs
//! rename halves, translates and drains the queue into the handler, so
//! callbacks for one pair are never concurrent and a slow transform never
//! blocks the OS watcher.

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::events::{FileEvent, RenameTracker};
use super::handler::{HandlerState, WatchEvents, WatchHandler};
use crate::error::WatcherError;
use crate::server::observability::spans;
use crate::Result;

/// Pending events per subscription before the notify thread blocks.
const QUEUE_CAPACITY: usize = 1024;

/// Subscription lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Created,
    Running,
    Stopped,
}

/// How long a rename's first half waits for its partner.
const RENAME_WINDOW: Duration = Duration::from_millis(100);

enum Dispatch {
    Raw(notify::Event),
    Event(FileEvent),
    Shutdown,
}

/// A live OS watch bound to exactly one handler.
pub struct Subscription {
    handler: Arc<WatchHandler>,
    state: SubscriptionState,
    watcher: Option<RecommendedWatcher>,
    queue_tx: Sender<Dispatch>,
    queue_rx: Receiver<Dispatch>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("index", &self.handler.index())
            .field("state", &self.state)
            .field("queued", &self.queue_rx.len())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Create a subscription for an initialized handler.
    #[must_use]
    pub fn new(handler: Arc<WatchHandler>) -> Self {
        let (queue_tx, queue_rx) = bounded(QUEUE_CAPACITY);
        Self {
            handler,
            state: SubscriptionState::Created,
            watcher: None,
            queue_tx,
            queue_rx,
            worker: None,
        }
    }

    /// Start the dispatch thread and the OS watch.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is not fresh, the thread cannot
    /// be spawned, or the directory cannot be watched.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SubscriptionState::Created {
            return Err(crate::Error::internal(format!(
                "subscription {} already started",
                self.handler.index()
            )));
        }

        let index = self.handler.index();
        let handler = Arc::clone(&self.handler);
        let rx = self.queue_rx.clone();
        let worker = std::thread::Builder::new()
            .name(format!("watch-dispatch-{index}"))
            .spawn(move || dispatch_loop(&handler, &rx))
            .map_err(|e| crate::Error::internal(format!("failed to spawn dispatcher: {e}")))?;
        self.worker = Some(worker);

        let pair = self.handler.pair();
        let watcher = match open_watcher(&pair.source_dir, pair.recursive, self.queue_tx.clone()) {
            Ok(watcher) => watcher,
            Err(e) => {
                self.shutdown_worker();
                self.state = SubscriptionState::Stopped;
                return Err(e);
            }
        };
        self.watcher = Some(watcher);
        self.state = SubscriptionState::Running;
        self.handler.set_state(HandlerState::Running);

        tracing::info!(
            index,
            path = %pair.source_dir.display(),
            recursive = pair.recursive,
            "Watching directory"
        );
        Ok(())
    }

    /// Stop watching and wait for queued events to be handled.
    ///
    /// Calling this more than once is a no-op.
    pub fn stop(&mut self) {
        if self.state == SubscriptionState::Stopped {
            return;
        }

        self.handler.set_state(HandlerState::Stopping);

        // Dropping the watcher ends delivery; anything already queued is
        // still drained before the shutdown marker.
        self.watcher = None;
        self.shutdown_worker();

        self.state = SubscriptionState::Stopped;
        self.handler.set_state(HandlerState::Stopped);
        tracing::info!(
            index = self.handler.index(),
            path = %self.handler.pair().source_dir.display(),
            "Stopped watching directory"
        );
    }

    fn shutdown_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if self.queue_tx.send(Dispatch::Shutdown).is_err() {
                tracing::warn!(index = self.handler.index(), "Dispatch queue already closed");
            }
            if worker.join().is_err() {
                tracing::error!(index = self.handler.index(), "Dispatch thread panicked");
            }
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Feed an event as if it came from the OS.
    ///
    /// Returns `false` once the subscription has stopped.
    pub fn inject(&self, event: FileEvent) -> bool {
        self.state == SubscriptionState::Running && self.queue_tx.send(Dispatch::Event(event)).is_ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_watcher(
    path: &Path,
    recursive: bool,
    queue_tx: Sender<Dispatch>,
) -> Result<RecommendedWatcher> {
    let watch_failed = |e: notify::Error| WatcherError::WatchFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        match result {
            Ok(event) => {
                if queue_tx.send(Dispatch::Raw(event)).is_err() {
                    tracing::debug!("Dispatch queue closed, dropping event");
                }
            }
            Err(e) => {
                tracing::error!("Watch error: {:?}", e);
            }
        }
    })
    .map_err(watch_failed)?;

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher.watch(path, mode).map_err(watch_failed)?;

    Ok(watcher)
}

fn dispatch_loop(handler: &WatchHandler, rx: &Receiver<Dispatch>) {
    let _span = spans::directory_span(handler.index(), &handler.pair().source_dir).entered();
    let mut renames = RenameTracker::default();
    let deliver = |events: Vec<FileEvent>| {
        for event in &events {
            handler.dispatch(event);
        }
    };

    loop {
        let message = if renames.is_pending() {
            match rx.recv_timeout(RENAME_WINDOW) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => {
                    deliver(renames.flush());
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(message) => message,
                Err(_) => break,
            }
        };

        match message {
            Dispatch::Raw(event) => deliver(renames.translate(event)),
            Dispatch::Event(event) => {
                deliver(renames.flush());
                handler.dispatch(&event);
            }
            Dispatch::Shutdown => break,
        }
    }

    deliver(renames.flush());
    tracing::debug!(index = handler.index(), "Dispatch loop exited");
}
