//! File system event types and translation from notify.

use std::path::PathBuf;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};

/// File system events a handler reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// File was created.
    Created(PathBuf),
    /// File content changed.
    Modified(PathBuf),
    /// File was renamed from old path to new path.
    Moved { from: PathBuf, to: PathBuf },
    /// File was deleted.
    Deleted(PathBuf),
}

impl FileEvent {
    /// Get the primary path associated with this event.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Created(p) | Self::Modified(p) | Self::Deleted(p) => p,
            Self::Moved { to, .. } => to,
        }
    }

    /// Translate a raw notify event into file events.
    ///
    /// Directory events, access events and metadata-only changes are
    /// dropped. A rename seen from one side only becomes a delete (moved
    /// out of the tree) or a create (moved in).
    #[must_use]
    pub fn from_notify(event: Event) -> Vec<Self> {
        let Event { kind, mut paths, .. } = event;

        match kind {
            EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
                Vec::new()
            }
            EventKind::Create(_) => files_only(paths).map(Self::Created).collect(),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() == 2 => {
                let to = paths.pop().unwrap_or_default();
                let from = paths.pop().unwrap_or_default();
                if to.is_dir() {
                    Vec::new()
                } else {
                    vec![Self::Moved { from, to }]
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                paths.into_iter().map(Self::Deleted).collect()
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                files_only(paths).map(Self::Created).collect()
            }
            EventKind::Modify(ModifyKind::Metadata(_) | ModifyKind::Name(_)) => Vec::new(),
            EventKind::Modify(_) => files_only(paths).map(Self::Modified).collect(),
            EventKind::Remove(_) => paths.into_iter().map(Self::Deleted).collect(),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
        }
    }
}

fn files_only(paths: Vec<PathBuf>) -> impl Iterator<Item = PathBuf> {
    paths.into_iter().filter(|p| !p.is_dir())
}

/// Joins the two halves of a rename that the OS reports separately.
///
/// inotify reports a rename inside the watched tree as `From`, `To` and
/// then `Both`, all carrying the same tracker. A tracked `From` is held until
/// its `To` arrives and becomes a single `Moved`; the trailing `Both` is then
/// dropped. A `From` that is never matched is released as `Deleted` by
/// [`RenameTracker::flush`].
#[derive(Debug, Default)]
pub(crate) struct RenameTracker {
    pending: Option<(usize, PathBuf)>,
    paired: Option<usize>,
}

impl RenameTracker {
    /// Whether a `From` half is waiting for its partner.
    pub(crate) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Translate one raw event, pairing rename halves where possible.
    pub(crate) fn translate(&mut self, event: Event) -> Vec<FileEvent> {
        let tracker = event.attrs.tracker();
        let rename = match event.kind {
            EventKind::Modify(ModifyKind::Name(mode)) => Some(mode),
            _ => None,
        };

        match (rename, tracker) {
            (Some(RenameMode::From), Some(cookie)) => {
                let released = self.flush();
                self.pending = event.paths.into_iter().next().map(|from| (cookie, from));
                released
            }
            (Some(RenameMode::To), Some(cookie))
                if self.pending.as_ref().is_some_and(|(held, _)| *held == cookie) =>
            {
                self.paired = Some(cookie);
                match (self.pending.take(), files_only(event.paths).next()) {
                    (Some((_, from)), Some(to)) => vec![FileEvent::Moved { from, to }],
                    _ => Vec::new(),
                }
            }
            (Some(RenameMode::Both), Some(cookie)) if self.paired == Some(cookie) => {
                self.paired = None;
                Vec::new()
            }
            _ => {
                let mut out = self.flush();
                out.extend(FileEvent::from_notify(event));
                out
            }
        }
    }

    /// Release an unmatched `From` half as a deletion.
    pub(crate) fn flush(&mut self) -> Vec<FileEvent> {
        self.pending
            .take()
            .map(|(_, path)| vec![FileEvent::Deleted(path)])
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, MetadataKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut e = Event::new(kind);
        for p in paths {
            e = e.add_path(PathBuf::from(p));
        }
        e
    }

    #[test]
    fn test_event_path() {
        let created = FileEvent::Created(PathBuf::from("/in/a.jpg"));
        assert_eq!(created.path(), &PathBuf::from("/in/a.jpg"));

        let moved = FileEvent::Moved {
            from: PathBuf::from("/in/old.jpg"),
            to: PathBuf::from("/in/new.jpg"),
        };
        assert_eq!(moved.path(), &PathBuf::from("/in/new.jpg"));
    }

    #[test]
    fn test_create_and_modify() {
        let created = FileEvent::from_notify(event(
            EventKind::Create(CreateKind::File),
            &["/in/a.jpg"],
        ));
        assert_eq!(created, vec![FileEvent::Created(PathBuf::from("/in/a.jpg"))]);

        let modified = FileEvent::from_notify(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/in/a.jpg"],
        ));
        assert_eq!(
            modified,
            vec![FileEvent::Modified(PathBuf::from("/in/a.jpg"))]
        );
    }

    #[test]
    fn test_rename_both() {
        let events = FileEvent::from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/in/old.jpg", "/in/new.jpg"],
        ));
        assert_eq!(
            events,
            vec![FileEvent::Moved {
                from: PathBuf::from("/in/old.jpg"),
                to: PathBuf::from("/in/new.jpg"),
            }]
        );
    }

    #[test]
    fn test_rename_one_side() {
        let out = FileEvent::from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/in/gone.jpg"],
        ));
        assert_eq!(out, vec![FileEvent::Deleted(PathBuf::from("/in/gone.jpg"))]);

        let inbound = FileEvent::from_notify(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/in/arrived.jpg"],
        ));
        assert_eq!(
            inbound,
            vec![FileEvent::Created(PathBuf::from("/in/arrived.jpg"))]
        );
    }

    #[test]
    fn test_remove() {
        let events = FileEvent::from_notify(event(
            EventKind::Remove(RemoveKind::File),
            &["/in/a.jpg"],
        ));
        assert_eq!(events, vec![FileEvent::Deleted(PathBuf::from("/in/a.jpg"))]);
    }

    #[test]
    fn test_ignored_kinds() {
        for kind in [
            EventKind::Access(AccessKind::Any),
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            EventKind::Create(CreateKind::Folder),
            EventKind::Remove(RemoveKind::Folder),
            EventKind::Other,
        ] {
            assert!(FileEvent::from_notify(event(kind, &["/in/a"])).is_empty());
        }
    }

    fn tracked(mode: RenameMode, cookie: usize, paths: &[&str]) -> Event {
        event(EventKind::Modify(ModifyKind::Name(mode)), paths).set_tracker(cookie)
    }

    #[test]
    fn test_tracker_pairs_inotify_rename() {
        let mut renames = RenameTracker::default();

        assert!(renames
            .translate(tracked(RenameMode::From, 7, &["/in/old.jpg"]))
            .is_empty());
        assert!(renames.is_pending());

        let moved = renames.translate(tracked(RenameMode::To, 7, &["/in/new.jpg"]));
        assert_eq!(
            moved,
            vec![FileEvent::Moved {
                from: PathBuf::from("/in/old.jpg"),
                to: PathBuf::from("/in/new.jpg"),
            }]
        );

        let both = renames.translate(tracked(
            RenameMode::Both,
            7,
            &["/in/old.jpg", "/in/new.jpg"],
        ));
        assert!(both.is_empty());
        assert!(!renames.is_pending());
    }

    #[test]
    fn test_tracker_releases_unmatched_from() {
        let mut renames = RenameTracker::default();
        assert!(renames
            .translate(tracked(RenameMode::From, 1, &["/in/gone.jpg"]))
            .is_empty());

        let out = renames.translate(event(
            EventKind::Create(CreateKind::File),
            &["/in/other.jpg"],
        ));
        assert_eq!(
            out,
            vec![
                FileEvent::Deleted(PathBuf::from("/in/gone.jpg")),
                FileEvent::Created(PathBuf::from("/in/other.jpg")),
            ]
        );

        renames.translate(tracked(RenameMode::From, 2, &["/in/later.jpg"]));
        assert_eq!(
            renames.flush(),
            vec![FileEvent::Deleted(PathBuf::from("/in/later.jpg"))]
        );
        assert!(renames.flush().is_empty());
    }

    #[test]
    fn test_tracker_untracked_rename_passes_through() {
        let mut renames = RenameTracker::default();
        let out = renames.translate(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/in/gone.jpg"],
        ));
        assert_eq!(out, vec![FileEvent::Deleted(PathBuf::from("/in/gone.jpg"))]);
    }
}
