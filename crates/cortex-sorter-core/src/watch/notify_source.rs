use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebouncedEvent, Debouncer, RecommendedCache};
use std::path::{Path, PathBuf};
use std::sync::mpsc::SyncSender;
use std::time::Duration;
use tracing::{debug, error, info};

use super::event::{FsEvent, FsEventKind};
use crate::error::Error;

/// Live OS watch on the source folder. Dropping it stops the watch and
/// releases its sender, which lets the orchestrator loop finish.
pub struct SourceWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    path: PathBuf,
}

impl SourceWatcher {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Watch `path` (non-recursively) and push created/modified files into the
/// bounded `events` channel. Sends block when the channel is full.
pub fn spawn_watcher(
    path: &Path,
    debounce: Duration,
    events: SyncSender<FsEvent>,
) -> Result<SourceWatcher, Error> {
    let mut debouncer = new_debouncer(
        debounce,
        None,
        move |result: Result<Vec<DebouncedEvent>, Vec<notify::Error>>| match result {
            Ok(batch) => {
                for event in batch {
                    for fs_event in translate(&event) {
                        if events.send(fs_event).is_err() {
                            debug!("Event queue closed, dropping event");
                            return;
                        }
                    }
                }
            }
            Err(errors) => {
                for e in errors {
                    error!("Watcher error: {:?}", e);
                }
            }
        },
    )?;

    debouncer.watch(path, RecursiveMode::NonRecursive)?;
    info!("Watching: {}", path.display());

    Ok(SourceWatcher {
        _debouncer: debouncer,
        path: path.to_path_buf(),
    })
}

/// Map a notify event to zero or more core events. Files renamed into the
/// folder arrive as `Modify(Name)` on some platforms and count as modified.
pub fn translate(event: &Event) -> Vec<FsEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => FsEventKind::Created,
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(_) => FsEventKind::Modified,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .map(|path| FsEvent {
            kind,
            path: path.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};

    #[test]
    fn test_create_and_modify_are_forwarded() {
        let created = Event::new(EventKind::Create(CreateKind::File)).add_path("/in/a.pdf".into());
        assert_eq!(translate(&created), vec![FsEvent::created("/in/a.pdf")]);

        let written = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path("/in/b.txt".into());
        assert_eq!(translate(&written), vec![FsEvent::modified("/in/b.txt")]);

        let renamed_in = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path("/in/c.zip".into());
        assert_eq!(translate(&renamed_in), vec![FsEvent::modified("/in/c.zip")]);
    }

    #[test]
    fn test_other_kinds_are_dropped() {
        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path("/in/a".into());
        assert!(translate(&removed).is_empty());

        let accessed = Event::new(EventKind::Access(AccessKind::Any)).add_path("/in/a".into());
        assert!(translate(&accessed).is_empty());

        let touched = Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)))
            .add_path("/in/a".into());
        assert!(translate(&touched).is_empty());
    }
}
