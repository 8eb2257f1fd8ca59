use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use super::types::DirEvent;
use super::DirectoryWatcher;
use crate::error::Result;
use crate::utils::paths::is_tracked_name;

/// `notify`-backed watcher for a single directory. Observation errors are
/// logged and the watch continues; at worst the session degrades to no live
/// updates without closing.
pub struct NotifyWatcher {
    watcher: Arc<Mutex<Option<RecommendedWatcher>>>,
}

impl Default for NotifyWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyWatcher {
    pub fn new() -> Self {
        Self {
            watcher: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl DirectoryWatcher for NotifyWatcher {
    async fn start(&self, dir: &Path, events: mpsc::Sender<DirEvent>) -> Result<()> {
        let mut guard = self.watcher.lock().await;
        if guard.is_some() {
            info!("Directory watcher already running");
            return Ok(());
        }

        let watched_dir = dir.to_path_buf();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for dir_event in translate(&watched_dir, event) {
                        // The notify callback runs on its own thread; a
                        // blocking send into the bounded channel is safe here.
                        if events.blocking_send(dir_event).is_err() {
                            debug!("Event channel closed, dropping directory event");
                        }
                    }
                }
                Err(e) => {
                    error!("Directory watch error (watch continues): {}", e);
                }
            }
        })?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        info!("Watching directory: {}", dir.display());

        *guard = Some(watcher);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.watcher.lock().await.take().is_some() {
            info!("Directory watcher stopped");
        }
        Ok(())
    }
}

/// Maps a raw notify event onto the normalized stream. Only direct children
/// of the watched directory count, and untracked names (the sidecar, hidden
/// and temp files) are dropped at the source.
fn translate(dir: &Path, event: Event) -> Vec<DirEvent> {
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .iter()
            .filter_map(|p| entry_name(dir, p))
            .map(DirEvent::Appeared)
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .filter_map(|p| entry_name(dir, p))
            .map(DirEvent::Disappeared)
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            match (
                event.paths.first().and_then(|p| entry_name(dir, p)),
                event.paths.get(1).and_then(|p| entry_name(dir, p)),
            ) {
                (Some(old), Some(new)) => vec![DirEvent::Renamed { old, new }],
                // One side filtered out (e.g. rename onto the sidecar name):
                // fall back to the unambiguous halves.
                (Some(old), None) => vec![DirEvent::Disappeared(old)],
                (None, Some(new)) => vec![DirEvent::Appeared(new)],
                (None, None) => Vec::new(),
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .filter_map(|p| entry_name(dir, p))
            .map(DirEvent::Disappeared)
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .filter_map(|p| entry_name(dir, p))
            .map(DirEvent::Appeared)
            .collect(),
        EventKind::Modify(ModifyKind::Name(_)) => {
            // Host could not say which side of the rename this is; report
            // by current existence and let the full-listing reconcile sort
            // it out.
            event
                .paths
                .iter()
                .filter_map(|p| entry_name(dir, p).map(|name| (name, p.exists())))
                .map(|(name, exists)| {
                    if exists {
                        DirEvent::Appeared(name)
                    } else {
                        DirEvent::Disappeared(name)
                    }
                })
                .collect()
        }
        // Content and metadata changes do not affect membership.
        _ => Vec::new(),
    }
}

fn entry_name(dir: &Path, path: &PathBuf) -> Option<String> {
    if path.parent() != Some(dir) {
        return None;
    }
    let name = path.file_name()?.to_str()?;
    is_tracked_name(name).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::CreateKind;

    fn create_event(paths: Vec<PathBuf>) -> Event {
        Event {
            kind: EventKind::Create(CreateKind::File),
            paths,
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_translate_create() {
        let dir = Path::new("/watched");
        let events = translate(dir, create_event(vec![PathBuf::from("/watched/a.txt")]));
        assert_eq!(events, vec![DirEvent::Appeared("a.txt".to_string())]);
    }

    #[test]
    fn test_translate_ignores_sidecar_and_hidden_files() {
        let dir = Path::new("/watched");
        let events = translate(
            dir,
            create_event(vec![
                PathBuf::from("/watched/file_groups.json"),
                PathBuf::from("/watched/.tmpXYZ123"),
            ]),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_translate_ignores_non_children() {
        let dir = Path::new("/watched");
        let events = translate(
            dir,
            create_event(vec![PathBuf::from("/watched/sub/a.txt")]),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_translate_rename_pair() {
        let dir = Path::new("/watched");
        let event = Event {
            kind: EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            paths: vec![
                PathBuf::from("/watched/old.txt"),
                PathBuf::from("/watched/new.txt"),
            ],
            attrs: Default::default(),
        };
        assert_eq!(
            translate(dir, event),
            vec![DirEvent::Renamed {
                old: "old.txt".to_string(),
                new: "new.txt".to_string(),
            }]
        );
    }
}
