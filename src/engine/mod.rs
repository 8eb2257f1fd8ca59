//! Session orchestrator: owns the store for one directory, reconciles it
//! against watcher events and user commands, and persists every effective
//! change through the sidecar manager. All mutations are serialized through
//! one mutex, so watcher-driven reconciliation and user commands never
//! interleave and sidecar writes never race.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{FileGroupsError, Result};
use crate::sidecar::{GroupId, SidecarManager};
use crate::store::{CasePolicy, GroupStore, Snapshot};
use crate::utils::paths::list_entries;
use crate::watch::{DirEvent, DirectoryWatcher};

/// Tunables fixed at session start. Nothing reconfigures a running engine
/// from outside its command interface.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Quiescence window for coalescing bursts of filesystem events into a
    /// single reconciliation and save.
    pub debounce: Duration,
    pub case: CasePolicy,
    /// Capacity of the bounded watcher event channel.
    pub event_buffer: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            case: CasePolicy::host_default(),
            event_buffer: 256,
        }
    }
}

/// Lifecycle of a directory session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Loading,
    Active,
    Closing,
    Closed,
}

struct Inner {
    store: GroupStore,
    sidecar: SidecarManager,
    state: SessionState,
}

impl Inner {
    fn ensure_active(&self) -> Result<()> {
        match self.state {
            SessionState::Active => Ok(()),
            _ => Err(FileGroupsError::SessionClosed),
        }
    }

    /// Writes the current document out. A failed write is a non-fatal
    /// warning: in-memory state stays authoritative and the next mutation
    /// retries.
    fn persist(&mut self) {
        if let Err(e) = self.sidecar.save_with_retry(self.store.document()) {
            warn!("{}", e);
        }
    }
}

/// One open directory session. Obtained from [`GroupSession::open`], closed
/// with [`GroupSession::close`].
pub struct GroupSession {
    directory: PathBuf,
    inner: Arc<Mutex<Inner>>,
    snapshot_tx: Arc<watch::Sender<Snapshot>>,
    watcher: Arc<dyn DirectoryWatcher>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for GroupSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupSession")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

impl GroupSession {
    /// Opens a session on `directory`: loads the sidecar (soft-failing to
    /// the default document), reconciles it against a fresh listing, writes
    /// the result back if anything changed or no sidecar existed yet, then
    /// starts live observation.
    ///
    /// Fails only if the directory itself cannot be listed.
    pub async fn open(
        directory: impl Into<PathBuf>,
        watcher: Arc<dyn DirectoryWatcher>,
        options: SessionOptions,
    ) -> Result<Self> {
        let directory = directory.into();
        info!("Opening directory session: {}", directory.display());

        let listing = list_entries(&directory).map_err(|source| {
            FileGroupsError::DirectoryInaccessible {
                path: directory.clone(),
                source,
            }
        })?;

        let sidecar = SidecarManager::new(&directory);
        let had_sidecar = sidecar.sidecar_exists();
        let mut store = GroupStore::from_document(sidecar.load_or_default(), options.case);

        // The sidecar may be stale relative to disk (files changed while no
        // session was open); align before anything is shown.
        let changed = store.reconcile_entries(&listing);

        let mut inner = Inner {
            store,
            sidecar,
            state: SessionState::Loading,
        };
        if changed || !had_sidecar {
            inner.persist();
        }

        let (snapshot_tx, _) = watch::channel(inner.store.snapshot());
        let snapshot_tx = Arc::new(snapshot_tx);

        let (event_tx, event_rx) = mpsc::channel(options.event_buffer);
        watcher.start(&directory, event_tx).await?;

        inner.state = SessionState::Active;
        let inner = Arc::new(Mutex::new(inner));

        let loop_handle = tokio::spawn(event_loop(
            event_rx,
            options.debounce,
            directory.clone(),
            inner.clone(),
            snapshot_tx.clone(),
        ));

        Ok(Self {
            directory,
            inner,
            snapshot_tx,
            watcher,
            loop_handle: Mutex::new(Some(loop_handle)),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Current view for rendering: ordered groups, each with its ordered
    /// entry list.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Change notifications: the receiver observes every published snapshot,
    /// so a UI can re-render without polling.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn add_header(&self, title: &str) -> Result<GroupId> {
        let mut inner = self.inner.lock().await;
        inner.ensure_active()?;
        let id = inner.store.add_header(title);
        debug!("Added header {} ({:?})", id, title);
        inner.persist();
        self.publish(&inner);
        Ok(id)
    }

    pub async fn rename_header(&self, id: &GroupId, title: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_active()?;
        inner.store.rename_header(id, title)?;
        inner.persist();
        self.publish(&inner);
        Ok(())
    }

    pub async fn delete_header(&self, id: &GroupId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_active()?;
        inner.store.delete_header(id)?;
        inner.persist();
        self.publish(&inner);
        Ok(())
    }

    pub async fn move_entry(&self, name: &str, target: &GroupId, position: usize) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_active()?;
        inner.store.move_entry(name, target, position)?;
        inner.persist();
        self.publish(&inner);
        Ok(())
    }

    /// Forces a full reconcile against the current listing. This is the same
    /// path the live loop takes; hosts without filesystem notification can
    /// call it on their own schedule.
    pub async fn rescan(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.ensure_active()?;
        let listing = list_entries(&self.directory).map_err(|source| {
            FileGroupsError::DirectoryInaccessible {
                path: self.directory.clone(),
                source,
            }
        })?;
        if inner.store.reconcile_entries(&listing) {
            inner.persist();
            self.publish(&inner);
        }
        Ok(())
    }

    /// Resolves a tracked entry to an absolute path for the host's
    /// "open with default application" collaborator.
    pub async fn resolve_entry(&self, name: &str) -> Result<PathBuf> {
        let inner = self.inner.lock().await;
        inner.ensure_active()?;
        if !inner.store.contains_entry(name) {
            return Err(FileGroupsError::EntryNotFound {
                name: name.to_string(),
            });
        }
        let path = self.directory.join(name);
        if !path.is_file() {
            return Err(FileGroupsError::EntryNotFound {
                name: name.to_string(),
            });
        }
        Ok(path)
    }

    /// Stops observation, flushes any pending debounced reconciliation, and
    /// transitions the session to `Closed`. Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                SessionState::Closing | SessionState::Closed => return Ok(()),
                _ => inner.state = SessionState::Closing,
            }
        }

        // Stopping the watcher drops the event sender; the loop drains what
        // is pending, runs a final reconcile if needed, and exits.
        self.watcher.stop().await?;
        if let Some(handle) = self.loop_handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Event loop ended abnormally: {}", e);
            }
        }

        let mut inner = self.inner.lock().await;
        inner.state = SessionState::Closed;
        info!("Closed directory session: {}", self.directory.display());
        Ok(())
    }

    fn publish(&self, inner: &Inner) {
        self.snapshot_tx.send_replace(inner.store.snapshot());
    }
}

/// Single-writer live loop: absorbs each burst of directory events until the
/// debounce window goes quiet, then recomputes the full listing and
/// reconciles once. Recomputing rather than patching absorbs duplicate and
/// out-of-order events, and renames delivered as delete+create pairs.
async fn event_loop(
    mut events: mpsc::Receiver<DirEvent>,
    debounce: Duration,
    directory: PathBuf,
    inner: Arc<Mutex<Inner>>,
    snapshot_tx: Arc<watch::Sender<Snapshot>>,
) {
    while let Some(event) = events.recv().await {
        debug!("Directory event: {} {:?}", event.kind(), event);

        let mut closed = false;
        loop {
            match tokio::time::timeout(debounce, events.recv()).await {
                Ok(Some(more)) => {
                    debug!("Coalescing event: {} {:?}", more.kind(), more);
                }
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break, // quiet long enough
            }
        }

        reconcile_once(&directory, &inner, &snapshot_tx).await;
        if closed {
            return;
        }
    }
}

async fn reconcile_once(
    directory: &Path,
    inner: &Mutex<Inner>,
    snapshot_tx: &watch::Sender<Snapshot>,
) {
    let mut inner = inner.lock().await;
    if inner.state == SessionState::Closed {
        return;
    }

    let listing = match list_entries(directory) {
        Ok(listing) => listing,
        Err(e) => {
            warn!(
                "Cannot list {} for reconciliation: {}",
                directory.display(),
                e
            );
            return;
        }
    };

    if inner.store.reconcile_entries(&listing) {
        inner.persist();
        snapshot_tx.send_replace(inner.store.snapshot());
    }
}
