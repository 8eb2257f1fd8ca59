mod notify_watcher;
mod types;

#[cfg(test)]
mod mock;

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

pub use notify_watcher::NotifyWatcher;
pub use types::DirEvent;

#[cfg(test)]
pub use mock::MockWatcher;

/// Seam between the engine and host filesystem notification. Implementations
/// own only the observation lifecycle: they translate raw notifications into
/// `DirEvent`s and enqueue them, never touching grouping state themselves.
#[async_trait]
pub trait DirectoryWatcher: Send + Sync {
    /// Begin observing `dir`, delivering normalized events into `events`.
    async fn start(&self, dir: &Path, events: mpsc::Sender<DirEvent>) -> Result<()>;

    /// Stop observing. Safe to call when not started.
    async fn stop(&self) -> Result<()>;
}
