use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::types::DirEvent;
use super::DirectoryWatcher;
use crate::error::Result;

/// Test watcher that lets a test inject normalized events by hand.
#[derive(Clone, Default)]
pub struct MockWatcher {
    sender: Arc<Mutex<Option<mpsc::Sender<DirEvent>>>>,
}

impl MockWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_running(&self) -> bool {
        self.sender.lock().await.is_some()
    }

    /// Delivers an event as if the host filesystem had reported it.
    pub async fn emit(&self, event: DirEvent) {
        let guard = self.sender.lock().await;
        if let Some(tx) = guard.as_ref() {
            tx.send(event).await.expect("engine event channel closed");
        }
    }
}

#[async_trait]
impl DirectoryWatcher for MockWatcher {
    async fn start(&self, _dir: &Path, events: mpsc::Sender<DirEvent>) -> Result<()> {
        *self.sender.lock().await = Some(events);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.sender.lock().await.take();
        Ok(())
    }
}
