use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use atomicwrites::{AllowOverwrite, AtomicFile};
use tracing::{debug, warn};

use super::codec;
use super::types::GroupingDocument;
use crate::error::{FileGroupsError, Result};

/// Name of the sidecar file stored inside the target directory. The sidecar
/// itself is never treated as a tracked entry.
pub const SIDECAR_FILENAME: &str = "file_groups.json";

/// Owns the sidecar path for one directory and moves documents between disk
/// and the codec. All writes are whole-file temp-then-rename replacements so
/// an interrupted process never leaves a half-written sidecar.
pub struct SidecarManager {
    sidecar_path: PathBuf,
}

impl SidecarManager {
    pub fn new(directory: &Path) -> Self {
        Self {
            sidecar_path: directory.join(SIDECAR_FILENAME),
        }
    }

    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar_path
    }

    pub fn sidecar_exists(&self) -> bool {
        self.sidecar_path.exists()
    }

    /// Loads the grouping document. A missing or unreadable sidecar yields
    /// the default document; sidecar problems never block a session.
    pub fn load_or_default(&self) -> GroupingDocument {
        match fs::read(&self.sidecar_path) {
            Ok(raw) => {
                debug!("Loading sidecar from {:?}", self.sidecar_path);
                codec::decode(&raw)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => GroupingDocument::default(),
            Err(e) => {
                warn!(
                    "Failed to read sidecar at {:?}: {}, using default document",
                    self.sidecar_path, e
                );
                GroupingDocument::default()
            }
        }
    }

    pub fn save(&self, doc: &GroupingDocument) -> Result<()> {
        let mut stamped = doc.clone();
        stamped.saved_at = Some(chrono::Utc::now());
        let bytes = codec::encode(&stamped)?;

        debug!("Saving sidecar to {:?}", self.sidecar_path);
        let af = AtomicFile::new(&self.sidecar_path, AllowOverwrite);
        af.write(|f| f.write_all(&bytes))
            .map_err(std::io::Error::other)?;
        Ok(())
    }

    /// Saves with a single retry. The caller treats a final failure as a
    /// non-fatal warning: in-memory state stays authoritative and the next
    /// successful mutation writes it out.
    pub fn save_with_retry(&self, doc: &GroupingDocument) -> Result<()> {
        match self.save(doc) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!(
                    "Sidecar write failed ({}), retrying once: {:?}",
                    first, self.sidecar_path
                );
                self.save(doc)
                    .map_err(|e| FileGroupsError::PersistenceWriteFailed {
                        path: self.sidecar_path.clone(),
                        message: e.to_string(),
                    })
            }
        }
    }
}
