use std::collections::BTreeSet;
use std::path::Path;

use tracing::warn;

use crate::sidecar::SIDECAR_FILENAME;

/// Whether a leaf name participates in grouping. The sidecar itself and
/// hidden files (which also covers atomic-write temp files) are invisible
/// to the engine.
pub fn is_tracked_name(name: &str) -> bool {
    !name.starts_with('.') && name != SIDECAR_FILENAME
}

/// Fresh listing of the tracked file names directly inside `dir`.
/// Subdirectories are not entries; only the directory's files are grouped.
pub fn list_entries(dir: &Path) -> std::io::Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            warn!("Skipping non-UTF8 file name: {:?}", file_name);
            continue;
        };
        if is_tracked_name(name) {
            names.insert(name.to_string());
        }
    }
    Ok(names)
}
