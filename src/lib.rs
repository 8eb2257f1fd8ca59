pub mod engine;
pub mod error;
pub mod sidecar;
pub mod store;
pub mod utils;
pub mod watch;

pub use engine::{GroupSession, SessionOptions, SessionState};
pub use error::{FileGroupsError, Result};
pub use sidecar::{
    Group, GroupId, GroupingDocument, SidecarManager, DEFAULT_GROUP_ID, DEFAULT_GROUP_TITLE,
    SIDECAR_FILENAME,
};
pub use store::{CasePolicy, GroupStore, GroupView, Snapshot};
#[cfg(test)]
pub use watch::MockWatcher;
pub use watch::{DirEvent, DirectoryWatcher, NotifyWatcher};
