pub mod codec;
mod manager;
mod types;

pub use manager::{SidecarManager, SIDECAR_FILENAME};
pub use types::{Group, GroupId, GroupingDocument, DEFAULT_GROUP_ID, DEFAULT_GROUP_TITLE};
