use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved id of the always-present default group.
pub const DEFAULT_GROUP_ID: &str = "top";

/// Title given to the default group when a directory is first opened.
pub const DEFAULT_GROUP_TITLE: &str = "default section";

const DOCUMENT_VERSION: &str = "1.0";

/// Stable opaque identifier for a group. Titles are display strings and may
/// collide; ids never do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn default_group() -> Self {
        Self(DEFAULT_GROUP_ID.to_string())
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_GROUP_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, ordered bucket of entry names. Group order is the position in
/// `GroupingDocument::groups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub title: String,
    #[serde(default)]
    pub entries: Vec<String>,
}

impl Group {
    pub fn new(id: GroupId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            entries: Vec::new(),
        }
    }
}

/// The persisted grouping state for one directory: ordered groups plus the
/// marker for which group is the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "GroupId::default_group")]
    pub default_group: GroupId,
    pub groups: Vec<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

impl Default for GroupingDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            default_group: GroupId::default_group(),
            groups: vec![Group::new(GroupId::default_group(), DEFAULT_GROUP_TITLE)],
            saved_at: None,
        }
    }
}

impl GroupingDocument {
    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| &g.id == id)
    }

    pub fn group_mut(&mut self, id: &GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| &g.id == id)
    }

    pub fn default_group_mut(&mut self) -> &mut Group {
        let idx = self
            .groups
            .iter()
            .position(|g| g.id == self.default_group)
            .unwrap_or(0);
        &mut self.groups[idx]
    }

    /// Allocates the next unused `g<N>` id by scanning existing group ids.
    /// Keeps ids stable across reloads without tracking a counter.
    pub fn next_group_id(&self) -> GroupId {
        let max = self
            .groups
            .iter()
            .filter_map(|g| g.id.as_str().strip_prefix('g'))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        GroupId::new(format!("g{}", max + 1))
    }

    pub fn all_entries(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().flat_map(|g| g.entries.iter().map(String::as_str))
    }
}
