//! In-memory state machine over the grouping document. Every operation
//! either succeeds and preserves the partition invariant (each tracked entry
//! in exactly one group, default group always present) or fails and leaves
//! the store untouched.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{FileGroupsError, Result};
use crate::sidecar::{Group, GroupId, GroupingDocument};

/// Entry identity comparator. Host filesystems disagree on case sensitivity,
/// so the policy is fixed at construction and applied to every name
/// comparison the store makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePolicy {
    Sensitive,
    Insensitive,
}

impl CasePolicy {
    /// Matches the conventional behavior of the host platform's filesystem.
    pub fn host_default() -> Self {
        if cfg!(any(target_os = "windows", target_os = "macos")) {
            CasePolicy::Insensitive
        } else {
            CasePolicy::Sensitive
        }
    }

    pub fn canon(&self, name: &str) -> String {
        match self {
            CasePolicy::Sensitive => name.to_string(),
            CasePolicy::Insensitive => name.to_lowercase(),
        }
    }
}

impl std::str::FromStr for CasePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sensitive" => Ok(CasePolicy::Sensitive),
            "insensitive" => Ok(CasePolicy::Insensitive),
            _ => Err(anyhow::anyhow!(
                "Invalid case policy: {}. Must be 'sensitive' or 'insensitive'",
                s
            )),
        }
    }
}

impl std::fmt::Display for CasePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CasePolicy::Sensitive => write!(f, "sensitive"),
            CasePolicy::Insensitive => write!(f, "insensitive"),
        }
    }
}

/// Read-only projection of the store for rendering: ordered groups, each
/// with its ordered entry list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub groups: Vec<GroupView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub id: GroupId,
    pub title: String,
    pub is_default: bool,
    pub entries: Vec<String>,
}

pub struct GroupStore {
    doc: GroupingDocument,
    case: CasePolicy,
}

impl GroupStore {
    pub fn new(case: CasePolicy) -> Self {
        Self {
            doc: GroupingDocument::default(),
            case,
        }
    }

    /// Wraps an already-normalized document (the codec guarantees the
    /// default group exists and no entry is assigned twice).
    pub fn from_document(doc: GroupingDocument, case: CasePolicy) -> Self {
        Self { doc, case }
    }

    pub fn document(&self) -> &GroupingDocument {
        &self.doc
    }

    /// Creates a new empty group appended after the last existing group.
    /// Titles are display strings: empty and duplicate titles are allowed.
    pub fn add_header(&mut self, title: &str) -> GroupId {
        let id = self.doc.next_group_id();
        self.doc.groups.push(Group::new(id.clone(), title));
        id
    }

    /// Retitles a group. The default group may be retitled; its id and role
    /// never change.
    pub fn rename_header(&mut self, id: &GroupId, title: &str) -> Result<()> {
        let group = self
            .doc
            .group_mut(id)
            .ok_or_else(|| FileGroupsError::GroupNotFound {
                id: id.to_string(),
            })?;
        group.title = title.to_string();
        Ok(())
    }

    /// Removes a group from the order list, re-homing its entries to the end
    /// of the default group in their existing relative order.
    pub fn delete_header(&mut self, id: &GroupId) -> Result<()> {
        if *id == self.doc.default_group {
            return Err(FileGroupsError::InvalidOperation {
                message: "cannot delete the default group".to_string(),
            });
        }
        let idx = self
            .doc
            .groups
            .iter()
            .position(|g| &g.id == id)
            .ok_or_else(|| FileGroupsError::GroupNotFound {
                id: id.to_string(),
            })?;

        let orphaned = self.doc.groups.remove(idx).entries;
        self.doc.default_group_mut().entries.extend(orphaned);
        Ok(())
    }

    /// Moves an entry into `target` at `position` (clamped to the valid
    /// range), removing it from whichever group currently holds it. Removal
    /// is a no-op if the entry is not tracked yet.
    pub fn move_entry(&mut self, name: &str, target: &GroupId, position: usize) -> Result<()> {
        if self.doc.group(target).is_none() {
            return Err(FileGroupsError::GroupNotFound {
                id: target.to_string(),
            });
        }

        let case = self.case;
        let key = case.canon(name);
        for group in &mut self.doc.groups {
            group.entries.retain(|e| case.canon(e) != key);
        }

        let group = self
            .doc
            .group_mut(target)
            .ok_or_else(|| FileGroupsError::GroupNotFound {
                id: target.to_string(),
            })?;
        let position = position.min(group.entries.len());
        group.entries.insert(position, name.to_string());
        Ok(())
    }

    /// Aligns tracked assignments with the true disk listing: entries no
    /// longer on disk are pruned from their groups, entries newly on disk
    /// are appended to the default group. Idempotent; returns whether
    /// anything changed.
    pub fn reconcile_entries(&mut self, disk: &BTreeSet<String>) -> bool {
        let case = self.case;
        let disk_keys: BTreeSet<String> = disk.iter().map(|n| case.canon(n)).collect();

        let mut changed = false;
        for group in &mut self.doc.groups {
            let before = group.entries.len();
            group.entries.retain(|e| disk_keys.contains(&case.canon(e)));
            changed |= group.entries.len() != before;
        }

        let mut tracked_keys: BTreeSet<String> =
            self.doc.all_entries().map(|e| case.canon(e)).collect();
        for name in disk {
            // insert() keeps later case-variants of an already-added key out
            if tracked_keys.insert(case.canon(name)) {
                self.doc.default_group_mut().entries.push(name.clone());
                changed = true;
            }
        }

        changed
    }

    pub fn contains_entry(&self, name: &str) -> bool {
        let key = self.case.canon(name);
        self.doc.all_entries().any(|e| self.case.canon(e) == key)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            groups: self
                .doc
                .groups
                .iter()
                .map(|g| GroupView {
                    id: g.id.clone(),
                    title: g.title.clone(),
                    is_default: g.id == self.doc.default_group,
                    entries: g.entries.clone(),
                })
                .collect(),
        }
    }
}
