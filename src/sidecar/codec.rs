//! Pure byte-buffer codec for the grouping document. No I/O happens here, so
//! decode/encode are testable in isolation. Decoding never fails: a missing,
//! truncated, or hand-mangled sidecar degrades to the default document so a
//! corrupt sidecar can never hide the user's files.

use std::collections::HashSet;

use tracing::warn;

use super::types::{Group, GroupingDocument, DEFAULT_GROUP_TITLE};
use crate::error::Result;

/// Parses a sidecar buffer into a normalized grouping document. Any parse or
/// schema failure yields `GroupingDocument::default()`.
pub fn decode(raw: &[u8]) -> GroupingDocument {
    if raw.is_empty() {
        return GroupingDocument::default();
    }

    match serde_json::from_slice::<GroupingDocument>(raw) {
        Ok(doc) => normalize(doc),
        Err(e) => {
            warn!("Sidecar is unreadable ({}), starting from default document", e);
            GroupingDocument::default()
        }
    }
}

/// Deterministic serialization: pretty JSON with a trailing newline.
/// `decode(encode(doc))` reproduces an equivalent document.
pub fn encode(doc: &GroupingDocument) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(doc)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Restores document invariants after a successful parse: the default group
/// exists, entry names are plain leaf names, and no entry appears twice
/// (first assignment wins).
fn normalize(mut doc: GroupingDocument) -> GroupingDocument {
    let default_id = doc.default_group.clone();
    if doc.group(&default_id).is_none() {
        doc.groups
            .insert(0, Group::new(default_id, DEFAULT_GROUP_TITLE));
    }

    let mut seen = HashSet::new();
    for group in &mut doc.groups {
        group.entries.retain(|name| {
            if name.is_empty() || name.contains('/') || name.contains('\\') {
                warn!("Dropping invalid entry name from sidecar: {:?}", name);
                return false;
            }
            seen.insert(name.clone())
        });
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidecar::types::{GroupId, DEFAULT_GROUP_ID};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_preserves_document() {
        let mut doc = GroupingDocument::default();
        doc.default_group_mut().entries = vec!["a.txt".into(), "b.txt".into()];
        let mut work = Group::new(GroupId::new("g1"), "Work");
        work.entries = vec!["report.pdf".into()];
        doc.groups.push(work);
        doc.saved_at = Some(chrono::Utc::now());

        let encoded = encode(&doc).unwrap();
        let decoded = decode(&encoded);
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_decode_empty_buffer_soft_fails() {
        let doc = decode(b"");
        assert_eq!(doc, GroupingDocument::default());
    }

    #[test]
    fn test_decode_garbage_soft_fails() {
        let doc = decode(b"{ not json at all !!!");
        assert_eq!(doc, GroupingDocument::default());
    }

    #[test]
    fn test_decode_wrong_shape_soft_fails() {
        // Valid JSON, wrong schema
        let doc = decode(br#"{"groups": "nope"}"#);
        assert_eq!(doc, GroupingDocument::default());
    }

    #[test]
    fn test_decode_restores_missing_default_group() {
        let raw = br#"{"groups": [{"id": "g1", "title": "Work", "entries": ["a.txt"]}]}"#;
        let doc = decode(raw);
        assert_eq!(doc.groups[0].id.as_str(), DEFAULT_GROUP_ID);
        assert!(doc.groups[0].entries.is_empty());
        assert_eq!(doc.groups[1].title, "Work");
    }

    #[test]
    fn test_decode_drops_duplicate_and_pathlike_entries() {
        let raw = br#"{
            "default_group": "top",
            "groups": [
                {"id": "top", "title": "default section", "entries": ["a.txt", "../evil", "b.txt"]},
                {"id": "g1", "title": "Work", "entries": ["a.txt", "c.txt"]}
            ]
        }"#;
        let doc = decode(raw);
        assert_eq!(doc.groups[0].entries, vec!["a.txt", "b.txt"]);
        assert_eq!(doc.groups[1].entries, vec!["c.txt"]);
    }
}
