use std::collections::HashSet;

use serde_json::Value;

use crate::types::ArchiveEntry;

/// Prefix legacy soft-delete code prepended to archive document ids.
/// Newer records carry an explicit `originalId` instead; the prefix rule
/// remains as the fallback for documents written before that change.
pub const ARCHIVE_ID_PREFIX: &str = "deleted_";

/// Strip the archive prefix, yielding the id the record had in its live
/// collection.
pub fn canonical_id(id: &str) -> &str {
    id.strip_prefix(ARCHIVE_ID_PREFIX).unwrap_or(id)
}

/// Resolve the live-collection id for an archive entry: the explicit
/// `originalId` when present, else derived from the archive id. Returns
/// `None` only when neither form yields a non-empty id.
pub fn resolve_original_id(entry: &ArchiveEntry) -> Option<String> {
    if let Some(original) = entry.original_id.as_deref() {
        if !original.is_empty() {
            return Some(original.to_string());
        }
    }
    let derived = canonical_id(&entry.id);
    if derived.is_empty() {
        None
    } else {
        Some(derived.to_string())
    }
}

/// All id forms under which dependent records may reference an archived
/// quiz. Assignment documents were written with either the archived or
/// the canonical id depending on when they were created.
pub fn quiz_match_set(entry: &ArchiveEntry) -> HashSet<String> {
    let mut ids = HashSet::new();
    ids.insert(entry.id.clone());
    ids.insert(canonical_id(&entry.id).to_string());
    if let Some(original) = entry.original_id.as_deref() {
        if !original.is_empty() {
            ids.insert(original.to_string());
        }
    }
    ids
}

/// Whether an `assignedQuizzes` element references one of the given ids.
/// Entries are objects carrying a `quizId` field; bare string entries are
/// tolerated.
pub fn quiz_ref_matches(value: &Value, ids: &HashSet<String>) -> bool {
    match value {
        Value::String(s) => ids.contains(s.as_str()),
        Value::Object(map) => map
            .get("quizId")
            .and_then(Value::as_str)
            .map(|s| ids.contains(s))
            .unwrap_or(false),
        _ => false,
    }
}
