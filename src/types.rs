use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Document;

/// Deletion reason stamped on student archive records produced as part of
/// a section deletion. Such records belong to the section, not to the
/// operator's own students view.
pub const SECTION_DELETION_REASON: &str = "Section Deletion";

/// Entity kinds the archive tracks, one per archive collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Student,
    Quiz,
    Admin,
    Section,
}

impl EntityKind {
    pub fn archive_collection(&self) -> &'static str {
        use crate::store::collections;
        match self {
            EntityKind::Student => collections::DELETED_STUDENTS,
            EntityKind::Quiz => collections::DELETED_QUIZZES,
            EntityKind::Admin => collections::DELETED_ADMINS,
            EntityKind::Section => collections::DELETED_SECTIONS,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Student => write!(f, "student"),
            EntityKind::Quiz => write!(f, "quiz"),
            EntityKind::Admin => write!(f, "admin"),
            EntityKind::Section => write!(f, "section"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Restore,
    #[serde(rename = "delete")]
    PermanentDelete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Restore => write!(f, "restore"),
            OperationKind::PermanentDelete => write!(f, "delete"),
        }
    }
}

/// Embedded member element carried on newer section archive documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentSnapshot {
    pub original_id: Option<String>,
    /// Id of a legacy per-student archive document, when one also exists.
    pub archive_id: Option<String>,
    pub name: Option<String>,
}

/// Typed view over an archive document. Every field except `id` comes from
/// the stored document; absent fields deserialize to their defaults so a
/// legacy record never fails to parse for missing metadata alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveEntry {
    #[serde(skip)]
    pub id: String,
    pub deleted_by: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub original_id: Option<String>,
    pub original_data: Option<Value>,
    pub deletion_reason: Option<String>,
    pub archived_from_section: Option<String>,
    pub archived_from_section_id: Option<String>,
    pub archived_students: Vec<StudentSnapshot>,
    pub student_count: Option<u32>,
}

impl ArchiveEntry {
    /// Parse a stored document into a typed entry. Returns `None` (and
    /// logs) when the document is structurally unreadable.
    pub fn from_document(collection: &str, id: &str, doc: &Document) -> Option<Self> {
        match serde_json::from_value::<ArchiveEntry>(Value::Object(doc.clone())) {
            Ok(mut entry) => {
                entry.id = id.to_string();
                Some(entry)
            }
            Err(err) => {
                tracing::warn!(collection, id, error = %err, "skipping unreadable archive document");
                None
            }
        }
    }

    /// An entry without `originalData` is corrupt: it cannot be restored
    /// and (for quizzes) not safely cascaded.
    pub fn has_original_data(&self) -> bool {
        matches!(&self.original_data, Some(v) if !v.is_null())
    }

    /// Member count shown for a section entry: the embedded array wins
    /// when non-empty, else the stored count field.
    pub fn effective_student_count(&self) -> usize {
        if !self.archived_students.is_empty() {
            self.archived_students.len()
        } else {
            self.student_count.unwrap_or(0) as usize
        }
    }

    pub fn display_name(&self) -> String {
        self.original_data
            .as_ref()
            .and_then(|data| data.get("name").or_else(|| data.get("title")))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Section payload carried in a section entry's `originalData`. Only the
/// name is interpreted; everything else is written back untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub name: String,
    #[serde(flatten)]
    pub extra: Document,
}

/// Uniform section-membership element, resolved once per section operation
/// from either the embedded array or the legacy per-student archive scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionMember {
    pub original_id: String,
    pub display_name: Option<String>,
    /// Legacy per-student archive document to clean up, when one exists.
    pub archive_doc_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipMode {
    /// Members live inline on the section archive document.
    Embedded,
    /// Members are separate documents in `deleted_students`.
    Legacy,
}

#[derive(Debug, Clone)]
pub struct SectionMembership {
    pub mode: MembershipMode,
    pub members: Vec<SectionMember>,
}

/// Outcome of a section restore or permanent delete.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionOutcome {
    pub processed: usize,
    pub attempted: usize,
    /// Id of the newly created live section (restore only).
    pub section_id: Option<String>,
}

/// Outcome of a bulk dispatch. `processed_ids` lets the caller drop the
/// finished records from its in-memory selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub attempted: usize,
    pub processed_ids: Vec<String>,
}
