use serde_json::Value;

use super::{ids, ArchiveService};
use crate::auth::{Capability, Operator};
use crate::error::{ArchiveError, Result};
use crate::notify::AuditEntry;
use crate::store::{collections, Document};
use crate::types::ArchiveEntry;

impl ArchiveService {
    /// Move one archived student back to the live collection. The heavy
    /// lifting (record plus quiz-result history) is delegated to the
    /// student restorer; deleting the archive copy afterwards is
    /// best-effort, since the primary restore has already succeeded.
    pub async fn restore_student(&self, operator: &Operator, entry: &ArchiveEntry) -> Result<()> {
        let result = async {
            operator.require(Capability::RestoreRecords)?;
            self.restore_student_record(operator, entry).await
        }
        .await;
        self.toast(result, |_| format!("Restored student {}", entry.display_name()))
    }

    pub(crate) async fn restore_student_record(
        &self,
        operator: &Operator,
        entry: &ArchiveEntry,
    ) -> Result<()> {
        let original_id = ids::resolve_original_id(entry).ok_or_else(|| {
            ArchiveError::invalid_input(format!(
                "archived student {} has no resolvable original id",
                entry.id
            ))
        })?;

        self.restorer.restore_student(&original_id, &operator.email).await?;

        // The student is live at this point; a failed cleanup only leaves
        // a dangling archive document behind.
        if let Err(err) = self.store.delete(collections::DELETED_STUDENTS, &entry.id).await {
            tracing::warn!(
                archive_id = %entry.id,
                error = %err,
                "archive cleanup failed after successful student restore; document remains for a manual sweep"
            );
        }
        Ok(())
    }

    /// Write an archived quiz back to its canonical storage path and drop
    /// the archive copy. Mid-sequence failures surface to the caller; no
    /// rollback is attempted.
    pub async fn restore_quiz(&self, operator: &Operator, entry: &ArchiveEntry) -> Result<()> {
        let result = async {
            operator.require(Capability::RestoreRecords)?;
            self.restore_quiz_record(operator, entry).await
        }
        .await;
        self.toast(result, |_| format!("Restored quiz {}", entry.display_name()))
    }

    pub(crate) async fn restore_quiz_record(
        &self,
        operator: &Operator,
        entry: &ArchiveEntry,
    ) -> Result<()> {
        let data = original_document(entry, "quiz")?;
        let canonical_id = ids::resolve_original_id(entry).ok_or_else(|| {
            ArchiveError::invalid_input(format!(
                "archived quiz {} has no resolvable original id",
                entry.id
            ))
        })?;

        self.store.set(collections::QUIZZES, &canonical_id, data).await?;
        self.store.delete(collections::DELETED_QUIZZES, &entry.id).await?;
        if let Err(err) = self
            .notifier
            .append_audit(AuditEntry::new(
                &operator.email,
                "quiz_restore",
                format!("restored quiz {} ({})", entry.display_name(), canonical_id),
            ))
            .await
        {
            tracing::warn!(error = %err, "audit append failed for quiz restore");
        }
        Ok(())
    }

    /// Write an archived admin back to the admin collection, under its
    /// original id when known, else a freshly generated one.
    pub async fn restore_admin(&self, operator: &Operator, entry: &ArchiveEntry) -> Result<()> {
        let result = async {
            operator.require(Capability::RestoreRecords)?;
            operator.require(Capability::ManageAdmins)?;
            self.restore_admin_record(operator, entry).await
        }
        .await;
        self.toast(result, |_| format!("Restored admin {}", entry.display_name()))
    }

    pub(crate) async fn restore_admin_record(
        &self,
        _operator: &Operator,
        entry: &ArchiveEntry,
    ) -> Result<()> {
        let data = original_document(entry, "admin")?;
        let id = match entry.original_id.as_deref() {
            Some(original) if !original.is_empty() => original.to_string(),
            _ => self.store.generate_id(),
        };

        self.store.set(collections::ADMINS, &id, data).await?;
        self.store.delete(collections::DELETED_ADMINS, &entry.id).await?;
        Ok(())
    }
}

/// The entry's `originalData` as a document, or `InvalidInput` when it is
/// missing or not an object.
pub(crate) fn original_document(entry: &ArchiveEntry, kind: &str) -> Result<Document> {
    match &entry.original_data {
        Some(Value::Object(map)) => Ok(map.clone()),
        _ => Err(ArchiveError::invalid_input(format!(
            "archived {} {} is missing originalData",
            kind, entry.id
        ))),
    }
}
