use futures::future::{try_join, try_join_all};
use serde_json::Value;

use super::{ids, ArchiveService};
use crate::auth::{Capability, Operator};
use crate::error::Result;
use crate::notify::AuditEntry;
use crate::store::{collections, Document};
use crate::types::ArchiveEntry;

const ASSIGNMENT_COLLECTIONS: [&str; 3] = [
    collections::ASSIGNMENTS,
    collections::STUDENT_ASSIGNMENTS,
    collections::SECTION_ASSIGNMENTS,
];

impl ArchiveService {
    /// Irrevocably drop one archived student. No cascade.
    pub async fn delete_student(&self, operator: &Operator, entry: &ArchiveEntry) -> Result<()> {
        let result = async {
            operator.require(Capability::PermanentlyDelete)?;
            self.delete_student_record(entry).await
        }
        .await;
        self.toast(result, |_| format!("Permanently deleted student {}", entry.display_name()))
    }

    pub(crate) async fn delete_student_record(&self, entry: &ArchiveEntry) -> Result<()> {
        self.store.delete(collections::DELETED_STUDENTS, &entry.id).await?;
        Ok(())
    }

    /// Irrevocably drop one archived admin. No cascade.
    pub async fn delete_admin(&self, operator: &Operator, entry: &ArchiveEntry) -> Result<()> {
        let result = async {
            operator.require(Capability::PermanentlyDelete)?;
            operator.require(Capability::ManageAdmins)?;
            self.delete_admin_record(entry).await
        }
        .await;
        self.toast(result, |_| format!("Permanently deleted admin {}", entry.display_name()))
    }

    pub(crate) async fn delete_admin_record(&self, entry: &ArchiveEntry) -> Result<()> {
        self.store.delete(collections::DELETED_ADMINS, &entry.id).await?;
        Ok(())
    }

    /// Permanently delete an archived quiz and every transitive reference
    /// to it: assignment documents in all three assignment collections and
    /// entries in student `assignedQuizzes` lists, matched under both the
    /// archived and the canonical id form. Safe to re-run after a partial
    /// failure; already-removed dependents simply no longer match.
    pub async fn delete_quiz(&self, operator: &Operator, entry: &ArchiveEntry) -> Result<()> {
        let result = async {
            operator.require(Capability::PermanentlyDelete)?;
            self.delete_quiz_record(operator, entry).await
        }
        .await;
        self.toast(result, |_| format!("Permanently deleted quiz {}", entry.display_name()))
    }

    pub(crate) async fn delete_quiz_record(
        &self,
        operator: &Operator,
        entry: &ArchiveEntry,
    ) -> Result<()> {
        // A record without originalData is corrupt; refuse before any write.
        super::restore::original_document(entry, "quiz")?;
        let match_ids = ids::quiz_match_set(entry);

        let mut assignment_deletes: Vec<(&'static str, String)> = Vec::new();
        for collection in ASSIGNMENT_COLLECTIONS {
            for (doc_id, doc) in self.store.get_all(collection).await? {
                let quiz_id = doc.get("quizId").and_then(Value::as_str);
                if quiz_id.map(|id| match_ids.contains(id)).unwrap_or(false) {
                    assignment_deletes.push((collection, doc_id));
                }
            }
        }

        // Only students whose list actually changes get an update.
        let mut student_updates: Vec<(String, Document)> = Vec::new();
        for (student_id, doc) in self.store.get_all(collections::STUDENTS).await? {
            let Some(Value::Array(assigned)) = doc.get("assignedQuizzes") else {
                continue;
            };
            let filtered: Vec<Value> = assigned
                .iter()
                .filter(|value| !ids::quiz_ref_matches(value, &match_ids))
                .cloned()
                .collect();
            if filtered.len() != assigned.len() {
                let mut fields = Document::new();
                fields.insert("assignedQuizzes".to_string(), Value::Array(filtered));
                student_updates.push((student_id, fields));
            }
        }

        tracing::info!(
            quiz = %entry.id,
            assignments = assignment_deletes.len(),
            students = student_updates.len(),
            "running quiz permanent-delete cascade"
        );

        // The dependents touch disjoint documents; no ordering between them.
        let deletes = try_join_all(
            assignment_deletes.iter().map(|(collection, id)| self.store.delete(collection, id)),
        );
        let updates = try_join_all(student_updates.iter().map(|(id, fields)| {
            self.store.update(collections::STUDENTS, id, fields.clone())
        }));
        try_join(deletes, updates).await?;

        // The archive document goes last, so a failed cascade can be retried.
        self.store.delete(collections::DELETED_QUIZZES, &entry.id).await?;
        if let Err(err) = self
            .notifier
            .append_audit(AuditEntry::new(
                &operator.email,
                "quiz_permanent_delete",
                format!("permanently deleted quiz {}", entry.display_name()),
            ))
            .await
        {
            tracing::warn!(error = %err, "audit append failed for quiz delete");
        }
        Ok(())
    }
}
