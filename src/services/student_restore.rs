use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::archive::ids;
use crate::store::{collections, Document, DocumentStore, StoreError};
use crate::types::ArchiveEntry;

/// Collaborator that revives a student record plus its quiz-result
/// history, keyed by original student id and acting operator. Treated as
/// atomic by the archive services: they never duplicate its work.
#[async_trait]
pub trait StudentRestorer: Send + Sync {
    async fn restore_student(&self, original_id: &str, restored_by: &str)
        -> Result<(), StoreError>;
}

/// Store-backed restorer: finds the student's archive document, writes its
/// `originalData` back to the live collection stamped with who restored it
/// and when. Quiz-result history travels inside `originalData`.
pub struct StoreStudentRestorer {
    store: Arc<dyn DocumentStore>,
}

impl StoreStudentRestorer {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn find_archive_entry(
        &self,
        original_id: &str,
    ) -> Result<Option<ArchiveEntry>, StoreError> {
        let docs = self.store.get_all(collections::DELETED_STUDENTS).await?;
        for (id, doc) in &docs {
            let Some(entry) = ArchiveEntry::from_document(collections::DELETED_STUDENTS, id, doc)
            else {
                continue;
            };
            if ids::resolve_original_id(&entry).as_deref() == Some(original_id) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl StudentRestorer for StoreStudentRestorer {
    async fn restore_student(
        &self,
        original_id: &str,
        restored_by: &str,
    ) -> Result<(), StoreError> {
        let entry = self
            .find_archive_entry(original_id)
            .await?
            .ok_or_else(|| StoreError::not_found(collections::DELETED_STUDENTS, original_id))?;

        let mut doc: Document = match &entry.original_data {
            Some(Value::Object(map)) => map.clone(),
            _ => {
                return Err(StoreError::backend(format!(
                    "archived student {} has no usable originalData",
                    entry.id
                )))
            }
        };
        doc.insert("restoredBy".to_string(), Value::String(restored_by.to_string()));
        doc.insert("restoredAt".to_string(), Value::String(Utc::now().to_rfc3339()));

        self.store.set(collections::STUDENTS, original_id, doc).await
    }
}
