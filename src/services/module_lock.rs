use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::auth::{Capability, Operator};
use crate::error::Result;
use crate::notify::{AuditEntry, Notifier};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::store::{collections, CollectionSnapshot, Document, DocumentStore, StoreError};

/// The four fixed subject modules whose lesson access is gated per quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectModule {
    Math,
    Science,
    English,
    Filipino,
}

impl SubjectModule {
    pub fn key(&self) -> &'static str {
        match self {
            SubjectModule::Math => "math",
            SubjectModule::Science => "science",
            SubjectModule::English => "english",
            SubjectModule::Filipino => "filipino",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quarter {
    #[serde(rename = "q1")]
    First,
    #[serde(rename = "q2")]
    Second,
    #[serde(rename = "q3")]
    Third,
    #[serde(rename = "q4")]
    Fourth,
}

impl Quarter {
    pub fn key(&self) -> &'static str {
        match self {
            Quarter::First => "q1",
            Quarter::Second => "q2",
            Quarter::Third => "q3",
            Quarter::Fourth => "q4",
        }
    }
}

/// Id of the shared lock document for one module in one quarter, and the
/// flat flag mirrored onto student records for legacy per-student gating.
pub fn lock_doc_id(module: SubjectModule, quarter: Quarter) -> String {
    format!("{}_{}", module.key(), quarter.key())
}

pub fn student_lock_field(module: SubjectModule, quarter: Quarter) -> String {
    format!("{}_{}_locked", module.key(), quarter.key())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockOutcome {
    pub updated: usize,
    pub attempted: usize,
}

/// Toggles the shared per-module lock document and mirrors the flag onto
/// every student in a chosen section.
pub struct ModuleLockController {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
}

impl ModuleLockController {
    pub fn new(store: Arc<dyn DocumentStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Read the current lock state. A missing document means unlocked.
    pub async fn lock_state(
        &self,
        module: SubjectModule,
        quarter: Quarter,
    ) -> Result<bool, StoreError> {
        let doc = self.store.get(collections::MODULE_LOCKS, &lock_doc_id(module, quarter)).await?;
        Ok(doc
            .and_then(|d| d.get("locked").and_then(Value::as_bool))
            .unwrap_or(false))
    }

    /// Live subscription to the lock collection for dashboard rendering.
    pub async fn watch(&self) -> Result<watch::Receiver<CollectionSnapshot>, StoreError> {
        self.store.subscribe(collections::MODULE_LOCKS).await
    }

    /// Write the new lock state, then mirror it per student. A failed
    /// shared-document write aborts before any student is touched;
    /// per-student failures are logged and skipped, reported via the
    /// partial count.
    pub async fn set_locked(
        &self,
        operator: &Operator,
        module: SubjectModule,
        quarter: Quarter,
        locked: bool,
        section_id: &str,
        progress: &dyn ProgressSink,
    ) -> Result<LockOutcome> {
        operator.require(Capability::ManageModuleLocks)?;

        let doc_id = lock_doc_id(module, quarter);
        let shared: Document = json!({
            "module": module.key(),
            "quarter": quarter.key(),
            "locked": locked,
            "updatedBy": operator.email,
            "updatedAt": chrono::Utc::now().to_rfc3339(),
        })
        .as_object()
        .cloned()
        .unwrap_or_default();
        self.store.set(collections::MODULE_LOCKS, &doc_id, shared).await?;

        let students = self.store.get_all(collections::STUDENTS).await?;
        let targets: Vec<&String> = students
            .iter()
            .filter(|(_, doc)| {
                doc.get("sectionId").and_then(Value::as_str) == Some(section_id)
            })
            .map(|(id, _)| id)
            .collect();

        let field = student_lock_field(module, quarter);
        let mut outcome = LockOutcome { updated: 0, attempted: targets.len() };
        for (index, student_id) in targets.iter().enumerate() {
            progress.report(ProgressEvent {
                current: index + 1,
                total: outcome.attempted,
                label: (*student_id).clone(),
            });
            let mut fields = Document::new();
            fields.insert(field.clone(), Value::Bool(locked));
            match self.store.update(collections::STUDENTS, student_id, fields).await {
                Ok(()) => outcome.updated += 1,
                Err(err) => {
                    tracing::error!(student = %student_id, error = %err, "per-student lock mirror failed, skipping");
                }
            }
        }

        let state = if locked { "locked" } else { "unlocked" };
        if let Err(err) = self
            .notifier
            .append_audit(AuditEntry::new(
                &operator.email,
                "module_lock",
                format!("{} {} for section {} ({} of {} students)", state, doc_id, section_id, outcome.updated, outcome.attempted),
            ))
            .await
        {
            tracing::warn!(error = %err, "audit append failed for module lock change");
        }

        self.notifier.show_success(&format!(
            "Module {} {} for {} of {} students",
            doc_id, state, outcome.updated, outcome.attempted
        ));
        Ok(outcome)
    }
}
