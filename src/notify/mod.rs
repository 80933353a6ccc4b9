use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{collections, Document, DocumentStore, StoreError};

/// Persistent audit-trail entry appended after destructive or restorative
/// operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub actor: String,
    pub action: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            detail: detail.into(),
            created_at: Utc::now(),
        }
    }
}

/// Notification surface the core reports outcomes through: a transient
/// toast pair and a persistent audit trail. Every terminal outcome of an
/// operation produces exactly one toast.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn show_success(&self, message: &str);
    fn show_error(&self, message: &str);
    async fn append_audit(&self, entry: AuditEntry) -> Result<(), StoreError>;
}

/// Default notifier: toasts go to the log, audit entries become documents
/// in the `notifications` collection.
pub struct StoreNotifier {
    store: Arc<dyn DocumentStore>,
}

impl StoreNotifier {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    fn show_success(&self, message: &str) {
        tracing::info!(toast = "success", "{}", message);
    }

    fn show_error(&self, message: &str) {
        tracing::error!(toast = "error", "{}", message);
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<(), StoreError> {
        let id = self.store.generate_id();
        let doc: Document = match serde_json::to_value(&entry) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => return Err(StoreError::backend("audit entry serialization failed")),
        };
        self.store.set(collections::NOTIFICATIONS, &id, doc).await
    }
}
