#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use campus_archive::archive::ArchiveService;
use campus_archive::auth::{Capability, Operator, Role};
use campus_archive::notify::{AuditEntry, Notifier};
use campus_archive::services::{StoreStudentRestorer, StudentRestorer};
use campus_archive::store::{
    CollectionSnapshot, Document, DocumentStore, MemoryStore, StoreError,
};

pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("fixture must be a JSON object")
}

pub fn operator_with(capabilities: &[Capability]) -> Operator {
    let mut op = Operator::new("t@x.com", Role::Admin);
    for capability in capabilities {
        op = op.grant(*capability);
    }
    op
}

/// Notifier that records toasts and audit entries for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    pub successes: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
    pub audits: Mutex<Vec<AuditEntry>>,
    fail_audits: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_audits(&self) {
        *self.fail_audits.lock().unwrap() = true;
    }

    pub fn success_count(&self) -> usize {
        self.successes.lock().unwrap().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }

    pub fn audit_actions(&self) -> Vec<String> {
        self.audits.lock().unwrap().iter().map(|entry| entry.action.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn show_success(&self, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }

    fn show_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<(), StoreError> {
        if *self.fail_audits.lock().unwrap() {
            return Err(StoreError::backend(format!("injected audit failure: {}", entry.action)));
        }
        self.audits.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Store wrapper that fails selected writes, for partial-failure paths.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    fail_updates: Mutex<HashSet<(String, String)>>,
    fail_sets: Mutex<HashSet<(String, String)>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_updates: Mutex::new(HashSet::new()),
            fail_sets: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_update(&self, collection: &str, id: &str) {
        self.fail_updates.lock().unwrap().insert((collection.to_string(), id.to_string()));
    }

    pub fn fail_set(&self, collection: &str, id: &str) {
        self.fail_sets.lock().unwrap().insert((collection.to_string(), id.to_string()));
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        self.inner.get_all(collection).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        if self.fail_sets.lock().unwrap().contains(&(collection.to_string(), id.to_string())) {
            return Err(StoreError::backend(format!("injected set failure: {collection}/{id}")));
        }
        self.inner.set(collection, id, doc).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        if self.fail_updates.lock().unwrap().contains(&(collection.to_string(), id.to_string())) {
            return Err(StoreError::backend(format!("injected update failure: {collection}/{id}")));
        }
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    fn generate_id(&self) -> String {
        self.inner.generate_id()
    }

    async fn subscribe(
        &self,
        collection: &str,
    ) -> Result<watch::Receiver<CollectionSnapshot>, StoreError> {
        self.inner.subscribe(collection).await
    }
}

/// Restorer wrapper that fails for selected original ids and records every
/// attempted call.
pub struct FailingRestorer {
    inner: StoreStudentRestorer,
    fail_ids: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FailingRestorer {
    pub fn new(store: Arc<dyn DocumentStore>, fail_ids: &[&str]) -> Self {
        Self {
            inner: StoreStudentRestorer::new(store),
            fail_ids: fail_ids.iter().map(|id| id.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl StudentRestorer for FailingRestorer {
    async fn restore_student(
        &self,
        original_id: &str,
        restored_by: &str,
    ) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(original_id.to_string());
        if self.fail_ids.contains(original_id) {
            return Err(StoreError::backend(format!("injected restore failure: {original_id}")));
        }
        self.inner.restore_student(original_id, restored_by).await
    }
}

/// Store whose subscriptions never resolve, for the loader fail-safe.
/// Hangs every collection by default, or only the named ones.
pub struct HangingStore {
    inner: Arc<MemoryStore>,
    hang: Option<HashSet<String>>,
}

impl HangingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self { inner, hang: None }
    }

    pub fn only(inner: Arc<MemoryStore>, collections: &[&str]) -> Self {
        Self { inner, hang: Some(collections.iter().map(|c| c.to_string()).collect()) }
    }

    fn hangs(&self, collection: &str) -> bool {
        self.hang.as_ref().map_or(true, |set| set.contains(collection))
    }
}

#[async_trait]
impl DocumentStore for HangingStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        self.inner.get_all(collection).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        self.inner.set(collection, id, doc).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    fn generate_id(&self) -> String {
        self.inner.generate_id()
    }

    async fn subscribe(
        &self,
        collection: &str,
    ) -> Result<watch::Receiver<CollectionSnapshot>, StoreError> {
        if self.hangs(collection) {
            futures::future::pending().await
        } else {
            self.inner.subscribe(collection).await
        }
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: ArchiveService,
}

/// Service wired to a fresh in-memory store with the store-backed
/// restorer and a recording notifier.
pub fn harness() -> Harness {
    init_tracing();
    let store = MemoryStore::shared();
    let notifier = RecordingNotifier::shared();
    let restorer = Arc::new(StoreStudentRestorer::new(store.clone() as Arc<dyn DocumentStore>));
    let service = ArchiveService::new(store.clone(), restorer, notifier.clone());
    Harness { store, notifier, service }
}
