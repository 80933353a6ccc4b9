use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

pub mod memory;

pub use memory::MemoryStore;

/// A stored document body. Ids travel alongside documents rather than
/// inside them; the typed views in `types` stitch the two together.
pub type Document = Map<String, Value>;

/// Collection names used by the archive and module-lock services.
pub mod collections {
    pub const STUDENTS: &str = "students";
    pub const QUIZZES: &str = "quizzes";
    pub const ADMINS: &str = "admins";
    pub const SECTIONS: &str = "sections";

    pub const ASSIGNMENTS: &str = "assignments";
    pub const STUDENT_ASSIGNMENTS: &str = "student_assignments";
    pub const SECTION_ASSIGNMENTS: &str = "section_assignments";

    pub const DELETED_STUDENTS: &str = "deleted_students";
    pub const DELETED_QUIZZES: &str = "deleted_quizzes";
    pub const DELETED_ADMINS: &str = "deleted_admins";
    pub const DELETED_SECTIONS: &str = "deleted_sections";

    pub const MODULE_LOCKS: &str = "module_locks";
    pub const NOTIFICATIONS: &str = "notifications";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("subscription failed for collection '{0}'")]
    SubscriptionFailed(String),
}

impl StoreError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound { collection: collection.into(), id: id.into() }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }
}

/// Full contents of a collection at a point in time. Live subscriptions
/// deliver a fresh snapshot after every mutation.
#[derive(Debug, Clone, Default)]
pub struct CollectionSnapshot {
    pub collection: String,
    pub documents: Vec<(String, Document)>,
}

impl CollectionSnapshot {
    pub fn empty(collection: impl Into<String>) -> Self {
        Self { collection: collection.into(), documents: Vec::new() }
    }
}

/// Client for the hosted document database, modeled as named collections
/// of JSON documents keyed by opaque string ids.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch every document in a collection.
    async fn get_all(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError>;

    /// Fetch a single document, `None` if absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create or fully replace a document.
    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError>;

    /// Shallow-merge fields into an existing document. Fails with
    /// `NotFound` when the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    /// Delete a document. Deleting an absent document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Generate a fresh document id.
    fn generate_id(&self) -> String;

    /// Live-subscribe to a collection. The receiver observes the current
    /// snapshot immediately and a new one after every mutation.
    async fn subscribe(
        &self,
        collection: &str,
    ) -> Result<watch::Receiver<CollectionSnapshot>, StoreError>;
}
