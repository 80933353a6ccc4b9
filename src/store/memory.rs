use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use super::{CollectionSnapshot, Document, DocumentStore, StoreError};

/// In-process document store. Backs the test suite and embedded use;
/// mirrors the hosted store's semantics (shallow-merge updates, idempotent
/// deletes, snapshot-per-mutation subscriptions).
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    watchers: Mutex<HashMap<String, watch::Sender<CollectionSnapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn snapshot_locked(
        collections: &HashMap<String, BTreeMap<String, Document>>,
        collection: &str,
    ) -> CollectionSnapshot {
        let documents = collections
            .get(collection)
            .map(|docs| docs.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
            .unwrap_or_default();
        CollectionSnapshot { collection: collection.to_string(), documents }
    }

    fn publish(&self, collection: &str) {
        let snapshot = {
            let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
            Self::snapshot_locked(&collections, collection)
        };
        let watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = watchers.get(collection) {
            // send_replace stores the value even with no receivers alive,
            // so a later re-subscribe still starts from the current state.
            tx.send_replace(snapshot);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        Ok(Self::snapshot_locked(&collections, collection).documents)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        {
            let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
            collections.entry(collection.to_string()).or_default().insert(id.to_string(), doc);
        }
        self.publish(collection);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        {
            let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            for (key, value) in fields {
                doc.insert(key, value);
            }
        }
        self.publish(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        {
            let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
            if let Some(docs) = collections.get_mut(collection) {
                docs.remove(id);
            }
        }
        self.publish(collection);
        Ok(())
    }

    fn generate_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    async fn subscribe(
        &self,
        collection: &str,
    ) -> Result<watch::Receiver<CollectionSnapshot>, StoreError> {
        let snapshot = {
            let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
            Self::snapshot_locked(&collections, collection)
        };
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        let tx = watchers
            .entry(collection.to_string())
            .or_insert_with(|| watch::channel(snapshot).0);
        Ok(tx.subscribe())
    }
}
