use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;

use crate::auth::{Capability, Operator};
use crate::config;
use crate::store::{collections, CollectionSnapshot, Document, DocumentStore, StoreError};
use crate::types::{ArchiveEntry, SECTION_DELETION_REASON};

/// Role-scoped views over the four archive collections.
#[derive(Debug, Clone, Default)]
pub struct ArchiveViews {
    pub students: Vec<ArchiveEntry>,
    pub quizzes: Vec<ArchiveEntry>,
    pub admins: Vec<ArchiveEntry>,
    pub sections: Vec<ArchiveEntry>,
}

impl ArchiveViews {
    /// Look up a loaded entry by archive document id, for bulk dispatch.
    pub fn find(&self, kind: crate::types::EntityKind, id: &str) -> Option<&ArchiveEntry> {
        use crate::types::EntityKind;
        let list = match kind {
            EntityKind::Student => &self.students,
            EntityKind::Quiz => &self.quizzes,
            EntityKind::Admin => &self.admins,
            EntityKind::Section => &self.sections,
        };
        list.iter().find(|entry| entry.id == id)
    }
}

/// A student archived as collateral of a section deletion belongs to the
/// section's archive entry, not to the operator's students view.
fn is_section_casualty(entry: &ArchiveEntry) -> bool {
    entry.deletion_reason.as_deref() == Some(SECTION_DELETION_REASON)
        || entry.archived_from_section.is_some()
}

pub fn student_visible(entry: &ArchiveEntry, operator: &Operator) -> bool {
    entry.deleted_by.as_deref() == Some(operator.email.as_str()) && !is_section_casualty(entry)
}

pub fn quiz_visible(entry: &ArchiveEntry, operator: &Operator) -> bool {
    entry.deleted_by.as_deref() == Some(operator.email.as_str())
}

pub fn section_visible(entry: &ArchiveEntry, operator: &Operator) -> bool {
    entry.deleted_by.is_none()
        || entry.deleted_by.as_deref() == Some(operator.email.as_str())
        || operator.can(Capability::ViewAllSections)
}

type RawCollections = HashMap<String, Vec<(String, Document)>>;

fn parse_collection(raw: &RawCollections, collection: &str) -> Vec<ArchiveEntry> {
    raw.get(collection)
        .map(|docs| {
            docs.iter()
                .filter_map(|(id, doc)| ArchiveEntry::from_document(collection, id, doc))
                .filter(|entry| {
                    if entry.has_original_data() {
                        true
                    } else {
                        tracing::warn!(collection, id = %entry.id, "skipping corrupt archive record without originalData");
                        false
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

fn build_views(raw: &RawCollections, operator: &Operator) -> ArchiveViews {
    let students = parse_collection(raw, collections::DELETED_STUDENTS)
        .into_iter()
        .filter(|entry| student_visible(entry, operator))
        .collect();
    let quizzes = parse_collection(raw, collections::DELETED_QUIZZES)
        .into_iter()
        .filter(|entry| quiz_visible(entry, operator))
        .collect();
    // No filter beyond the capability gate: the admins tab is either
    // shown in full or not loaded at all.
    let admins = if operator.can(Capability::ManageAdmins) {
        parse_collection(raw, collections::DELETED_ADMINS)
    } else {
        Vec::new()
    };
    let sections = parse_collection(raw, collections::DELETED_SECTIONS)
        .into_iter()
        .filter(|entry| section_visible(entry, operator))
        .collect();

    ArchiveViews { students, quizzes, admins, sections }
}

/// Loads the archive collections and produces filtered, role-scoped views,
/// either as a one-shot snapshot or as a live subscription.
pub struct ArchiveLoader {
    store: Arc<dyn DocumentStore>,
    operator: Operator,
    load_timeout: Duration,
}

impl ArchiveLoader {
    pub fn new(store: Arc<dyn DocumentStore>, operator: Operator) -> Self {
        let timeout_ms = config::config().loader.load_timeout_ms;
        Self { store, operator, load_timeout: Duration::from_millis(timeout_ms) }
    }

    pub fn with_load_timeout(mut self, load_timeout: Duration) -> Self {
        self.load_timeout = load_timeout;
        self
    }

    fn watched_collections(&self) -> Vec<&'static str> {
        let mut cols = vec![
            collections::DELETED_STUDENTS,
            collections::DELETED_QUIZZES,
            collections::DELETED_SECTIONS,
        ];
        if self.operator.can(Capability::ManageAdmins) {
            cols.push(collections::DELETED_ADMINS);
        }
        cols
    }

    /// One-shot filtered snapshot of the archive.
    pub async fn load(&self) -> Result<ArchiveViews, StoreError> {
        let mut raw = RawCollections::new();
        for collection in self.watched_collections() {
            raw.insert(collection.to_string(), self.store.get_all(collection).await?);
        }
        Ok(build_views(&raw, &self.operator))
    }

    /// Live views. The returned receiver holds the initial snapshot once
    /// every watched collection has delivered one; a collection that does
    /// not come up within the load timeout is dropped from this session
    /// and loading completes with whatever arrived, no error raised.
    pub async fn watch(&self) -> Result<watch::Receiver<ArchiveViews>, StoreError> {
        let mut receivers = Vec::new();
        for collection in self.watched_collections() {
            match timeout(self.load_timeout, self.store.subscribe(collection)).await {
                Ok(rx) => receivers.push((collection, rx?)),
                Err(_) => {
                    tracing::warn!(
                        collection,
                        timeout_ms = self.load_timeout.as_millis() as u64,
                        "collection subscription timed out; continuing without it"
                    );
                }
            }
        }

        let mut raw = RawCollections::new();
        for (collection, rx) in &receivers {
            raw.insert(collection.to_string(), rx.borrow().documents.clone());
        }
        let initial = build_views(&raw, &self.operator);

        let (tx, out) = watch::channel(initial);
        let tx = Arc::new(tx);
        let raw = Arc::new(Mutex::new(raw));

        for (collection, mut rx) in receivers {
            let tx = Arc::clone(&tx);
            let raw = Arc::clone(&raw);
            let operator = self.operator.clone();
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let snapshot: CollectionSnapshot = rx.borrow_and_update().clone();
                    let views = {
                        let mut raw = raw.lock().unwrap_or_else(|e| e.into_inner());
                        raw.insert(collection.to_string(), snapshot.documents);
                        build_views(&raw, &operator)
                    };
                    if tx.send(views).is_err() {
                        break;
                    }
                }
            });
        }

        Ok(out)
    }
}
