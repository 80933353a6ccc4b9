use std::sync::Arc;
use std::time::Duration;

use crate::config;
use crate::notify::Notifier;
use crate::services::StudentRestorer;
use crate::store::DocumentStore;

pub mod bulk;
pub mod delete;
pub mod ids;
pub mod loader;
pub mod restore;
pub mod section;

pub use loader::{ArchiveLoader, ArchiveViews};

/// Restore and permanent-delete operations over the archive collections.
/// Single-entity methods emit one toast per terminal outcome; the bulk
/// dispatcher and section operations compose their no-toast internals.
pub struct ArchiveService {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) restorer: Arc<dyn StudentRestorer>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) member_delay: Duration,
}

impl ArchiveService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        restorer: Arc<dyn StudentRestorer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let delay = config::config().pacing.section_member_delay_ms;
        Self { store, restorer, notifier, member_delay: Duration::from_millis(delay) }
    }

    /// Override the per-member pacing delay (UI throttling only, never a
    /// correctness requirement).
    pub fn with_member_delay(mut self, delay: Duration) -> Self {
        self.member_delay = delay;
        self
    }

    /// Emit the single terminal toast for an operation and pass the
    /// result through.
    pub(crate) fn toast<T>(
        &self,
        result: crate::error::Result<T>,
        success: impl FnOnce(&T) -> String,
    ) -> crate::error::Result<T> {
        match result {
            Ok(value) => {
                self.notifier.show_success(&success(&value));
                Ok(value)
            }
            Err(err) => {
                self.notifier.show_error(&err.message());
                Err(err)
            }
        }
    }
}
