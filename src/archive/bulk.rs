use super::{ArchiveService, ArchiveViews};
use crate::auth::{Capability, Operator};
use crate::error::{ArchiveError, Result};
use crate::progress::{NoProgress, ProgressEvent, ProgressSink};
use crate::types::{ArchiveEntry, BulkOutcome, EntityKind, OperationKind};

/// An operator-selected batch over one entity kind. `confirmed` carries
/// the UI confirmation gate: no destructive batch runs without it.
#[derive(Debug, Clone)]
pub struct BulkRequest {
    pub kind: EntityKind,
    pub operation: OperationKind,
    pub ids: Vec<String>,
    pub confirmed: bool,
}

impl ArchiveService {
    /// Apply restore or permanent delete to a selection, sequentially so
    /// progress stays incremental and remote load stays bounded.
    /// Individual failures are logged and skipped; the whole batch aborts
    /// only on the up-front confirmation and capability gates. Returns
    /// the ids actually processed so the caller can drop them from its
    /// in-memory state.
    pub async fn bulk_apply(
        &self,
        operator: &Operator,
        request: &BulkRequest,
        views: &ArchiveViews,
        progress: &dyn ProgressSink,
    ) -> Result<BulkOutcome> {
        let result = self.bulk_apply_inner(operator, request, views, progress).await;
        self.toast(result, |outcome| {
            let verb = match request.operation {
                OperationKind::Restore => "restored",
                OperationKind::PermanentDelete => "permanently deleted",
            };
            format!("{} of {} {}s {}", outcome.succeeded, outcome.attempted, request.kind, verb)
        })
    }

    async fn bulk_apply_inner(
        &self,
        operator: &Operator,
        request: &BulkRequest,
        views: &ArchiveViews,
        progress: &dyn ProgressSink,
    ) -> Result<BulkOutcome> {
        if !request.confirmed {
            return Err(ArchiveError::invalid_input(
                "bulk operation requires explicit confirmation",
            ));
        }
        match request.operation {
            OperationKind::Restore => operator.require(Capability::RestoreRecords)?,
            OperationKind::PermanentDelete => operator.require(Capability::PermanentlyDelete)?,
        }
        if request.kind == EntityKind::Admin {
            operator.require(Capability::ManageAdmins)?;
        }

        let mut outcome = BulkOutcome {
            succeeded: 0,
            attempted: request.ids.len(),
            processed_ids: Vec::new(),
        };

        for (index, id) in request.ids.iter().enumerate() {
            let Some(entry) = views.find(request.kind, id) else {
                tracing::warn!(id = %id, kind = ?request.kind, "selected record not in loaded view, skipping");
                continue;
            };

            progress.report(ProgressEvent {
                current: index + 1,
                total: outcome.attempted,
                label: entry.display_name(),
            });

            match self.apply_one(operator, request, entry).await {
                Ok(()) => {
                    outcome.succeeded += 1;
                    outcome.processed_ids.push(id.clone());
                }
                Err(err) => {
                    tracing::error!(
                        id = %id,
                        kind = ?request.kind,
                        operation = %request.operation,
                        error = %err,
                        "batch item failed, continuing"
                    );
                }
            }
        }

        Ok(outcome)
    }

    async fn apply_one(
        &self,
        operator: &Operator,
        request: &BulkRequest,
        entry: &ArchiveEntry,
    ) -> Result<()> {
        match (request.kind, request.operation) {
            (EntityKind::Student, OperationKind::Restore) => {
                self.restore_student_record(operator, entry).await
            }
            (EntityKind::Student, OperationKind::PermanentDelete) => {
                self.delete_student_record(entry).await
            }
            (EntityKind::Quiz, OperationKind::Restore) => {
                self.restore_quiz_record(operator, entry).await
            }
            (EntityKind::Quiz, OperationKind::PermanentDelete) => {
                self.delete_quiz_record(operator, entry).await
            }
            (EntityKind::Admin, OperationKind::Restore) => {
                self.restore_admin_record(operator, entry).await
            }
            (EntityKind::Admin, OperationKind::PermanentDelete) => {
                self.delete_admin_record(entry).await
            }
            (EntityKind::Section, OperationKind::Restore) => self
                .restore_section_record(operator, entry, &NoProgress)
                .await
                .map(|_| ()),
            (EntityKind::Section, OperationKind::PermanentDelete) => self
                .delete_section_record(operator, entry, &NoProgress)
                .await
                .map(|_| ()),
        }
    }
}
