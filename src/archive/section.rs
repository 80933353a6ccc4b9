use chrono::Utc;
use serde_json::Value;

use super::{ids, ArchiveService};
use crate::auth::{Capability, Operator};
use crate::error::{ArchiveError, Result};
use crate::notify::AuditEntry;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::store::{collections, Document};
use crate::types::{
    ArchiveEntry, MembershipMode, Section, SectionMember, SectionMembership, SectionOutcome,
    SECTION_DELETION_REASON,
};

impl ArchiveService {
    /// Resolve a section's membership once, yielding a uniform member list
    /// regardless of storage form. The embedded array is authoritative
    /// when non-empty; otherwise the legacy per-student archive documents
    /// are scanned.
    pub async fn resolve_membership(&self, entry: &ArchiveEntry) -> Result<SectionMembership> {
        if !entry.archived_students.is_empty() {
            let members = entry
                .archived_students
                .iter()
                .filter_map(|snapshot| {
                    let original_id = snapshot
                        .original_id
                        .clone()
                        .or_else(|| {
                            snapshot
                                .archive_id
                                .as_deref()
                                .map(|id| ids::canonical_id(id).to_string())
                        })
                        .filter(|id| !id.is_empty());
                    match original_id {
                        Some(original_id) => Some(SectionMember {
                            original_id,
                            display_name: snapshot.name.clone(),
                            archive_doc_id: snapshot.archive_id.clone(),
                        }),
                        None => {
                            tracing::warn!(section = %entry.id, "embedded member snapshot has no id, skipping");
                            None
                        }
                    }
                })
                .collect();
            return Ok(SectionMembership { mode: MembershipMode::Embedded, members });
        }

        let section = section_payload(entry)?;
        let section_original_id = ids::resolve_original_id(entry);

        let mut members = Vec::new();
        for (doc_id, doc) in self.store.get_all(collections::DELETED_STUDENTS).await? {
            let Some(student) =
                ArchiveEntry::from_document(collections::DELETED_STUDENTS, &doc_id, &doc)
            else {
                continue;
            };
            if !legacy_member_matches(&student, &section.name, section_original_id.as_deref()) {
                continue;
            }
            match ids::resolve_original_id(&student) {
                Some(original_id) => members.push(SectionMember {
                    original_id,
                    display_name: student
                        .original_data
                        .as_ref()
                        .and_then(|data| data.get("name"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    archive_doc_id: Some(student.id.clone()),
                }),
                None => {
                    tracing::warn!(archive_id = %student.id, "legacy member has no resolvable id, skipping");
                }
            }
        }

        Ok(SectionMembership { mode: MembershipMode::Legacy, members })
    }

    /// Recreate a section under a fresh id and reattach its students one
    /// by one. Per-student failures are logged and skipped; such students
    /// stay archived for a manual retry.
    pub async fn restore_section(
        &self,
        operator: &Operator,
        entry: &ArchiveEntry,
        progress: &dyn ProgressSink,
    ) -> Result<SectionOutcome> {
        let result = async {
            operator.require(Capability::RestoreRecords)?;
            self.restore_section_record(operator, entry, progress).await
        }
        .await;
        self.toast(result, |outcome| {
            format!(
                "Restored section {} with {} of {} students",
                entry.display_name(),
                outcome.processed,
                outcome.attempted
            )
        })
    }

    pub(crate) async fn restore_section_record(
        &self,
        operator: &Operator,
        entry: &ArchiveEntry,
        progress: &dyn ProgressSink,
    ) -> Result<SectionOutcome> {
        let section = section_payload(entry)?;

        // Fresh id and reset counters; the original creation timestamp is
        // intentionally not carried over.
        let new_id = self.store.generate_id();
        let now = Utc::now().to_rfc3339();
        let mut doc = section.extra.clone();
        doc.insert("name".to_string(), Value::String(section.name.clone()));
        doc.insert("currentStudents".to_string(), Value::from(0));
        doc.insert("createdAt".to_string(), Value::String(now.clone()));
        doc.insert("updatedAt".to_string(), Value::String(now));
        self.store.set(collections::SECTIONS, &new_id, doc).await?;

        let membership = self.resolve_membership(entry).await?;
        let attempted = membership.members.len();
        let mut restored = 0;

        for (index, member) in membership.members.iter().enumerate() {
            progress.report(ProgressEvent {
                current: index + 1,
                total: attempted,
                label: member.display_name.clone().unwrap_or_else(|| member.original_id.clone()),
            });

            match self.reattach_member(operator, member, &new_id).await {
                Ok(()) => restored += 1,
                Err(err) => {
                    tracing::error!(
                        student = %member.original_id,
                        section = %entry.id,
                        error = %err,
                        "member restore failed, student stays archived"
                    );
                }
            }

            if !self.member_delay.is_zero() {
                tokio::time::sleep(self.member_delay).await;
            }
        }

        self.store.delete(collections::DELETED_SECTIONS, &entry.id).await?;

        if let Err(err) = self
            .notifier
            .append_audit(AuditEntry::new(
                &operator.email,
                "section_restore",
                format!(
                    "restored section {} ({} of {} students)",
                    section.name, restored, attempted
                ),
            ))
            .await
        {
            tracing::warn!(error = %err, "audit append failed for section restore");
        }

        Ok(SectionOutcome { processed: restored, attempted, section_id: Some(new_id) })
    }

    async fn reattach_member(
        &self,
        operator: &Operator,
        member: &SectionMember,
        section_id: &str,
    ) -> Result<()> {
        self.restorer.restore_student(&member.original_id, &operator.email).await?;

        let mut fields = Document::new();
        fields.insert("sectionId".to_string(), Value::String(section_id.to_string()));
        self.store.update(collections::STUDENTS, &member.original_id, fields).await?;

        if let Some(archive_doc_id) = &member.archive_doc_id {
            self.store.delete(collections::DELETED_STUDENTS, archive_doc_id).await?;
        }
        Ok(())
    }

    /// Irrevocably remove a section and only the student archives created
    /// by that section's deletion. Embedded membership has no separate
    /// documents to remove; members are counted for progress only.
    pub async fn delete_section(
        &self,
        operator: &Operator,
        entry: &ArchiveEntry,
        progress: &dyn ProgressSink,
    ) -> Result<SectionOutcome> {
        let result = async {
            operator.require(Capability::PermanentlyDelete)?;
            self.delete_section_record(operator, entry, progress).await
        }
        .await;
        self.toast(result, |outcome| {
            format!(
                "Permanently deleted section {} ({} of {} students)",
                entry.display_name(),
                outcome.processed,
                outcome.attempted
            )
        })
    }

    pub(crate) async fn delete_section_record(
        &self,
        operator: &Operator,
        entry: &ArchiveEntry,
        progress: &dyn ProgressSink,
    ) -> Result<SectionOutcome> {
        let membership = self.resolve_membership(entry).await?;
        let attempted = membership.members.len();
        let mut processed = 0;

        for (index, member) in membership.members.iter().enumerate() {
            progress.report(ProgressEvent {
                current: index + 1,
                total: attempted,
                label: member.display_name.clone().unwrap_or_else(|| member.original_id.clone()),
            });

            match membership.mode {
                MembershipMode::Embedded => {
                    // Membership is inline on the section document.
                    processed += 1;
                }
                MembershipMode::Legacy => {
                    let Some(archive_doc_id) = &member.archive_doc_id else {
                        continue;
                    };
                    match self.store.delete(collections::DELETED_STUDENTS, archive_doc_id).await {
                        Ok(()) => processed += 1,
                        Err(err) => {
                            tracing::error!(
                                archive_id = %archive_doc_id,
                                error = %err,
                                "member archive delete failed, skipping"
                            );
                        }
                    }
                }
            }
        }

        self.store.delete(collections::DELETED_SECTIONS, &entry.id).await?;

        if let Err(err) = self
            .notifier
            .append_audit(AuditEntry::new(
                &operator.email,
                "section_permanent_delete",
                format!(
                    "permanently deleted section {} ({} of {} students)",
                    entry.display_name(),
                    processed,
                    attempted
                ),
            ))
            .await
        {
            tracing::warn!(error = %err, "audit append failed for section delete");
        }

        Ok(SectionOutcome { processed, attempted, section_id: None })
    }
}

/// Parse the section payload out of the archive entry. The name is
/// required for both restore and legacy membership matching.
fn section_payload(entry: &ArchiveEntry) -> Result<Section> {
    let data = entry
        .original_data
        .clone()
        .ok_or_else(|| {
            ArchiveError::invalid_input(format!(
                "archived section {} is missing originalData",
                entry.id
            ))
        })?;
    let section: Section = serde_json::from_value(data).map_err(|_| {
        ArchiveError::invalid_input(format!(
            "archived section {} has no usable name in originalData",
            entry.id
        ))
    })?;
    if section.name.is_empty() {
        return Err(ArchiveError::invalid_input(format!(
            "archived section {} has an empty name",
            entry.id
        )));
    }
    Ok(section)
}

/// Legacy membership predicate: exact equality on both the section name
/// and id, or the section-deletion reason combined with the name. A
/// matching name with a different id is not a member.
fn legacy_member_matches(
    student: &ArchiveEntry,
    section_name: &str,
    section_original_id: Option<&str>,
) -> bool {
    let name_matches = student.archived_from_section.as_deref() == Some(section_name);
    let id_matches = match (student.archived_from_section_id.as_deref(), section_original_id) {
        (Some(student_section_id), Some(section_id)) => student_section_id == section_id,
        _ => false,
    };
    let reason_matches =
        student.deletion_reason.as_deref() == Some(SECTION_DELETION_REASON) && name_matches;

    (name_matches && id_matches) || reason_matches
}
