mod common;

use anyhow::Result;
use serde_json::json;

use campus_archive::auth::Capability;
use campus_archive::store::{collections, DocumentStore};
use campus_archive::types::ArchiveEntry;
use campus_archive::ArchiveError;

use common::{doc, harness, operator_with};

fn entry(id: &str, body: serde_json::Value) -> ArchiveEntry {
    ArchiveEntry::from_document("test", id, &doc(body)).expect("entry parses")
}

#[tokio::test]
async fn quiz_restore_moves_data_back_and_drops_archive_copy() -> Result<()> {
    let h = harness();
    let operator = operator_with(&[Capability::RestoreRecords]);
    let body = json!({"deletedBy": "t@x.com", "originalData": {"title": "Quiz A"}});
    h.store.set(collections::DELETED_QUIZZES, "deleted_q1", doc(body.clone())).await?;

    h.service.restore_quiz(&operator, &entry("deleted_q1", body)).await?;

    let live = h.store.get(collections::QUIZZES, "q1").await?.expect("quiz is live");
    assert_eq!(live.get("title"), Some(&json!("Quiz A")));
    assert!(h.store.get(collections::DELETED_QUIZZES, "deleted_q1").await?.is_none());

    assert_eq!(h.notifier.success_count(), 1);
    assert_eq!(h.notifier.error_count(), 0);
    assert_eq!(h.notifier.audit_actions(), vec!["quiz_restore".to_string()]);
    Ok(())
}

#[tokio::test]
async fn quiz_restore_without_original_data_is_invalid_and_writes_nothing() -> Result<()> {
    let h = harness();
    let operator = operator_with(&[Capability::RestoreRecords]);
    let body = json!({"deletedBy": "t@x.com"});
    h.store.set(collections::DELETED_QUIZZES, "deleted_q1", doc(body.clone())).await?;

    let err = h.service.restore_quiz(&operator, &entry("deleted_q1", body)).await.unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidInput(_)));

    assert!(h.store.get_all(collections::QUIZZES).await?.is_empty());
    assert!(h.store.get(collections::DELETED_QUIZZES, "deleted_q1").await?.is_some());
    assert_eq!(h.notifier.error_count(), 1);
    Ok(())
}

#[tokio::test]
async fn quiz_restore_survives_audit_append_failure() -> Result<()> {
    let h = harness();
    h.notifier.fail_audits();
    let operator = operator_with(&[Capability::RestoreRecords]);
    let body = json!({"deletedBy": "t@x.com", "originalData": {"title": "Quiz A"}});
    h.store.set(collections::DELETED_QUIZZES, "deleted_q1", doc(body.clone())).await?;

    // The restore already completed; the audit trail is best-effort.
    h.service.restore_quiz(&operator, &entry("deleted_q1", body)).await?;

    assert!(h.store.get(collections::QUIZZES, "q1").await?.is_some());
    assert!(h.store.get(collections::DELETED_QUIZZES, "deleted_q1").await?.is_none());
    assert_eq!(h.notifier.success_count(), 1);
    assert_eq!(h.notifier.error_count(), 0);
    Ok(())
}

#[tokio::test]
async fn quiz_restore_prefers_explicit_original_id() -> Result<()> {
    let h = harness();
    let operator = operator_with(&[Capability::RestoreRecords]);
    let body = json!({
        "deletedBy": "t@x.com",
        "originalId": "quiz-42",
        "originalData": {"title": "Quiz B"}
    });
    h.store.set(collections::DELETED_QUIZZES, "archive-doc", doc(body.clone())).await?;

    h.service.restore_quiz(&operator, &entry("archive-doc", body)).await?;

    assert!(h.store.get(collections::QUIZZES, "quiz-42").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn student_restore_delegates_then_cleans_up_archive_doc() -> Result<()> {
    let h = harness();
    let operator = operator_with(&[Capability::RestoreRecords]);
    let body = json!({
        "deletedBy": "t@x.com",
        "originalData": {"name": "Ana", "sectionId": "sec1"}
    });
    h.store.set(collections::DELETED_STUDENTS, "deleted_stu1", doc(body.clone())).await?;

    h.service.restore_student(&operator, &entry("deleted_stu1", body)).await?;

    let live = h.store.get(collections::STUDENTS, "stu1").await?.expect("student is live");
    assert_eq!(live.get("name"), Some(&json!("Ana")));
    assert_eq!(live.get("restoredBy"), Some(&json!("t@x.com")));
    assert!(h.store.get(collections::DELETED_STUDENTS, "deleted_stu1").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn student_restore_with_unresolvable_id_is_invalid() -> Result<()> {
    let h = harness();
    let operator = operator_with(&[Capability::RestoreRecords]);
    let body = json!({"deletedBy": "t@x.com", "originalData": {"name": "Ana"}});

    // Archive id degenerates to nothing once the prefix is stripped.
    let err =
        h.service.restore_student(&operator, &entry("deleted_", body)).await.unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidInput(_)));
    assert!(h.store.get_all(collections::STUDENTS).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn admin_restore_uses_original_id_or_generates_one() -> Result<()> {
    let h = harness();
    let operator = operator_with(&[Capability::RestoreRecords, Capability::ManageAdmins]);

    let with_id = json!({
        "deletedBy": "t@x.com",
        "originalId": "adm1",
        "originalData": {"name": "Alice"}
    });
    h.store.set(collections::DELETED_ADMINS, "deleted_adm1", doc(with_id.clone())).await?;
    h.service.restore_admin(&operator, &entry("deleted_adm1", with_id)).await?;
    assert!(h.store.get(collections::ADMINS, "adm1").await?.is_some());
    assert!(h.store.get(collections::DELETED_ADMINS, "deleted_adm1").await?.is_none());

    let without_id = json!({"deletedBy": "t@x.com", "originalData": {"name": "Bob"}});
    h.store.set(collections::DELETED_ADMINS, "x", doc(without_id.clone())).await?;
    h.service.restore_admin(&operator, &entry("x", without_id)).await?;
    let admins = h.store.get_all(collections::ADMINS).await?;
    assert_eq!(admins.len(), 2);
    Ok(())
}

#[tokio::test]
async fn restore_without_capability_is_denied_before_any_write() -> Result<()> {
    let h = harness();
    let operator = operator_with(&[]);
    let body = json!({"deletedBy": "t@x.com", "originalData": {"title": "Quiz A"}});
    h.store.set(collections::DELETED_QUIZZES, "deleted_q1", doc(body.clone())).await?;

    let err = h.service.restore_quiz(&operator, &entry("deleted_q1", body)).await.unwrap_err();
    assert!(matches!(err, ArchiveError::PermissionDenied(_)));
    assert!(h.store.get_all(collections::QUIZZES).await?.is_empty());
    assert!(h.store.get(collections::DELETED_QUIZZES, "deleted_q1").await?.is_some());
    assert_eq!(h.notifier.error_count(), 1);
    Ok(())
}
