//! Record lifecycle: publish, toggle, remove.

use std::time::Duration;

use discount_sync_admin::store::StoreError;
use discount_sync_admin::sync::SyncError;
use discount_sync_core::{
    Activation, DiscountMethod, DiscountRecord, RecordId, RecordState, ValueKind,
};
use discount_sync_integration_tests::{Call, Op, engine};

fn draft(name: &str) -> DiscountRecord {
    DiscountRecord::draft(name, ValueKind::Percentage, 15.0)
}

#[tokio::test]
async fn test_publish_creates_remote_object_and_saves_ref() {
    let (store, engine) = engine();

    let record = engine.records().publish(draft("Spring")).await.expect("publish");

    assert_eq!(record.state(), RecordState::Active);
    let remote_ref = record.remote_ref.clone().expect("linked");
    assert!(store.has_object(&remote_ref));
    assert!(remote_ref.as_str().contains("DiscountAutomaticNode"));

    let stored = engine.records().list().await.expect("list");
    assert_eq!(stored, vec![record]);
}

#[tokio::test]
async fn test_publish_code_record_creates_code_discount() {
    let (store, engine) = engine();
    let mut record = draft("VIP");
    record.activation = Activation::Code;
    record.code = Some("VIP15".to_string());

    let record = engine.records().publish(record).await.expect("publish");

    let object = store
        .objects()
        .into_iter()
        .find(|o| Some(&o.id) == record.remote_ref.as_ref())
        .expect("created");
    assert_eq!(object.method, DiscountMethod::Code);
    assert_eq!(object.title, "VIP");
}

#[tokio::test]
async fn test_republish_does_not_create_twice() {
    let (store, engine) = engine();
    let record = engine.records().publish(draft("Spring")).await.expect("publish");

    engine.records().publish(record).await.expect("republish");

    assert_eq!(store.count(Op::CreateObject), 1);
}

#[tokio::test]
async fn test_invalid_record_is_rejected_before_remote_call() {
    let (store, engine) = engine();
    let mut record = draft("Broken");
    record.activation = Activation::Code;

    let err = engine.records().publish(record).await.expect_err("no code");

    assert!(matches!(err, SyncError::Record(_)));
    assert_eq!(store.count(Op::CreateObject), 0);
}

#[tokio::test]
async fn test_duplicate_name_is_rejected() {
    let (store, engine) = engine();
    engine.records().publish(draft("Spring")).await.expect("publish");

    let err = engine
        .records()
        .publish(draft("Spring"))
        .await
        .expect_err("duplicate");

    assert!(matches!(err, SyncError::DuplicateName(ref name) if name == "Spring"));
    assert_eq!(store.count(Op::CreateObject), 1);
}

#[tokio::test]
async fn test_create_failure_saves_nothing() {
    let (store, engine) = engine();
    store.fail_next(Op::CreateObject, StoreError::Rejected("title taken".to_string()));

    let err = engine.records().publish(draft("Spring")).await.expect_err("rejected");

    assert!(matches!(err, SyncError::Store(StoreError::Rejected(_))));
    assert_eq!(store.count(Op::SetDocuments), 0);
}

#[tokio::test]
async fn test_set_active_toggles_state_and_execution_subset() {
    let (store, engine) = engine();
    let record = engine.records().publish(draft("Spring")).await.expect("publish");

    let updated = engine
        .records()
        .set_active(&record.id, false)
        .await
        .expect("deactivate");

    assert_eq!(updated.state(), RecordState::Inactive);
    let active = store.document("config", "activeRecords").expect("written");
    assert!(!active.contains(record.id.as_str()));
}

#[tokio::test]
async fn test_set_active_unknown_record() {
    let (_store, engine) = engine();

    let err = engine
        .records()
        .set_active(&RecordId::new("missing"), true)
        .await
        .expect_err("unknown");

    assert!(matches!(err, SyncError::RecordNotFound(_)));
}

#[tokio::test]
async fn test_remove_deletes_remote_then_local() {
    let (store, engine) = engine();
    let record = engine.records().publish(draft("Spring")).await.expect("publish");
    let remote_ref = record.remote_ref.clone().expect("linked");
    store.clear_calls();

    engine.records().remove(&record.id).await.expect("remove");

    assert!(!store.has_object(&remote_ref));
    assert!(engine.records().list().await.expect("list").is_empty());
    let calls = store.calls();
    let delete_at = calls
        .iter()
        .position(|c| matches!(c, Call::DeleteObject(_)))
        .expect("remote delete");
    let save_at = calls
        .iter()
        .position(|c| matches!(c, Call::SetDocuments(_)))
        .expect("local save");
    assert!(delete_at < save_at);
}

#[tokio::test]
async fn test_remove_when_remote_already_gone() {
    let (store, engine) = engine();
    let record = engine.records().publish(draft("Spring")).await.expect("publish");
    store.forget_object(record.remote_ref.as_ref().expect("linked"));

    engine.records().remove(&record.id).await.expect("remove");

    assert!(engine.records().list().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_remove_keeps_record_when_remote_delete_fails() {
    let (store, engine) = engine();
    let record = engine.records().publish(draft("Spring")).await.expect("publish");
    store.fail_next(Op::DeleteObject, StoreError::Timeout(std::time::Duration::from_secs(1)));

    let err = engine.records().remove(&record.id).await.expect_err("timeout");

    assert!(err.is_retryable());
    assert_eq!(engine.records().list().await.expect("list"), vec![record]);
}

// ============================================================================
// Records that fail validation
// ============================================================================

#[tokio::test]
async fn test_edits_proceed_alongside_stored_invalid_record() {
    let (store, engine) = engine();
    let spring = engine.records().publish(draft("Spring")).await.expect("publish");
    store.insert_unknown_condition_record("r-newer");

    engine
        .records()
        .set_active(&spring.id, false)
        .await
        .expect("toggle");
    engine.records().publish(draft("Summer")).await.expect("publish");
    engine.records().remove(&spring.id).await.expect("remove");

    let ids: Vec<String> = engine
        .records()
        .list()
        .await
        .expect("list")
        .into_iter()
        .map(|r| r.id.to_string())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"r-newer".to_string()));
}

#[tokio::test]
async fn test_changing_invalid_record_is_rejected() {
    let (store, engine) = engine();
    store.insert_unknown_condition_record("r-newer");

    let err = engine
        .records()
        .set_active(&RecordId::new("r-newer"), false)
        .await
        .expect_err("changed record must validate");
    assert!(matches!(err, SyncError::Record(_)));

    engine
        .records()
        .remove(&RecordId::new("r-newer"))
        .await
        .expect("removal needs no validation");
    assert!(engine.records().list().await.expect("list").is_empty());
}

// ============================================================================
// Edits during reconciliation
// ============================================================================

#[tokio::test]
async fn test_publish_during_reconcile_is_kept() {
    let (store, engine) = engine();
    engine.records().publish(draft("First")).await.expect("publish");
    store.delay_lookups(Duration::from_millis(100));

    let (pass, second) = tokio::join!(engine.reconcile(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.records().publish(draft("Second")).await
    });
    pass.expect("reconcile should succeed");
    let second = second.expect("publish should succeed");
    let remote_ref = second.remote_ref.clone().expect("linked");

    let stored = engine.records().list().await.expect("list");
    assert!(stored.iter().any(|r| r.id == second.id));

    let report = engine.reconcile().await.expect("next pass");
    assert_eq!(report.deleted_orphan_count, 0);
    assert!(store.has_object(&remote_ref));
}

#[tokio::test]
async fn test_toggle_during_reconcile_is_kept() {
    let (store, engine) = engine();
    let record = engine.records().publish(draft("First")).await.expect("publish");
    store.delay_lookups(Duration::from_millis(100));

    let (pass, toggled) = tokio::join!(engine.reconcile(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.records().set_active(&record.id, false).await
    });
    pass.expect("reconcile should succeed");
    toggled.expect("toggle should succeed");

    let stored = engine.records().list().await.expect("list");
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].active);
}

#[tokio::test]
async fn test_remove_during_reconcile_stays_removed() {
    let (store, engine) = engine();
    let removed = engine.records().publish(draft("First")).await.expect("publish");
    let kept = engine.records().publish(draft("Second")).await.expect("publish");
    store.delay_lookups(Duration::from_millis(100));

    let (pass, outcome) = tokio::join!(engine.reconcile(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.records().remove(&removed.id).await
    });
    pass.expect("reconcile should succeed");
    outcome.expect("remove should succeed");

    assert_eq!(engine.records().list().await.expect("list"), vec![kept]);
    assert!(!store.has_object(removed.remote_ref.as_ref().expect("linked")));
}
