//! Blood requests and admin status changes.

#![allow(clippy::unwrap_used)]

use std::num::NonZeroU32;

use lifestream_core::{BloodGroup, RequestKey, RequestPatch, RequestStatus, Urgency};
use lifestream_integration_tests::{Harness, bob_request};
use lifestream_portal::services::RequestService;
use lifestream_portal::store::StoreError;

#[tokio::test]
async fn test_request_is_stored_pending() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let receipt = RequestService
        .submit(&ctx, &bob_request())
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(receipt.title, "Request Submitted Successfully!");
    assert!(receipt.message.contains("2 unit(s) of O- blood"));

    let requests = ctx.wait_for_requests(|r| r.len() == 1).await;
    let stored = &requests[0].record;
    assert_eq!(requests[0].id, receipt.key);
    assert_eq!(stored.patient_name, "Bob");
    assert_eq!(stored.blood_group, BloodGroup::ONegative);
    assert_eq!(stored.units, NonZeroU32::new(2).unwrap());
    assert_eq!(stored.hospital, "X General");
    assert_eq!(stored.urgency, Urgency::Urgent);
    assert_eq!(stored.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_zero_units_is_rejected() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let mut form = bob_request();
    form.quantity = 0;
    let errors = RequestService.submit(&ctx, &form).unwrap_err();

    assert!(errors.has("quantity"));
    tokio::task::yield_now().await;
    assert!(ctx.requests().is_empty());
}

#[tokio::test]
async fn test_toggle_changes_only_status() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let key = RequestService
        .submit(&ctx, &bob_request())
        .unwrap()
        .into_write()
        .await
        .unwrap();
    let before = ctx.wait_for_requests(|r| r.len() == 1).await[0].clone();

    let status = ctx.toggle_request_status(key.clone()).await.unwrap();
    assert_eq!(status, RequestStatus::Fulfilled);

    let after = ctx
        .wait_for_requests(|r| r.iter().any(|q| q.record.status == RequestStatus::Fulfilled))
        .await[0]
        .clone();
    assert_eq!(after.id, before.id);
    assert_eq!(after.record.patient_name, before.record.patient_name);
    assert_eq!(after.record.blood_group, before.record.blood_group);
    assert_eq!(after.record.units, before.record.units);
    assert_eq!(after.record.hospital, before.record.hospital);
    assert_eq!(after.record.urgency, before.record.urgency);

    let status = ctx.toggle_request_status(key).await.unwrap();
    assert_eq!(status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_toggle_missing_request_fails() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let err = ctx
        .toggle_request_status(RequestKey::new("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_admin_edit_merges_fields() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let key = RequestService
        .submit(&ctx, &bob_request())
        .unwrap()
        .into_write()
        .await
        .unwrap();

    ctx.update_request(
        key,
        RequestPatch {
            hospital: Some("St. Mary".to_owned()),
            ..RequestPatch::default()
        },
    )
    .await
    .unwrap();

    let requests = ctx
        .wait_for_requests(|r| r.iter().any(|q| q.record.hospital == "St. Mary"))
        .await;
    assert_eq!(requests[0].record.patient_name, "Bob");
    assert_eq!(requests[0].record.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_delete_removes_and_tolerates_absent_key() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let key = RequestService
        .submit(&ctx, &bob_request())
        .unwrap()
        .into_write()
        .await
        .unwrap();
    ctx.wait_for_requests(|r| r.len() == 1).await;

    ctx.delete_request(key.clone()).await.unwrap();
    let requests = ctx.wait_for_requests(|r| r.is_empty()).await;
    assert!(requests.is_empty());

    ctx.delete_request(key).await.unwrap();
    ctx.delete_request(RequestKey::new("never-existed"))
        .await
        .unwrap();
    assert!(ctx.requests().is_empty());
}
