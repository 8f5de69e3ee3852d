//! Donation submissions: eligibility, the donor write, and notifications.

#![allow(clippy::unwrap_used)]

use lifestream_core::eligibility::Violation;
use lifestream_core::BloodGroup;
use lifestream_integration_tests::{ADMIN_EMAIL, Harness, alice_form, days_ago, today};
use lifestream_portal::services::DonationOutcome;

#[tokio::test]
async fn test_eligible_donor_is_stored_and_notified() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let outcome = harness
        .donations()
        .submit(&ctx, &alice_form(), today())
        .unwrap();
    let DonationOutcome::Accepted(accepted) = outcome else {
        panic!("expected an accepted donation");
    };
    let receipt = accepted.settle().await.unwrap();

    assert_eq!(receipt.title, "Registration Successful!");
    assert!(receipt.email_sent);

    let donors = ctx.wait_for_donors(|d| !d.is_empty()).await;
    assert_eq!(donors.len(), 1);
    assert_eq!(donors[0].id, receipt.key);
    assert_eq!(donors[0].record.name, "Alice");
    assert_eq!(donors[0].record.blood_group, BloodGroup::APositive);
    assert_eq!(donors[0].record.last_donation, days_ago(100));

    let sent = harness.mail.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|m| m.to.as_str() == "a@x.com" && m.text.contains("Dear Alice,")));
    assert!(sent.iter().any(|m| m.to.as_str() == ADMIN_EMAIL && m.text.contains("A+")));
}

#[tokio::test]
async fn test_underage_donor_writes_nothing() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let mut form = alice_form();
    form.age = 17;
    let outcome = harness.donations().submit(&ctx, &form, today()).unwrap();

    let DonationOutcome::Ineligible(verdict) = outcome else {
        panic!("expected an ineligible donation");
    };
    assert_eq!(verdict.violations(), &[Violation::TooYoung { age: 17 }]);
    assert_eq!(
        verdict.reasons(),
        vec!["You must be at least 18 years old to donate."]
    );

    tokio::task::yield_now().await;
    assert!(ctx.donors().is_empty());
    assert!(harness.store.is_empty(lifestream_core::Collection::Donors));
    assert!(harness.mail.sent().is_empty());
}

#[tokio::test]
async fn test_recent_donation_reports_interval() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let mut form = alice_form();
    form.age = 70;
    form.last_donation_date = days_ago(56);
    let DonationOutcome::Ineligible(verdict) =
        harness.donations().submit(&ctx, &form, today()).unwrap()
    else {
        panic!("expected an ineligible donation");
    };

    assert_eq!(verdict.violations().len(), 2);
    assert!(harness.mail.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_form_is_rejected_per_field() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let mut form = alice_form();
    form.phone = "12345".to_owned();
    form.email = "not-an-email".to_owned();
    let errors = harness
        .donations()
        .submit(&ctx, &form, today())
        .unwrap_err();

    assert!(errors.has("phone"));
    assert!(errors.has("email"));
    assert!(!errors.has("name"));
    assert!(harness.mail.sent().is_empty());
}

#[tokio::test]
async fn test_mail_failure_keeps_donor() {
    let harness = Harness::with_failing_mail();
    let ctx = harness.context().await;

    let DonationOutcome::Accepted(accepted) = harness
        .donations()
        .submit(&ctx, &alice_form(), today())
        .unwrap()
    else {
        panic!("expected an accepted donation");
    };
    let receipt = accepted.settle().await.unwrap();

    assert!(!receipt.email_sent);
    assert!(receipt.message.contains("We will contact you shortly"));

    let donors = ctx.wait_for_donors(|d| d.len() == 1).await;
    assert_eq!(donors[0].id, receipt.key);
}

#[tokio::test]
async fn test_signed_in_donation_is_owned() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let signup = lifestream_core::forms::SignUpForm {
        email: "donor@x.com".to_owned(),
        password: "correct horse".to_owned(),
        confirm_password: "correct horse".to_owned(),
    }
    .validate()
    .unwrap();
    let outcome = harness.auth().sign_up(signup).await.unwrap();
    ctx.sign_in(&outcome.identity.email, "correct horse")
        .await
        .unwrap();

    let DonationOutcome::Accepted(accepted) = harness
        .donations()
        .submit(&ctx, &alice_form(), today())
        .unwrap()
    else {
        panic!("expected an accepted donation");
    };
    accepted.settle().await.unwrap();
    ctx.wait_for_donors(|d| d.len() == 1).await;

    let mine = ctx.my_donations();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].record.user_id.as_ref(), Some(&outcome.identity.uid));
}
