//! Sign-up, sign-in, and role routing.

#![allow(clippy::unwrap_used)]

use lifestream_core::forms::{SignInForm, SignUpForm};
use lifestream_core::{Email, Role};
use lifestream_integration_tests::{ADMIN_EMAIL, Harness};
use lifestream_portal::identity::{AuthError, IdentityProvider};
use lifestream_portal::services::Destination;

const PASSWORD: &str = "hunter2hunter2";

fn sign_up_form(email: &str) -> SignUpForm {
    SignUpForm {
        email: email.to_owned(),
        password: PASSWORD.to_owned(),
        confirm_password: PASSWORD.to_owned(),
    }
}

fn sign_in_form(email: &str) -> SignInForm {
    SignInForm {
        email: email.to_owned(),
        password: PASSWORD.to_owned(),
    }
}

#[tokio::test]
async fn test_admin_address_gets_admin_role() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    let outcome = harness
        .auth()
        .sign_up(sign_up_form(ADMIN_EMAIL).validate().unwrap())
        .await
        .unwrap();

    assert_eq!(outcome.role, Role::Admin);
    assert_eq!(outcome.destination, Destination::AdminDashboard);

    ctx.sign_in(&outcome.identity.email, PASSWORD).await.unwrap();
    let profile = ctx
        .wait_for_profile(|p| p.is_some())
        .await
        .unwrap();
    assert!(profile.is_admin());
    assert_eq!(profile.id, outcome.identity.uid);
}

#[tokio::test]
async fn test_other_address_gets_user_role() {
    let harness = Harness::new();

    let outcome = harness
        .auth()
        .sign_up(sign_up_form("someone@x.com").validate().unwrap())
        .await
        .unwrap();

    assert_eq!(outcome.role, Role::User);
    assert_eq!(outcome.destination.path(), "/dashboard");
}

#[tokio::test]
async fn test_sign_in_routes_by_stored_role() {
    let harness = Harness::new();
    let auth = harness.auth();

    let created = auth
        .sign_up(sign_up_form(ADMIN_EMAIL).validate().unwrap())
        .await
        .unwrap();

    let outcome = auth.sign_in(&sign_in_form(ADMIN_EMAIL)).await.unwrap();
    assert_eq!(outcome.destination.path(), "/admin/dashboard");
    assert_eq!(outcome.identity, created.identity);
}

#[tokio::test]
async fn test_sign_up_does_not_touch_a_session() {
    let harness = Harness::new();
    let ctx = harness.context().await;

    harness
        .auth()
        .sign_up(sign_up_form("someone@x.com").validate().unwrap())
        .await
        .unwrap();

    assert!(ctx.current_user().is_none());
}

#[tokio::test]
async fn test_missing_profile_is_role_not_found() {
    let harness = Harness::new();

    let email = Email::parse("ghost@x.com").unwrap();
    harness.identity.sign_up(&email, PASSWORD).await.unwrap();

    let err = harness
        .auth()
        .sign_in(&sign_in_form("ghost@x.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::RoleNotFound));
    assert_eq!(err.to_string(), "role not found");
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let harness = Harness::new();
    let auth = harness.auth();

    auth.sign_up(sign_up_form("someone@x.com").validate().unwrap())
        .await
        .unwrap();

    let err = auth
        .sign_in(&SignInForm {
            email: "someone@x.com".to_owned(),
            password: "wrong password".to_owned(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_duplicate_sign_up_is_rejected() {
    let harness = Harness::new();
    let auth = harness.auth();

    auth.sign_up(sign_up_form("someone@x.com").validate().unwrap())
        .await
        .unwrap();
    let err = auth
        .sign_up(sign_up_form("Someone@X.com").validate().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UserAlreadyExists));
}
