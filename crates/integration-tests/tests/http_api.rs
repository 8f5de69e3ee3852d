//! The portal router end to end over in-memory backends.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use lifestream_core::BloodGroup;
use lifestream_integration_tests::{ADMIN_EMAIL, Harness};
use lifestream_portal::store::seed::{demo_banks, seed_demo_data};

async fn app(harness: &Harness) -> Router {
    lifestream_portal::app(harness.app_state().await, false)
}

fn real_days_ago(days: u64) -> String {
    chrono::Local::now()
        .date_naive()
        .checked_sub_days(chrono::Days::new(days))
        .unwrap()
        .to_string()
}

fn post(uri: &str, body: &Value, cookie: Option<&str>) -> Request<Body> {
    let mut request = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut request = Request::get(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_owned);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, cookie, body)
}

fn donor_json(age: u32, last_donation_days_ago: u64) -> Value {
    json!({
        "name": "Alice",
        "age": age,
        "gender": "Female",
        "bloodGroup": "A+",
        "phone": "1234567890",
        "email": "a@x.com",
        "location": "NYC",
        "lastDonationDate": real_days_ago(last_donation_days_ago),
    })
}

fn signup_json(email: &str) -> Value {
    json!({
        "email": email,
        "password": "hunter2hunter2",
        "confirmPassword": "hunter2hunter2",
    })
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::new();
    let app = app(&harness).await;

    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_donate_eligible_returns_receipt() {
    let harness = Harness::new();
    let app = app(&harness).await;

    let (status, _, body) = send(&app, post("/api/donate", &donor_json(30, 100), None)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["eligible"], json!(true));
    assert_eq!(body["receipt"]["title"], json!("Registration Successful!"));
    assert_eq!(harness.mail.sent().len(), 2);
}

#[tokio::test]
async fn test_donate_ineligible_lists_reasons() {
    let harness = Harness::new();
    let app = app(&harness).await;

    let (status, _, body) = send(&app, post("/api/donate", &donor_json(17, 10), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eligible"], json!(false));
    assert_eq!(body["title"], json!("Not Eligible to Donate"));
    assert_eq!(body["reasons"].as_array().unwrap().len(), 2);
    assert!(body.get("receipt").is_none());
    assert!(harness.mail.sent().is_empty());
}

#[tokio::test]
async fn test_donate_invalid_fields_is_422() {
    let harness = Harness::new();
    let app = app(&harness).await;

    let mut donor = donor_json(30, 100);
    donor["phone"] = json!("123");
    let (status, _, body) = send(&app, post("/api/donate", &donor, None)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], json!("phone"));
}

#[tokio::test]
async fn test_eligibility_check_only() {
    let harness = Harness::new();
    let app = app(&harness).await;

    let query = json!({ "age": 66, "lastDonationDate": real_days_ago(200) });
    let (status, _, body) = send(&app, post("/api/eligibility", &query, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eligible"], json!(false));
    assert_eq!(body["violations"][0]["rule"], json!("too_old"));
}

#[tokio::test]
async fn test_request_submission_is_created() {
    let harness = Harness::new();
    let app = app(&harness).await;

    let request = json!({
        "patientName": "Bob",
        "bloodGroup": "O-",
        "quantity": 2,
        "urgency": "Urgent",
        "hospitalName": "X General",
        "contactNumber": "1234567890",
        "email": "b@x.com",
        "city": "LA",
    });
    let (status, _, body) = send(&app, post("/api/requests", &request, None)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], json!("Request Submitted Successfully!"));
}

#[tokio::test]
async fn test_bank_directory_filters_by_group() {
    let harness = Harness::new();
    seed_demo_data(harness.store.as_ref()).await.unwrap();
    let app = app(&harness).await;

    let (status, _, body) = send(&app, get("/api/banks?blood_group=O-", None)).await;

    let expected = demo_banks()
        .iter()
        .filter(|b| b.available.get(&BloodGroup::ONegative).is_some_and(|u| *u > 0))
        .count();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), expected);
}

#[tokio::test]
async fn test_admin_routes_require_admin_session() {
    let harness = Harness::new();
    let app = app(&harness).await;

    let (status, _, _) = send(&app, get("/api/admin/stats", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, cookie, _) = send(&app, post("/api/auth/signup", &signup_json("user@x.com"), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _, _) = send(&app, get("/api/admin/stats", cookie.as_deref())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_can_add_bank_and_read_stats() {
    let harness = Harness::new();
    let app = app(&harness).await;

    let (status, cookie, body) =
        send(&app, post("/api/auth/signup", &signup_json(ADMIN_EMAIL), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["redirect"], json!("/admin/dashboard"));
    let cookie = cookie.unwrap();

    let bank = json!({ "name": "City Blood Bank", "location": "Downtown", "contact": "555-0100" });
    let (status, _, body) = send(&app, post("/api/admin/banks", &bank, Some(&cookie))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["message"],
        json!("City Blood Bank has been successfully added.")
    );

    let (status, _, stats) = send(&app, get("/api/admin/stats", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalBanks"], json!(1));
}

#[tokio::test]
async fn test_sign_out_ends_session() {
    let harness = Harness::new();
    let app = app(&harness).await;

    let (_, cookie, _) = send(&app, post("/api/auth/signup", &signup_json("user@x.com"), None)).await;
    let cookie = cookie.unwrap();

    let (status, _, body) = send(&app, get("/api/me/dashboard", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["donations"].as_array().unwrap().is_empty());

    let (status, _, _) = send(&app, post("/api/auth/signout", &json!({}), Some(&cookie))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&app, get("/api/me/dashboard", Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_failed_sign_ins_open_no_session_context() {
    let harness = Harness::new();
    let state = harness.app_state().await;
    let app = lifestream_portal::app(state.clone(), false);

    let bad = json!({ "email": "nobody@x.com", "password": "wrongwrong" });
    for _ in 0..5 {
        let (status, _, body) = send(&app, post("/api/auth/signin", &bad, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], json!("invalid credentials"));
    }
    assert_eq!(state.sessions().len(), 0);

    let (status, _, _) = send(&app, post("/api/auth/signup", &signup_json("user@x.com"), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(state.sessions().len(), 1);

    let (status, _, _) = send(&app, post("/api/auth/signup", &signup_json("User@X.com"), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(state.sessions().len(), 1);
}

#[tokio::test]
async fn test_admin_sign_in_over_user_session_is_admitted() {
    let harness = Harness::new();
    let app = app(&harness).await;

    let (status, _, _) = send(&app, post("/api/auth/signup", &signup_json(ADMIN_EMAIL), None)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, cookie, _) = send(&app, post("/api/auth/signup", &signup_json("user@x.com"), None)).await;
    let cookie = cookie.unwrap();
    let (status, _, _) = send(&app, get("/api/admin/stats", Some(&cookie))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = json!({ "email": ADMIN_EMAIL, "password": "hunter2hunter2" });
    let (status, _, body) = send(&app, post("/api/auth/signin", &admin, Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect"], json!("/admin/dashboard"));

    let (status, _, _) = send(&app, get("/api/admin/stats", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
}
