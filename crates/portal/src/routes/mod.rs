//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                           - Health check
//!
//! # Public
//! GET    /api/banks?q=&blood_group=        - Bank directory
//! POST   /api/eligibility                  - Eligibility check only
//! POST   /api/donate                       - Donor registration
//! POST   /api/requests                     - Blood request
//!
//! # Accounts
//! POST   /api/auth/signup                  - Create account and sign in
//! POST   /api/auth/signin                  - Sign in, routed by role
//! POST   /api/auth/signout                 - Sign out
//! GET    /api/me/dashboard                 - Own donations and requests
//!
//! # Admin
//! GET    /api/admin/stats                  - Dashboard counters
//! GET    /api/admin/donors                 - All donors
//! PUT    /api/admin/donors/{key}           - Edit donor
//! DELETE /api/admin/donors/{key}           - Delete donor
//! GET    /api/admin/requests               - All requests
//! PUT    /api/admin/requests/{key}         - Edit request
//! DELETE /api/admin/requests/{key}         - Delete request
//! POST   /api/admin/requests/{key}/toggle  - Flip Pending/Fulfilled
//! POST   /api/admin/banks                  - Add bank
//! PUT    /api/admin/banks/{key}            - Edit bank
//! DELETE /api/admin/banks/{key}            - Delete bank
//! ```

pub mod admin;
pub mod auth;
pub mod banks;
pub mod dashboard;
pub mod donate;
pub mod requests;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Build the portal router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Public
        .route("/api/banks", get(banks::directory))
        .route("/api/eligibility", post(donate::check_eligibility))
        .route("/api/donate", post(donate::submit))
        .route("/api/requests", post(requests::submit))
        // Accounts
        .route("/api/auth/signup", post(auth::sign_up))
        .route("/api/auth/signin", post(auth::sign_in))
        .route("/api/auth/signout", post(auth::sign_out))
        .route("/api/me/dashboard", get(dashboard::mine))
        // Admin
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/donors", get(admin::list_donors))
        .route(
            "/api/admin/donors/{key}",
            put(admin::update_donor).delete(admin::delete_donor),
        )
        .route("/api/admin/requests", get(admin::list_requests))
        .route(
            "/api/admin/requests/{key}",
            put(admin::update_request).delete(admin::delete_request),
        )
        .route(
            "/api/admin/requests/{key}/toggle",
            post(admin::toggle_request),
        )
        .route("/api/admin/banks", post(admin::add_bank))
        .route(
            "/api/admin/banks/{key}",
            put(admin::update_bank).delete(admin::delete_bank),
        )
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}
