//! LifeStream Portal library.
//!
//! The blood donor and recipient portal: a live record store adapter, a
//! per-session application context, notification dispatch, and the HTTP
//! surface that ties them together.
//!
//! # Layers
//!
//! - [`store`] - Keyed JSON collections with live snapshots (memory or `PostgreSQL`)
//! - [`identity`] - Password accounts and the session's signed-in identity
//! - [`context`] - Live entity views and fire-and-forget mutations
//! - [`notify`] - Donor confirmation and admin alert emails
//! - [`services`] - Form flows: donation, blood request, bank, sign-in
//! - [`routes`] / [`middleware`] / [`state`] - Axum wiring

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod notify;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::Router;

use crate::state::AppState;

/// Build the application router with its session layer.
///
/// Tracing and Sentry layers are added by the binary.
pub fn app(state: AppState, secure_cookies: bool) -> Router {
    routes::routes()
        .layer(middleware::create_session_layer(secure_cookies))
        .with_state(state)
}
