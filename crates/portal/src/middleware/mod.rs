//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions, in-memory store)

pub mod auth;
pub mod session;

pub use auth::{PortalContext, RequireAdmin, RequireUser};
pub use session::create_session_layer;
