//! Context extractors.
//!
//! Resolve the [`AppContext`] a request acts through: the session's own
//! context when one is registered, otherwise the shared anonymous one.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::context::AppContext;
use crate::error::AppError;
use crate::identity::{AuthError, Identity};
use crate::state::AppState;

/// How long an admin check waits for the profile to load after sign-in.
const PROFILE_LOAD_TIMEOUT: Duration = Duration::from_secs(2);

async fn registered_context(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<Arc<AppContext>>, AppError> {
    match parts.extensions.get::<Session>() {
        Some(session) => state.session_context(session).await,
        None => Ok(None),
    }
}

/// The session's context, or the anonymous context for visitors.
pub struct PortalContext(pub Arc<AppContext>);

impl FromRequestParts<AppState> for PortalContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = registered_context(parts, state)
            .await?
            .unwrap_or_else(|| Arc::clone(state.public()));
        Ok(Self(ctx))
    }
}

/// Requires a signed-in session.
pub struct RequireUser {
    pub ctx: Arc<AppContext>,
    pub identity: Identity,
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = registered_context(parts, state)
            .await?
            .ok_or_else(|| AppError::Unauthorized("please sign in".to_string()))?;
        let identity = ctx
            .current_user()
            .ok_or_else(|| AppError::Unauthorized("please sign in".to_string()))?;

        crate::error::set_sentry_user(identity.uid.as_str());
        Ok(Self { ctx, identity })
    }
}

/// Requires a signed-in session whose profile has the admin role.
pub struct RequireAdmin(pub Arc<AppContext>);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser { ctx, identity } = RequireUser::from_request_parts(parts, state).await?;

        let is_current = |p: &Option<lifestream_core::UserProfile>| {
            p.as_ref().is_some_and(|p| p.id == identity.uid)
        };
        let loaded = ctx.user_profile();
        let profile = if is_current(&loaded) {
            loaded
        } else {
            tokio::time::timeout(PROFILE_LOAD_TIMEOUT, ctx.wait_for_profile(is_current))
                .await
                .ok()
                .flatten()
                .filter(|profile| profile.id == identity.uid)
        };

        match profile {
            Some(profile) if profile.is_admin() => Ok(Self(ctx)),
            Some(_) => Err(AppError::Forbidden("admin access required".to_string())),
            None => Err(AppError::Auth(AuthError::RoleNotFound)),
        }
    }
}
