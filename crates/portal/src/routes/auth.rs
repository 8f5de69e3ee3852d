//! Account route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use lifestream_core::forms::{SignInForm, SignUpForm};

use crate::error::{AppError, set_sentry_user};
use crate::services::SignInOutcome;
use crate::state::AppState;

/// Sign-in / sign-up response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub title: &'static str,
    pub message: &'static str,
    #[serde(flatten)]
    pub outcome: SignInOutcome,
    pub redirect: &'static str,
}

/// Create an account and sign the session in.
///
/// POST /api/auth/signup
#[instrument(skip_all)]
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SignUpForm>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let signup = form.validate()?;
    let outcome = state.auth().sign_up(signup).await?;
    state
        .sign_in_session(&session, outcome.identity.clone())
        .await?;

    set_sentry_user(outcome.identity.uid.as_str());
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            title: "Account Created",
            message: "You have been successfully registered.",
            redirect: outcome.destination.path(),
            outcome,
        }),
    ))
}

/// Sign in and route by role.
///
/// POST /api/auth/signin
#[instrument(skip_all)]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SignInForm>,
) -> Result<Json<SessionResponse>, AppError> {
    let outcome = state.auth().sign_in(&form).await?;
    state
        .sign_in_session(&session, outcome.identity.clone())
        .await?;

    set_sentry_user(outcome.identity.uid.as_str());
    info!(uid = %outcome.identity.uid, role = %outcome.role, "Signed in");
    Ok(Json(SessionResponse {
        title: "Login Successful",
        message: "Welcome back!",
        redirect: outcome.destination.path(),
        outcome,
    }))
}

/// Sign out and drop the session's context.
///
/// POST /api/auth/signout
#[instrument(skip_all)]
pub async fn sign_out(
    State(state): State<AppState>,
    session: Session,
) -> Result<StatusCode, AppError> {
    state.close_session(&session).await?;
    sentry::configure_scope(|scope| scope.set_user(None));
    Ok(StatusCode::NO_CONTENT)
}
