//! Unified error handling for the portal.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use lifestream_core::forms::FieldErrors;

use crate::identity::AuthError;
use crate::store::StoreError;

/// Application-level error type for the portal.
#[derive(Debug, Error)]
pub enum AppError {
    /// Form input failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] FieldErrors),

    /// Sign-up or sign-in failed.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Record store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(AuthError::UserAlreadyExists) => StatusCode::CONFLICT,
            Self::Auth(AuthError::InvalidCredentials | AuthError::RoleNotFound)
            | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Store(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Store(_) | Self::Auth(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self) -> String {
        match self {
            Self::Validation(_) => "Please correct the highlighted fields.".to_string(),
            Self::Auth(
                e @ (AuthError::InvalidCredentials
                | AuthError::RoleNotFound
                | AuthError::UserAlreadyExists),
            ) => e.to_string(),
            Self::Store(StoreError::NotFound { .. }) => "Record not found".to_string(),
            Self::Store(e) if e.is_retryable() => {
                "The record store is unavailable. Please try again.".to_string()
            }
            Self::Store(_) | Self::Auth(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Unauthorized(_) | Self::Forbidden(_) => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Portal request error"
            );
        }

        let body = match &self {
            Self::Validation(fields) => json!({
                "error": self.public_message(),
                "fields": fields.errors(),
            }),
            _ => json!({ "error": self.public_message() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Set the Sentry user context from a signed-in identity.
///
/// Only the uid is sent; emails stay out of error reports.
pub fn set_sentry_user(uid: &str) {
    let user = sentry_user(uid);
    sentry::configure_scope(|scope| scope.set_user(Some(user)));
}

fn sentry_user(uid: &str) -> sentry::User {
    sentry::User {
        id: Some(uid.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use lifestream_core::Collection;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Forbidden("admin access required".to_string());
        assert_eq!(err.to_string(), "Forbidden: admin access required");
    }

    #[test]
    fn test_app_error_status_codes() {
        let mut fields = FieldErrors::default();
        fields.push("age", "You must be at least 18 years old to donate.");

        assert_eq!(
            get_status(AppError::Validation(fields)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::RoleNotFound)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::UserAlreadyExists)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Store(StoreError::NotFound {
                collection: Collection::Requests,
                key: "r1".to_string(),
            })),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Store(StoreError::Dispatch("cancelled".to_string()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_only_retryable_store_errors_ask_for_retry() {
        let err = AppError::Store(StoreError::Dispatch("cancelled".to_string()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.public_message().contains("try again"));

        let err = AppError::Store(StoreError::Malformed {
            collection: Collection::Donors,
            key: "d1".to_string(),
            reason: "missing field `age`".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::Store(StoreError::NotAnObject {
            collection: Collection::Banks,
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_sentry_user_carries_only_the_uid() {
        let user = sentry_user("uid-1");
        assert_eq!(user.id.as_deref(), Some("uid-1"));
        assert!(user.email.is_none());
        assert!(user.username.is_none());
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Internal("pool exhausted".to_string());
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::Auth(AuthError::RoleNotFound);
        assert_eq!(err.public_message(), "role not found");
    }
}
