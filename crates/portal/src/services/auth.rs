//! Account sign-up and role-routed sign-in.
//!
//! Sign-up creates the identity and its `users/{uid}` profile. The role is
//! fixed at that moment: the configured admin address becomes `admin`,
//! everyone else `user`. Sign-in routes by that role and fails with
//! "role not found" when the profile is missing.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use lifestream_core::forms::{SignInForm, ValidSignUp};
use lifestream_core::{Email, ProfileRecord, Role, UserProfile};

use crate::identity::{AuthError, Identity, IdentityProvider};
use crate::store::{RecordStore, Records};

/// Where a signed-in user lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    AdminDashboard,
    UserDashboard,
}

impl Destination {
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self::AdminDashboard,
            Role::User => Self::UserDashboard,
        }
    }

    /// Path of the landing page.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::AdminDashboard => "/admin/dashboard",
            Self::UserDashboard => "/dashboard",
        }
    }
}

/// A successful sign-up or sign-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInOutcome {
    pub identity: Identity,
    pub role: Role,
    pub destination: Destination,
}

impl SignInOutcome {
    fn new(identity: Identity, role: Role) -> Self {
        Self {
            identity,
            role,
            destination: Destination::for_role(role),
        }
    }
}

/// Sign-up and sign-in against the identity provider.
///
/// Neither call touches a session: the caller binds the returned identity
/// to a context only once the credentials have been accepted.
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    users: Records<UserProfile>,
    admin_email: Email,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        admin_email: Email,
    ) -> Self {
        Self {
            identity,
            users: Records::new(store),
            admin_email,
        }
    }

    /// Role a new account with `email` receives.
    #[must_use]
    pub fn role_for(&self, email: &Email) -> Role {
        if email.matches(&self.admin_email) {
            Role::Admin
        } else {
            Role::User
        }
    }

    /// Create an account and write its profile.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserAlreadyExists`] for a taken email, or a store
    /// error if the profile cannot be written.
    #[instrument(skip(self, signup), fields(email = %signup.email))]
    pub async fn sign_up(&self, signup: ValidSignUp) -> Result<SignInOutcome, AuthError> {
        let identity = self.identity.sign_up(&signup.email, &signup.password).await?;
        let role = self.role_for(&identity.email);

        let profile = ProfileRecord {
            email: identity.email.clone(),
            role,
            created_at: Utc::now(),
        };
        self.users.put(&identity.uid, &profile).await?;

        info!(uid = %identity.uid, role = %role, "Account created");
        Ok(SignInOutcome::new(identity, role))
    }

    /// Check credentials, load the profile, and route by role.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on bad credentials and
    /// [`AuthError::RoleNotFound`] when the account has no profile.
    #[instrument(skip(self, form))]
    pub async fn sign_in(&self, form: &SignInForm) -> Result<SignInOutcome, AuthError> {
        let email = Email::parse(&form.email).map_err(|_| AuthError::InvalidCredentials)?;
        let identity = self.identity.sign_in(&email, &form.password).await?;

        let Some(profile) = self.users.get(&identity.uid).await? else {
            warn!(uid = %identity.uid, "Signed in without a profile");
            return Err(AuthError::RoleNotFound);
        };

        Ok(SignInOutcome::new(identity, profile.record.role))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityProvider;
    use crate::store::MemoryStore;

    #[test]
    fn test_admin_email_gets_admin_role() {
        let service = AuthService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryIdentityProvider::new()),
            Email::parse("admin@example.com").unwrap(),
        );
        assert_eq!(
            service.role_for(&Email::parse("Admin@Example.com").unwrap()),
            Role::Admin
        );
        assert_eq!(
            service.role_for(&Email::parse("amy@example.com").unwrap()),
            Role::User
        );
    }

    #[test]
    fn test_destination_paths() {
        assert_eq!(Destination::for_role(Role::Admin).path(), "/admin/dashboard");
        assert_eq!(Destination::for_role(Role::User).path(), "/dashboard");
    }
}
