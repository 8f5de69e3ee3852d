//! Identity provider and per-session identity.
//!
//! The provider turns email + password into an [`Identity`]. Which identity
//! is signed in belongs to the session: each [`SessionIdentity`] is a
//! subscribable value that the application context follows.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

use lifestream_core::{Email, UserId};

use crate::store::StoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account already exists for this email.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Signed in, but no profile record exists for the identity.
    #[error("role not found")]
    RoleNotFound,

    /// Profile lookup or write failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Credential storage failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uid: UserId,
    pub email: Email,
}

/// Turns credentials into identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Create an account.
    async fn sign_up(&self, email: &Email, password: &str) -> Result<Identity, AuthError>;

    /// Check credentials.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, AuthError>;
}

/// The identity signed in on one session.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    tx: Arc<watch::Sender<Option<Identity>>>,
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIdentity {
    /// A signed-out session.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Currently signed-in identity.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Follow identity changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }

    pub(crate) fn set(&self, identity: Option<Identity>) {
        self.tx.send_replace(identity);
    }
}

// =============================================================================
// Password hashing
// =============================================================================

/// Hash a password with Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

fn new_uid() -> UserId {
    UserId::new(uuid::Uuid::new_v4().simple().to_string())
}

// =============================================================================
// In-memory provider
// =============================================================================

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password_hash: String,
}

/// Password provider holding accounts in process memory.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryIdentityProvider {
    /// An empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn account_key(email: &Email) -> String {
    email.as_str().to_lowercase()
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        let password_hash = hash_password(password)?;
        let identity = Identity {
            uid: new_uid(),
            email: email.clone(),
        };

        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if accounts.contains_key(&account_key(email)) {
            return Err(AuthError::UserAlreadyExists);
        }
        accounts.insert(
            account_key(email),
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );
        drop(accounts);

        Ok(identity)
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        let account = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&account_key(email))
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &account.password_hash)?;
        Ok(account.identity)
    }
}

// =============================================================================
// PostgreSQL provider
// =============================================================================

/// Password provider storing credentials in `portal.credentials`.
#[derive(Debug, Clone)]
pub struct PgIdentityProvider {
    pool: PgPool,
}

impl PgIdentityProvider {
    /// Create a provider using an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        let password_hash = hash_password(password)?;
        let uid = new_uid();

        sqlx::query("INSERT INTO portal.credentials (uid, email, password_hash) VALUES ($1, $2, $3)")
            .bind(uid.as_str())
            .bind(email.as_str())
            .bind(&password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AuthError::UserAlreadyExists
                }
                other => AuthError::Database(other),
            })?;

        Ok(Identity {
            uid,
            email: email.clone(),
        })
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT uid, password_hash FROM portal.credentials WHERE lower(email) = lower($1)",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let (uid, password_hash) = row.ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &password_hash)?;

        Ok(Identity {
            uid: UserId::new(uid),
            email: email.clone(),
        })
    }
}
