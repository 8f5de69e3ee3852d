//! Application state shared across handlers.
//!
//! Holds the store, the identity provider, the services, and two kinds of
//! [`AppContext`]: one shared anonymous context for public reads and
//! anonymous submissions, and one context per signed-in browser session,
//! registered under a token kept in the `tower-sessions` session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tower_sessions::Session;
use tracing::{debug, info};

use crate::context::AppContext;
use crate::error::AppError;
use crate::identity::{Identity, IdentityProvider};
use crate::notify::Notifier;
use crate::services::{AuthService, BankService, DonationService, RequestService};
use crate::store::{RecordStore, StoreError};

/// Session key holding the registry token.
pub const CONTEXT_SESSION_KEY: &str = "portal_context";

/// Contexts idle longer than this are dropped from the registry.
const CONTEXT_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

struct Registered {
    ctx: Arc<AppContext>,
    last_seen: Instant,
}

/// Per-session contexts keyed by registry token.
#[derive(Default)]
pub struct SessionRegistry {
    contexts: Mutex<HashMap<String, Registered>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}

impl SessionRegistry {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Registered>> {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live session contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, token: &str) -> Option<Arc<AppContext>> {
        let mut contexts = self.lock();
        let entry = contexts.get_mut(token)?;
        entry.last_seen = Instant::now();
        Some(Arc::clone(&entry.ctx))
    }

    fn insert(&self, token: String, ctx: Arc<AppContext>) {
        let now = Instant::now();
        let mut contexts = self.lock();
        let before = contexts.len();
        contexts.retain(|_, entry| now.duration_since(entry.last_seen) < CONTEXT_IDLE_TIMEOUT);
        let pruned = before - contexts.len();
        contexts.insert(
            token,
            Registered {
                ctx,
                last_seen: now,
            },
        );
        drop(contexts);

        if pruned > 0 {
            debug!(pruned, "Dropped idle session contexts");
        }
    }

    fn remove(&self, token: &str) -> Option<Arc<AppContext>> {
        self.lock().remove(token).map(|entry| entry.ctx)
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    public: Arc<AppContext>,
    sessions: SessionRegistry,
    donations: DonationService,
    requests: RequestService,
    banks: BankService,
    auth: AuthService,
}

impl AppState {
    /// Create the state and start the shared anonymous context.
    ///
    /// # Errors
    ///
    /// Returns an error if the anonymous context cannot subscribe.
    pub async fn new(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Notifier,
    ) -> Result<Self, StoreError> {
        let public = AppContext::start(Arc::clone(&store), Arc::clone(&identity)).await?;
        let auth = AuthService::new(
            Arc::clone(&store),
            Arc::clone(&identity),
            notifier.admin_email().clone(),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                store,
                identity,
                public: Arc::new(public),
                sessions: SessionRegistry::default(),
                donations: DonationService::new(notifier),
                requests: RequestService,
                banks: BankService,
                auth,
            }),
        })
    }

    /// The shared anonymous context.
    #[must_use]
    pub fn public(&self) -> &Arc<AppContext> {
        &self.inner.public
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    #[must_use]
    pub fn donations(&self) -> &DonationService {
        &self.inner.donations
    }

    #[must_use]
    pub fn requests(&self) -> &RequestService {
        &self.inner.requests
    }

    #[must_use]
    pub fn banks(&self) -> &BankService {
        &self.inner.banks
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// The context registered for `session`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn session_context(
        &self,
        session: &Session,
    ) -> Result<Option<Arc<AppContext>>, AppError> {
        let token: Option<String> = session
            .get(CONTEXT_SESSION_KEY)
            .await
            .map_err(|e| AppError::Internal(format!("session read failed: {e}")))?;
        Ok(token.and_then(|token| self.inner.sessions.get(&token)))
    }

    /// The session's context, or a fresh one registered under a new token.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written or the context
    /// cannot subscribe.
    pub async fn open_session(&self, session: &Session) -> Result<Arc<AppContext>, AppError> {
        if let Some(ctx) = self.session_context(session).await? {
            return Ok(ctx);
        }

        let ctx = Arc::new(
            AppContext::start(Arc::clone(&self.inner.store), Arc::clone(&self.inner.identity))
                .await?,
        );
        let token = uuid::Uuid::new_v4().to_string();

        session
            .cycle_id()
            .await
            .map_err(|e| AppError::Internal(format!("session cycle failed: {e}")))?;
        session
            .insert(CONTEXT_SESSION_KEY, &token)
            .await
            .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;

        self.inner.sessions.insert(token, Arc::clone(&ctx));
        info!(sessions = self.inner.sessions.len(), "Session context opened");
        Ok(ctx)
    }

    /// Bind an authenticated `identity` to the session's context.
    ///
    /// Only accepted credentials reach this point, so failed sign-ins never
    /// start or register a context.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written or the context
    /// cannot subscribe.
    pub async fn sign_in_session(
        &self,
        session: &Session,
        identity: Identity,
    ) -> Result<Arc<AppContext>, AppError> {
        let ctx = self.open_session(session).await?;
        ctx.set_identity(identity);
        Ok(ctx)
    }

    /// Sign the session out and drop its context.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be cleared.
    pub async fn close_session(&self, session: &Session) -> Result<(), AppError> {
        let token: Option<String> = session
            .remove(CONTEXT_SESSION_KEY)
            .await
            .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;

        if let Some(ctx) = token.and_then(|token| self.inner.sessions.remove(&token)) {
            ctx.sign_out();
            ctx.stop();
        }
        session
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("session flush failed: {e}")))?;
        Ok(())
    }
}
