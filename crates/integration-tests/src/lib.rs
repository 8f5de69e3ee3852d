//! Integration tests for LifeStream.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lifestream-integration-tests
//! ```
//!
//! Every scenario runs against the in-memory store and identity provider,
//! so no database is needed.
//!
//! # Test Categories
//!
//! - `donation_flow` - Eligibility, donor writes, notifications
//! - `request_flow` - Blood requests and admin status changes
//! - `store_snapshots` - Snapshot decoding and bootstrap seeding
//! - `accounts` - Sign-up, sign-in, role routing
//! - `http_api` - The router end to end

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDate;

use lifestream_core::forms::{DonorForm, RequestForm};
use lifestream_core::Email;
use lifestream_portal::context::AppContext;
use lifestream_portal::identity::MemoryIdentityProvider;
use lifestream_portal::notify::{MailTransport, Notifier, NotifyError, OutgoingMail};
use lifestream_portal::services::{AuthService, DonationService};
use lifestream_portal::state::AppState;
use lifestream_portal::store::MemoryStore;

/// Admin address used by every harness.
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// Transport that keeps every message it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingTransport {
    /// Messages sent so far.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mail.clone());
        Ok(())
    }
}

/// Transport that rejects every message.
#[derive(Debug, Default)]
pub struct FailingTransport;

#[async_trait]
impl MailTransport for FailingTransport {
    async fn send(&self, _mail: &OutgoingMail) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("relay unavailable".to_owned()))
    }
}

/// In-memory backends wired the way the portal binary wires them.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MemoryIdentityProvider>,
    pub mail: Arc<RecordingTransport>,
    pub notifier: Notifier,
}

impl Harness {
    /// Fresh empty store with a recording mail transport.
    pub fn new() -> Self {
        let mail = Arc::new(RecordingTransport::default());
        let notifier = Notifier::new(mail.clone(), admin_email());
        Self {
            store: Arc::new(MemoryStore::new()),
            identity: Arc::new(MemoryIdentityProvider::new()),
            mail,
            notifier,
        }
    }

    /// Same backends, but every notification fails.
    pub fn with_failing_mail() -> Self {
        let mut harness = Self::new();
        harness.notifier = Notifier::new(Arc::new(FailingTransport), admin_email());
        harness
    }

    /// Start a context on this harness's backends.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory subscriptions cannot be opened.
    pub async fn context(&self) -> AppContext {
        AppContext::start(self.store.clone(), self.identity.clone())
            .await
            .unwrap_or_else(|e| panic!("context start failed: {e}"))
    }

    /// Donation service sending through this harness's notifier.
    pub fn donations(&self) -> DonationService {
        DonationService::new(self.notifier.clone())
    }

    /// Auth service over this harness's store and identity provider.
    pub fn auth(&self) -> AuthService {
        AuthService::new(self.store.clone(), self.identity.clone(), admin_email())
    }

    /// HTTP state over this harness's backends.
    ///
    /// # Panics
    ///
    /// Panics if the shared context cannot start.
    pub async fn app_state(&self) -> AppState {
        AppState::new(self.store.clone(), self.identity.clone(), self.notifier.clone())
            .await
            .unwrap_or_else(|e| panic!("state start failed: {e}"))
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// The admin address as an [`Email`].
///
/// # Panics
///
/// Never; the constant is a valid address.
pub fn admin_email() -> Email {
    Email::parse(ADMIN_EMAIL).unwrap_or_else(|e| panic!("{e}"))
}

/// Date used as "today" by the scenarios.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap_or_default()
}

/// `today()` minus `days`.
pub fn days_ago(days: u64) -> NaiveDate {
    today()
        .checked_sub_days(chrono::Days::new(days))
        .unwrap_or_default()
}

/// An eligible donor: 30 years old, last donated 100 days ago.
pub fn alice_form() -> DonorForm {
    DonorForm {
        name: "Alice".to_owned(),
        age: 30,
        gender: "Female".to_owned(),
        blood_group: "A+".to_owned(),
        phone: "1234567890".to_owned(),
        email: "a@x.com".to_owned(),
        location: "NYC".to_owned(),
        last_donation_date: days_ago(100),
    }
}

/// Two urgent units of O- for Bob.
pub fn bob_request() -> RequestForm {
    RequestForm {
        patient_name: "Bob".to_owned(),
        blood_group: "O-".to_owned(),
        quantity: 2,
        urgency: "Urgent".to_owned(),
        hospital_name: "X General".to_owned(),
        contact_number: "1234567890".to_owned(),
        email: "b@x.com".to_owned(),
        city: "LA".to_owned(),
    }
}
