//! Application state context.
//!
//! One [`AppContext`] per session. It owns one subscription per collection
//! plus one to the session identity, folds every snapshot into local `watch`
//! state, and is the single read/mutate surface the services use.
//!
//! Mutations are fire-and-forget: each returns a [`PendingWrite`] right after
//! the write is dispatched. Awaiting it yields the store acknowledgement;
//! dropping it lets the write finish unobserved. Local state only changes
//! when the store publishes the next snapshot.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{Instrument, debug, info_span, warn};

use lifestream_core::stats::DashboardStats;
use lifestream_core::{
    Bank, BankKey, BankPatch, BankRecord, BloodRequest, Donor, DonorKey, DonorPatch, DonorRecord,
    NewBloodRequest, Record, RequestKey, RequestPatch, RequestStatus, UserProfile,
};

use crate::identity::{AuthError, Identity, IdentityProvider, SessionIdentity};
use crate::store::{RecordStore, Records, StoreError, TypedSubscription};

/// Acknowledgement of a dispatched write.
///
/// The write runs on its own task whether or not this is awaited.
#[derive(Debug)]
pub struct PendingWrite<T> {
    handle: JoinHandle<Result<T, StoreError>>,
}

impl<T> Future for PendingWrite<T> {
    type Output = Result<T, StoreError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|joined| joined.unwrap_or_else(|e| Err(StoreError::Dispatch(e.to_string()))))
    }
}

/// Shared immutable view of one collection.
pub type Snapshot<T> = Arc<Vec<T>>;

struct LocalState {
    donors: watch::Sender<Snapshot<Donor>>,
    requests: watch::Sender<Snapshot<BloodRequest>>,
    banks: watch::Sender<Snapshot<Bank>>,
    profile: watch::Sender<Option<UserProfile>>,
}

/// Live collections plus the session's identity.
pub struct AppContext {
    identity: Arc<dyn IdentityProvider>,
    session: SessionIdentity,
    donors: Records<Donor>,
    requests: Records<BloodRequest>,
    banks: Records<Bank>,
    state: Arc<LocalState>,
    tasks: Vec<AbortHandle>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("current_user", &self.session.current())
            .field("donors", &self.state.donors.borrow().len())
            .field("requests", &self.state.requests.borrow().len())
            .field("banks", &self.state.banks.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Open a subscription and take its first snapshot.
async fn open<T: Record>(
    records: &Records<T>,
) -> Result<(TypedSubscription<T>, watch::Sender<Snapshot<T>>), StoreError> {
    let mut sub = records.subscribe().await?;
    let initial = sub.next().await.unwrap_or_default();
    let (tx, _rx) = watch::channel(Arc::new(initial));
    Ok((sub, tx))
}

async fn follow<T: Record>(
    mut sub: TypedSubscription<T>,
    state: Arc<LocalState>,
    pick: fn(&LocalState) -> &watch::Sender<Snapshot<T>>,
) {
    while let Some(snapshot) = sub.next().await {
        pick(&state).send_replace(Arc::new(snapshot));
    }
    debug!(collection = %T::COLLECTION, "Subscription ended");
}

async fn follow_identity(
    mut rx: watch::Receiver<Option<Identity>>,
    users: Records<UserProfile>,
    state: Arc<LocalState>,
) {
    loop {
        let identity = rx.borrow_and_update().clone();
        let profile = match identity {
            None => None,
            Some(identity) => users.get(&identity.uid).await.unwrap_or_else(|e| {
                warn!(uid = %identity.uid, error = %e, "Failed to load user profile");
                None
            }),
        };
        state.profile.send_replace(profile);

        if rx.changed().await.is_err() {
            break;
        }
    }
}

impl AppContext {
    /// Subscribe to every collection and to a fresh signed-out session.
    ///
    /// # Errors
    ///
    /// Returns an error if any subscription cannot be opened.
    pub async fn start(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, StoreError> {
        let donors = Records::<Donor>::new(Arc::clone(&store));
        let requests = Records::<BloodRequest>::new(Arc::clone(&store));
        let banks = Records::<Bank>::new(Arc::clone(&store));
        let users = Records::<UserProfile>::new(store);

        let (donor_sub, donor_tx) = open(&donors).await?;
        let (request_sub, request_tx) = open(&requests).await?;
        let (bank_sub, bank_tx) = open(&banks).await?;
        let (profile_tx, _rx) = watch::channel(None);

        let state = Arc::new(LocalState {
            donors: donor_tx,
            requests: request_tx,
            banks: bank_tx,
            profile: profile_tx,
        });
        let session = SessionIdentity::new();

        let tasks = vec![
            tokio::spawn(follow(donor_sub, Arc::clone(&state), |s| &s.donors)).abort_handle(),
            tokio::spawn(follow(request_sub, Arc::clone(&state), |s| &s.requests)).abort_handle(),
            tokio::spawn(follow(bank_sub, Arc::clone(&state), |s| &s.banks)).abort_handle(),
            tokio::spawn(follow_identity(session.subscribe(), users, Arc::clone(&state)))
                .abort_handle(),
        ];

        Ok(Self {
            identity,
            session,
            donors,
            requests,
            banks,
            state,
            tasks,
        })
    }

    /// Cancel every subscription. Dispatched writes still complete.
    pub fn stop(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// Current donor snapshot.
    #[must_use]
    pub fn donors(&self) -> Snapshot<Donor> {
        self.state.donors.borrow().clone()
    }

    /// Current request snapshot.
    #[must_use]
    pub fn requests(&self) -> Snapshot<BloodRequest> {
        self.state.requests.borrow().clone()
    }

    /// Current bank snapshot.
    #[must_use]
    pub fn banks(&self) -> Snapshot<Bank> {
        self.state.banks.borrow().clone()
    }

    /// Identity signed in on this session.
    #[must_use]
    pub fn current_user(&self) -> Option<Identity> {
        self.session.current()
    }

    /// Profile of the signed-in identity, once loaded.
    #[must_use]
    pub fn user_profile(&self) -> Option<UserProfile> {
        self.state.profile.borrow().clone()
    }

    #[must_use]
    pub fn watch_donors(&self) -> watch::Receiver<Snapshot<Donor>> {
        self.state.donors.subscribe()
    }

    #[must_use]
    pub fn watch_requests(&self) -> watch::Receiver<Snapshot<BloodRequest>> {
        self.state.requests.subscribe()
    }

    #[must_use]
    pub fn watch_banks(&self) -> watch::Receiver<Snapshot<Bank>> {
        self.state.banks.subscribe()
    }

    #[must_use]
    pub fn watch_profile(&self) -> watch::Receiver<Option<UserProfile>> {
        self.state.profile.subscribe()
    }

    /// Wait until the donor snapshot satisfies `ready`.
    pub async fn wait_for_donors(
        &self,
        ready: impl FnMut(&Snapshot<Donor>) -> bool,
    ) -> Snapshot<Donor> {
        wait_for(self.watch_donors(), ready)
            .await
            .unwrap_or_else(|| self.donors())
    }

    /// Wait until the request snapshot satisfies `ready`.
    pub async fn wait_for_requests(
        &self,
        ready: impl FnMut(&Snapshot<BloodRequest>) -> bool,
    ) -> Snapshot<BloodRequest> {
        wait_for(self.watch_requests(), ready)
            .await
            .unwrap_or_else(|| self.requests())
    }

    /// Wait until the bank snapshot satisfies `ready`.
    pub async fn wait_for_banks(
        &self,
        ready: impl FnMut(&Snapshot<Bank>) -> bool,
    ) -> Snapshot<Bank> {
        wait_for(self.watch_banks(), ready)
            .await
            .unwrap_or_else(|| self.banks())
    }

    /// Wait until the profile matches `ready`.
    pub async fn wait_for_profile(
        &self,
        ready: impl FnMut(&Option<UserProfile>) -> bool,
    ) -> Option<UserProfile> {
        wait_for(self.watch_profile(), ready)
            .await
            .unwrap_or_else(|| self.user_profile())
    }

    /// Donations submitted by the signed-in user.
    #[must_use]
    pub fn my_donations(&self) -> Vec<Donor> {
        let Some(me) = self.current_user() else {
            return Vec::new();
        };
        self.donors()
            .iter()
            .filter(|d| d.record.user_id.as_ref() == Some(&me.uid))
            .cloned()
            .collect()
    }

    /// Requests submitted by the signed-in user.
    #[must_use]
    pub fn my_requests(&self) -> Vec<BloodRequest> {
        let Some(me) = self.current_user() else {
            return Vec::new();
        };
        self.requests()
            .iter()
            .filter(|r| r.record.user_id.as_ref() == Some(&me.uid))
            .cloned()
            .collect()
    }

    /// Admin dashboard counters over the current snapshots.
    #[must_use]
    pub fn stats(&self) -> DashboardStats {
        DashboardStats::from_snapshots(&self.donors(), &self.requests(), &self.banks())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    fn dispatch<T, F>(&self, op: &'static str, write: F) -> PendingWrite<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, StoreError>> + Send + 'static,
    {
        let span = info_span!("write", op);
        let handle = tokio::spawn(
            async move {
                let result = write.await;
                if let Err(e) = &result {
                    warn!(error = %e, "Write failed");
                }
                result
            }
            .instrument(span),
        );
        PendingWrite { handle }
    }

    fn owner(&self) -> Option<lifestream_core::UserId> {
        self.current_user().map(|identity| identity.uid)
    }

    /// Register a donor owned by the signed-in user.
    pub fn add_donor(&self, mut donor: DonorRecord) -> PendingWrite<DonorKey> {
        donor.user_id = self.owner();
        let donors = self.donors.clone();
        self.dispatch("add_donor", async move { donors.create(&donor).await })
    }

    /// Apply an admin edit to a donor.
    pub fn update_donor(&self, key: DonorKey, patch: DonorPatch) -> PendingWrite<()> {
        let donors = self.donors.clone();
        self.dispatch("update_donor", async move { donors.update(&key, &patch).await })
    }

    pub fn delete_donor(&self, key: DonorKey) -> PendingWrite<()> {
        let donors = self.donors.clone();
        self.dispatch("delete_donor", async move { donors.delete(&key).await })
    }

    /// Submit a request owned by the signed-in user. Status is always `Pending`.
    pub fn add_request(&self, mut request: NewBloodRequest) -> PendingWrite<RequestKey> {
        request.user_id = self.owner();
        let record = request.into_pending();
        let requests = self.requests.clone();
        self.dispatch("add_request", async move { requests.create(&record).await })
    }

    pub fn update_request(&self, key: RequestKey, patch: RequestPatch) -> PendingWrite<()> {
        let requests = self.requests.clone();
        self.dispatch("update_request", async move { requests.update(&key, &patch).await })
    }

    /// Write only the status field.
    pub fn update_request_status(
        &self,
        key: RequestKey,
        status: RequestStatus,
    ) -> PendingWrite<()> {
        self.update_request(
            key,
            RequestPatch {
                status: Some(status),
                ..RequestPatch::default()
            },
        )
    }

    /// Flip `Pending` and `Fulfilled`. Resolves to the new status.
    pub fn toggle_request_status(&self, key: RequestKey) -> PendingWrite<RequestStatus> {
        let requests = self.requests.clone();
        self.dispatch("toggle_request_status", async move {
            let current = requests
                .get(&key)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    collection: BloodRequest::COLLECTION,
                    key: key.to_string(),
                })?;
            let status = current.record.status.toggled();
            let patch = RequestPatch {
                status: Some(status),
                ..RequestPatch::default()
            };
            requests.update(&key, &patch).await?;
            Ok(status)
        })
    }

    pub fn delete_request(&self, key: RequestKey) -> PendingWrite<()> {
        let requests = self.requests.clone();
        self.dispatch("delete_request", async move { requests.delete(&key).await })
    }

    pub fn add_bank(&self, bank: BankRecord) -> PendingWrite<BankKey> {
        let banks = self.banks.clone();
        self.dispatch("add_bank", async move { banks.create(&bank).await })
    }

    pub fn update_bank(&self, key: BankKey, patch: BankPatch) -> PendingWrite<()> {
        let banks = self.banks.clone();
        self.dispatch("update_bank", async move { banks.update(&key, &patch).await })
    }

    pub fn delete_bank(&self, key: BankKey) -> PendingWrite<()> {
        let banks = self.banks.clone();
        self.dispatch("delete_bank", async move { banks.delete(&key).await })
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Check credentials and sign this session in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on a bad email or password.
    pub async fn sign_in(
        &self,
        email: &lifestream_core::Email,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let identity = self.identity.sign_in(email, password).await?;
        self.session.set(Some(identity.clone()));
        Ok(identity)
    }

    /// Sign this session out.
    pub fn sign_out(&self) {
        self.session.set(None);
    }

    /// Mark `identity` as signed in on this session.
    pub(crate) fn set_identity(&self, identity: Identity) {
        self.session.set(Some(identity));
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn wait_for<T: Clone>(
    mut rx: watch::Receiver<T>,
    mut ready: impl FnMut(&T) -> bool,
) -> Option<T> {
    rx.wait_for(|value| ready(value))
        .await
        .ok()
        .map(|value| (*value).clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroU32;

    use chrono::NaiveDate;

    use lifestream_core::{BloodGroup, Email, Urgency};

    use super::*;
    use crate::identity::MemoryIdentityProvider;
    use crate::store::MemoryStore;

    async fn context() -> (Arc<MemoryStore>, AppContext) {
        let store = Arc::new(MemoryStore::new());
        let ctx = AppContext::start(store.clone(), Arc::new(MemoryIdentityProvider::new()))
            .await
            .unwrap();
        (store, ctx)
    }

    fn request() -> NewBloodRequest {
        NewBloodRequest {
            user_id: None,
            patient_name: "Bob".into(),
            blood_group: BloodGroup::ONegative,
            units: NonZeroU32::new(2).unwrap(),
            hospital: "X General".into(),
            urgency: Urgency::Urgent,
        }
    }

    #[tokio::test]
    async fn test_add_donor_appears_in_snapshot() {
        let (_store, ctx) = context().await;
        assert!(ctx.donors().is_empty());

        let key = ctx
            .add_donor(DonorRecord {
                user_id: None,
                name: "Alice".into(),
                blood_group: BloodGroup::APositive,
                last_donation: NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
                email: Email::parse("a@x.com").unwrap(),
                phone: "1234567890".into(),
            })
            .await
            .unwrap();

        let donors = ctx.wait_for_donors(|d| d.len() == 1).await;
        assert_eq!(donors[0].id, key);
        assert!(donors[0].record.user_id.is_none());
    }

    #[tokio::test]
    async fn test_add_request_is_pending() {
        let (_store, ctx) = context().await;
        let key = ctx.add_request(request()).await.unwrap();

        let requests = ctx.wait_for_requests(|r| !r.is_empty()).await;
        assert_eq!(requests[0].id, key);
        assert_eq!(requests[0].record.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let (_store, ctx) = context().await;
        let key = ctx.add_request(request()).await.unwrap();

        let first = ctx.toggle_request_status(key.clone()).await.unwrap();
        assert_eq!(first, RequestStatus::Fulfilled);
        let second = ctx.toggle_request_status(key.clone()).await.unwrap();
        assert_eq!(second, RequestStatus::Pending);

        let requests = ctx
            .wait_for_requests(|r| {
                r.first()
                    .is_some_and(|r| r.record.status == RequestStatus::Pending)
            })
            .await;
        assert_eq!(requests[0].record.patient_name, "Bob");
        assert_eq!(requests[0].record.units.get(), 2);
    }

    #[tokio::test]
    async fn test_toggle_missing_request_fails() {
        let (_store, ctx) = context().await;
        let err = ctx
            .toggle_request_status(RequestKey::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_dropped_write_still_lands() {
        let (store, ctx) = context().await;
        drop(ctx.add_request(request()));

        let requests = ctx.wait_for_requests(|r| r.len() == 1).await;
        assert_eq!(requests.len(), 1);
        assert_eq!(store.len(lifestream_core::Collection::Requests), 1);
    }

    #[tokio::test]
    async fn test_signed_in_owner_is_stamped() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(MemoryIdentityProvider::new());
        let ctx = AppContext::start(store, provider.clone()).await.unwrap();
        let email = Email::parse("sam@example.com").unwrap();
        let identity = provider.sign_up(&email, "password123").await.unwrap();
        ctx.sign_in(&email, "password123").await.unwrap();

        ctx.add_request(request()).await.unwrap();
        ctx.wait_for_requests(|r| r.len() == 1).await;

        let mine = ctx.my_requests();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].record.user_id.as_ref(), Some(&identity.uid));

        ctx.sign_out();
        assert!(ctx.my_requests().is_empty());
    }

    #[tokio::test]
    async fn test_stop_freezes_local_state() {
        let (_store, ctx) = context().await;
        ctx.stop();
        tokio::task::yield_now().await;

        ctx.add_bank(BankRecord {
            name: "Hope".into(),
            location: "LA".into(),
            contact: "555".into(),
            available: std::collections::BTreeMap::new(),
        })
        .await
        .unwrap();

        tokio::task::yield_now().await;
        assert!(ctx.banks().is_empty());
    }
}
