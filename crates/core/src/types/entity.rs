//! Entity records for the portal's collections.
//!
//! Every collection stores flat camelCase JSON records under a string key.
//! Each entity comes in two shapes:
//!
//! - the stored payload (`DonorRecord`, `RequestRecord`, ...) which is exactly
//!   what lives under `collection/{key}`
//! - the keyed entity (`Donor`, `BloodRequest`, ...) handed to readers
//!
//! The [`Record`] trait ties the two together so the store adapter can decode
//! raw snapshots into typed entities generically.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::blood::BloodGroup;
use super::email::Email;
use super::key::{BankKey, DonorKey, RequestKey, UserId};
use super::status::{RequestStatus, Role, Urgency};

/// The named collections in the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Donors,
    Requests,
    Banks,
    Users,
}

impl Collection {
    /// Every collection, in a fixed order.
    pub const ALL: [Self; 4] = [Self::Donors, Self::Requests, Self::Banks, Self::Users];

    /// Store path segment for this collection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Donors => "donors",
            Self::Requests => "requests",
            Self::Banks => "banks",
            Self::Users => "users",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown collection: {s}"))
    }
}

/// A keyed entity stored as a flat payload in one collection.
pub trait Record: Clone + Send + Sync + 'static {
    /// Collection the entity lives in.
    const COLLECTION: Collection;

    /// Typed key for this entity.
    type Key: Clone + From<String> + AsRef<str> + Send + Sync + 'static;

    /// Stored payload shape.
    type Payload: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Combine a key and a stored payload into the entity.
    fn from_payload(key: Self::Key, payload: Self::Payload) -> Self;
}

// =============================================================================
// Donor
// =============================================================================

/// Stored donor payload (`donors/{key}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorRecord {
    /// Account that submitted the donation form, if signed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub name: String,
    pub blood_group: BloodGroup,
    /// Date of the most recent donation (stored as `YYYY-MM-DD`).
    pub last_donation: NaiveDate,
    pub email: Email,
    pub phone: String,
}

/// A registered donor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Donor {
    pub id: DonorKey,
    #[serde(flatten)]
    pub record: DonorRecord,
}

impl Record for Donor {
    const COLLECTION: Collection = Collection::Donors;
    type Key = DonorKey;
    type Payload = DonorRecord;

    fn from_payload(key: DonorKey, payload: DonorRecord) -> Self {
        Self {
            id: key,
            record: payload,
        }
    }
}

/// Partial donor edit. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<BloodGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_donation: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// Blood request
// =============================================================================

/// A blood request as submitted. The status is not part of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBloodRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub patient_name: String,
    pub blood_group: BloodGroup,
    pub units: NonZeroU32,
    pub hospital: String,
    pub urgency: Urgency,
}

/// Stored request payload (`requests/{key}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub patient_name: String,
    pub blood_group: BloodGroup,
    pub units: NonZeroU32,
    pub hospital: String,
    pub urgency: Urgency,
    pub status: RequestStatus,
}

impl NewBloodRequest {
    /// The stored form of a fresh submission. Always `Pending`.
    #[must_use]
    pub fn into_pending(self) -> RequestRecord {
        RequestRecord {
            user_id: self.user_id,
            patient_name: self.patient_name,
            blood_group: self.blood_group,
            units: self.units,
            hospital: self.hospital,
            urgency: self.urgency,
            status: RequestStatus::Pending,
        }
    }
}

/// A blood request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodRequest {
    pub id: RequestKey,
    #[serde(flatten)]
    pub record: RequestRecord,
}

impl Record for BloodRequest {
    const COLLECTION: Collection = Collection::Requests;
    type Key = RequestKey;
    type Payload = RequestRecord;

    fn from_payload(key: RequestKey, payload: RequestRecord) -> Self {
        Self {
            id: key,
            record: payload,
        }
    }
}

/// Partial request edit, as sent by the admin edit dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<BloodGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<NonZeroU32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
}

// =============================================================================
// Blood bank
// =============================================================================

/// Stored bank payload (`banks/{key}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankRecord {
    pub name: String,
    pub location: String,
    pub contact: String,
    /// Units on hand per blood group. Empty when the bank has not reported.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub available: BTreeMap<BloodGroup, u32>,
}

/// A blood bank in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bank {
    pub id: BankKey,
    #[serde(flatten)]
    pub record: BankRecord,
}

impl Record for Bank {
    const COLLECTION: Collection = Collection::Banks;
    type Key = BankKey;
    type Payload = BankRecord;

    fn from_payload(key: BankKey, payload: BankRecord) -> Self {
        Self {
            id: key,
            record: payload,
        }
    }
}

/// Partial bank edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<BTreeMap<BloodGroup, u32>>,
}

// =============================================================================
// User profile
// =============================================================================

/// Stored profile payload (`users/{uid}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub email: Email,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Profile of an authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    #[serde(flatten)]
    pub record: ProfileRecord,
}

impl UserProfile {
    /// Whether this profile routes to the admin dashboard.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.record.role == Role::Admin
    }
}

impl Record for UserProfile {
    const COLLECTION: Collection = Collection::Users;
    type Key = UserId;
    type Payload = ProfileRecord;

    fn from_payload(key: UserId, payload: ProfileRecord) -> Self {
        Self {
            id: key,
            record: payload,
        }
    }
}
