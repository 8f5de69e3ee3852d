//! Demo data bootstrap.
//!
//! Seeds the donor, request, and bank collections with a small demo data set
//! the first time they are bootstrapped. See [`RecordStore::ensure_seeded`].

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use lifestream_core::{
    BankRecord, BloodGroup, Collection, DonorRecord, Email, RequestRecord, RequestStatus, Urgency,
};

use super::{RecordStore, SeedOutcome, StoreError};

fn donor(
    name: &str,
    blood_group: BloodGroup,
    last: (i32, u32, u32),
    email: &str,
    phone: &str,
) -> Option<DonorRecord> {
    Some(DonorRecord {
        user_id: None,
        name: name.to_owned(),
        blood_group,
        last_donation: NaiveDate::from_ymd_opt(last.0, last.1, last.2)?,
        email: Email::parse(email).ok()?,
        phone: phone.to_owned(),
    })
}

fn request(
    patient_name: &str,
    blood_group: BloodGroup,
    units: u32,
    hospital: &str,
    status: RequestStatus,
    urgency: Urgency,
) -> Option<RequestRecord> {
    Some(RequestRecord {
        user_id: None,
        patient_name: patient_name.to_owned(),
        blood_group,
        units: NonZeroU32::new(units)?,
        hospital: hospital.to_owned(),
        urgency,
        status,
    })
}

fn bank(name: &str, location: &str, contact: &str, stock: &[(BloodGroup, u32)]) -> BankRecord {
    BankRecord {
        name: name.to_owned(),
        location: location.to_owned(),
        contact: contact.to_owned(),
        available: stock.iter().copied().collect::<BTreeMap<_, _>>(),
    }
}

/// Demo donors.
#[must_use]
pub fn demo_donors() -> Vec<DonorRecord> {
    use BloodGroup::{APositive, AbPositive, BPositive, ONegative};
    [
        donor("Alice Johnson", APositive, (2024, 5, 10), "alice@example.com", "111-222-3333"),
        donor("Bob Williams", ONegative, (2024, 4, 22), "bob@example.com", "222-333-4444"),
        donor("Charlie Brown", BPositive, (2024, 6, 1), "charlie@example.com", "333-444-5555"),
        donor("Diana Miller", AbPositive, (2023, 12, 15), "diana@example.com", "444-555-6666"),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Demo blood requests.
#[must_use]
pub fn demo_requests() -> Vec<RequestRecord> {
    use BloodGroup::{APositive, BPositive, ONegative};
    use RequestStatus::{Fulfilled, Pending};
    [
        request("Eve Davis", APositive, 2, "City General", Pending, Urgency::Urgent),
        request("Frank White", ONegative, 1, "St. Mary's", Pending, Urgency::Standard),
        request("Grace Lee", BPositive, 3, "County Hospital", Fulfilled, Urgency::Urgent),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Demo blood banks with stock levels.
#[must_use]
pub fn demo_banks() -> Vec<BankRecord> {
    use BloodGroup::{
        ANegative, APositive, AbNegative, AbPositive, BNegative, BPositive, ONegative, OPositive,
    };
    vec![
        bank(
            "City Central Blood Bank",
            "New York, NY",
            "123-456-7890",
            &[(APositive, 10), (ONegative, 5), (BPositive, 8)],
        ),
        bank(
            "Hope Donation Center",
            "Los Angeles, CA",
            "987-654-3210",
            &[(APositive, 5), (AbPositive, 2), (OPositive, 12)],
        ),
        bank(
            "Downtown Blood Services",
            "Chicago, IL",
            "555-123-4567",
            &[(BNegative, 3), (ONegative, 6)],
        ),
        bank(
            "Community Blood Drive Hub",
            "Houston, TX",
            "555-987-6543",
            &[(ANegative, 7), (OPositive, 20)],
        ),
        bank(
            "Sunrise Health Blood Bank",
            "Phoenix, AZ",
            "555-456-1234",
            &[(APositive, 15), (BPositive, 10), (AbNegative, 1)],
        ),
        bank(
            "Metro Blood Center",
            "New York, NY",
            "123-555-7890",
            &[(ONegative, 8), (ANegative, 4)],
        ),
    ]
}

fn to_values<T: Serialize>(records: &[T]) -> Result<Vec<Value>, StoreError> {
    records
        .iter()
        .map(|r| serde_json::to_value(r).map_err(StoreError::from))
        .collect()
}

/// Bootstrap the demo data set into every entity collection.
///
/// # Errors
///
/// Returns the first store error; collections already processed stay seeded.
pub async fn seed_demo_data(
    store: &dyn RecordStore,
) -> Result<Vec<(Collection, SeedOutcome)>, StoreError> {
    let plan = [
        (Collection::Donors, to_values(&demo_donors())?),
        (Collection::Requests, to_values(&demo_requests())?),
        (Collection::Banks, to_values(&demo_banks())?),
    ];

    let mut outcomes = Vec::with_capacity(plan.len());
    for (collection, seeds) in plan {
        let outcome = store.ensure_seeded(collection, seeds).await?;
        info!(collection = %collection, outcome = ?outcome, "Bootstrap seeding");
        outcomes.push((collection, outcome));
    }
    Ok(outcomes)
}
