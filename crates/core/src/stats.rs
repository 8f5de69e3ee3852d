//! Dashboard counters.

use serde::Serialize;

use crate::types::{Bank, BloodRequest, Donor, RequestStatus};

/// Admin dashboard summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_donors: usize,
    pub pending_requests: usize,
    pub fulfilled_requests: usize,
    pub total_banks: usize,
}

impl DashboardStats {
    /// Count the current snapshots.
    #[must_use]
    pub fn from_snapshots(donors: &[Donor], requests: &[BloodRequest], banks: &[Bank]) -> Self {
        let pending_requests = requests
            .iter()
            .filter(|r| r.record.status == RequestStatus::Pending)
            .count();
        Self {
            total_donors: donors.len(),
            pending_requests,
            fulfilled_requests: requests.len() - pending_requests,
            total_banks: banks.len(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::types::{BloodGroup, Record, RequestKey, RequestRecord, Urgency};

    fn request(key: &str, status: RequestStatus) -> BloodRequest {
        BloodRequest::from_payload(
            RequestKey::new(key),
            RequestRecord {
                user_id: None,
                patient_name: "Eve Davis".to_owned(),
                blood_group: BloodGroup::APositive,
                units: NonZeroU32::new(1).unwrap(),
                hospital: "City General".to_owned(),
                urgency: Urgency::Standard,
                status,
            },
        )
    }

    #[test]
    fn test_counts_by_status() {
        let requests = vec![
            request("1", RequestStatus::Pending),
            request("2", RequestStatus::Pending),
            request("3", RequestStatus::Fulfilled),
        ];
        let stats = DashboardStats::from_snapshots(&[], &requests, &[]);
        assert_eq!(stats.pending_requests, 2);
        assert_eq!(stats.fulfilled_requests, 1);
        assert_eq!(stats.total_donors, 0);
    }
}
