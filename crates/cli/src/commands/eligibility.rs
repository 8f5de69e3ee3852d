//! Eligibility check command.

use chrono::NaiveDate;
use lifestream_core::eligibility;
use tracing::{info, warn};

/// Evaluate both rules and log the verdict.
///
/// Returns whether the donor is eligible.
pub fn check(age: u32, last_donation: NaiveDate, on: Option<NaiveDate>) -> bool {
    let today = on.unwrap_or_else(|| chrono::Local::now().date_naive());
    let verdict = eligibility::evaluate(age, last_donation, today);

    if verdict.is_eligible() {
        info!(age, %last_donation, %today, "Eligible to donate");
    } else {
        for reason in verdict.reasons() {
            warn!(age, %last_donation, %today, "{reason}");
        }
    }
    verdict.is_eligible()
}
