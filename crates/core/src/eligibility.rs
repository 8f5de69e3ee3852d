//! Donor eligibility rules.
//!
//! Two independent rules decide whether a donation submission is accepted:
//!
//! - **Age**: the donor is between [`MIN_AGE`] and [`MAX_AGE`] years old,
//!   both inclusive.
//! - **Interval**: strictly more than [`MIN_DAYS_BETWEEN_DONATIONS`] days have
//!   passed since the last donation.
//!
//! Both rules are always evaluated so a submission that breaks both reports
//! both. Rules are checked at submission time only; admin edits of a donor do
//! not re-run them.
//!
//! ```
//! use chrono::NaiveDate;
//! use lifestream_core::eligibility;
//!
//! let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
//! let last = NaiveDate::from_ymd_opt(2025, 11, 21).unwrap(); // 100 days ago
//!
//! assert!(eligibility::evaluate(30, last, today).is_eligible());
//! assert!(!eligibility::evaluate(17, last, today).is_eligible());
//! ```

use chrono::NaiveDate;
use serde::Serialize;

/// Youngest eligible age in years.
pub const MIN_AGE: u32 = 18;

/// Oldest eligible age in years.
pub const MAX_AGE: u32 = 65;

/// Days that must be exceeded between two donations.
pub const MIN_DAYS_BETWEEN_DONATIONS: i64 = 56;

/// A broken eligibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    /// Younger than [`MIN_AGE`].
    TooYoung { age: u32 },
    /// Older than [`MAX_AGE`].
    TooOld { age: u32 },
    /// Not enough days since the last donation. Negative when the last
    /// donation date lies in the future.
    TooSoon { days_since_last: i64 },
}

impl Violation {
    /// Form field the violation belongs to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::TooYoung { .. } | Self::TooOld { .. } => "age",
            Self::TooSoon { .. } => "lastDonationDate",
        }
    }

    /// Message shown next to the offending field.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::TooYoung { .. } => "You must be at least 18 years old to donate.",
            Self::TooOld { .. } => "You must be at most 65 years old to donate.",
            Self::TooSoon { .. } => "You must wait at least 56 days between donations.",
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of evaluating both rules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Eligibility {
    violations: Vec<Violation>,
}

impl Eligibility {
    /// True when no rule is broken.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.violations.is_empty()
    }

    /// Every broken rule, age first.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Human-readable reasons, one per broken rule.
    #[must_use]
    pub fn reasons(&self) -> Vec<&'static str> {
        self.violations.iter().map(Violation::message).collect()
    }
}

/// Check the age rule.
///
/// # Errors
///
/// Returns the [`Violation`] when `age` is outside `18..=65`.
pub const fn check_age(age: u32) -> Result<(), Violation> {
    if age < MIN_AGE {
        Err(Violation::TooYoung { age })
    } else if age > MAX_AGE {
        Err(Violation::TooOld { age })
    } else {
        Ok(())
    }
}

/// Check the donation-interval rule against `today`.
///
/// # Errors
///
/// Returns [`Violation::TooSoon`] unless more than 56 days separate
/// `last_donation` from `today`.
pub fn check_interval(last_donation: NaiveDate, today: NaiveDate) -> Result<(), Violation> {
    let days_since_last = (today - last_donation).num_days();
    if days_since_last > MIN_DAYS_BETWEEN_DONATIONS {
        Ok(())
    } else {
        Err(Violation::TooSoon { days_since_last })
    }
}

/// Evaluate both rules.
#[must_use]
pub fn evaluate(age: u32, last_donation: NaiveDate, today: NaiveDate) -> Eligibility {
    let violations = [check_age(age), check_interval(last_donation, today)]
        .into_iter()
        .filter_map(Result::err)
        .collect();
    Eligibility { violations }
}

/// Evaluate both rules against the local calendar date.
#[must_use]
pub fn evaluate_now(age: u32, last_donation: NaiveDate) -> Eligibility {
    evaluate(age, last_donation, chrono::Local::now().date_naive())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Days;
    use proptest::prelude::*;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn days_ago(n: u64) -> NaiveDate {
        today().checked_sub_days(Days::new(n)).unwrap()
    }

    #[test]
    fn test_age_boundaries() {
        assert!(check_age(18).is_ok());
        assert!(check_age(65).is_ok());
        assert_eq!(check_age(17), Err(Violation::TooYoung { age: 17 }));
        assert_eq!(check_age(66), Err(Violation::TooOld { age: 66 }));
    }

    #[test]
    fn test_interval_boundaries() {
        assert_eq!(
            check_interval(days_ago(56), today()),
            Err(Violation::TooSoon { days_since_last: 56 })
        );
        assert!(check_interval(days_ago(57), today()).is_ok());
    }

    #[test]
    fn test_future_last_donation_is_too_soon() {
        let tomorrow = today().succ_opt().unwrap();
        assert_eq!(
            check_interval(tomorrow, today()),
            Err(Violation::TooSoon { days_since_last: -1 })
        );
    }

    #[test]
    fn test_eligible_submission() {
        let result = evaluate(30, days_ago(100), today());
        assert!(result.is_eligible());
        assert!(result.reasons().is_empty());
    }

    #[test]
    fn test_both_rules_reported() {
        let result = evaluate(17, days_ago(10), today());
        assert!(!result.is_eligible());
        assert_eq!(result.violations().len(), 2);
        assert_eq!(result.violations()[0].field(), "age");
        assert_eq!(result.violations()[1].field(), "lastDonationDate");
        assert_eq!(
            result.reasons(),
            vec![
                "You must be at least 18 years old to donate.",
                "You must wait at least 56 days between donations.",
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_age_rule_matches_range(age in 0u32..200) {
            prop_assert_eq!(check_age(age).is_ok(), (18..=65).contains(&age));
        }

        #[test]
        fn prop_interval_rule_matches_threshold(days in 0u64..2000) {
            prop_assert_eq!(check_interval(days_ago(days), today()).is_ok(), days > 56);
        }

        #[test]
        fn prop_eligible_iff_no_violation(age in 0u32..120, days in 0u64..400) {
            let result = evaluate(age, days_ago(days), today());
            let expected = (18..=65).contains(&age) && days > 56;
            prop_assert_eq!(result.is_eligible(), expected);
        }
    }
}
