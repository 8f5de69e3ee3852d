//! Blood bank directory filtering.

use serde::Deserialize;

use crate::types::{Bank, BloodGroup};

/// Directory search parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryQuery {
    /// Case-insensitive substring matched against name or location.
    #[serde(default)]
    pub q: Option<String>,
    /// Only banks with units of this group on hand.
    #[serde(default)]
    pub blood_group: Option<BloodGroup>,
}

impl DirectoryQuery {
    /// Whether `bank` satisfies both filters.
    #[must_use]
    pub fn matches(&self, bank: &Bank) -> bool {
        let matches_search = self
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .is_none_or(|q| {
                let q = q.to_lowercase();
                bank.record.name.to_lowercase().contains(&q)
                    || bank.record.location.to_lowercase().contains(&q)
            });

        let matches_group = self.blood_group.is_none_or(|group| {
            bank.record
                .available
                .get(&group)
                .is_some_and(|units| *units > 0)
        });

        matches_search && matches_group
    }

    /// Banks matching the query, sorted by name.
    #[must_use]
    pub fn filter<'a>(&self, banks: impl IntoIterator<Item = &'a Bank>) -> Vec<&'a Bank> {
        let mut found: Vec<&Bank> = banks.into_iter().filter(|b| self.matches(b)).collect();
        found.sort_by(|a, b| a.record.name.cmp(&b.record.name));
        found
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::types::{BankKey, BankRecord, Record};

    fn bank(key: &str, name: &str, location: &str, stock: &[(BloodGroup, u32)]) -> Bank {
        Bank::from_payload(
            BankKey::new(key),
            BankRecord {
                name: name.to_owned(),
                location: location.to_owned(),
                contact: "555-000-0000".to_owned(),
                available: stock.iter().copied().collect::<BTreeMap<_, _>>(),
            },
        )
    }

    fn banks() -> Vec<Bank> {
        vec![
            bank("1", "City Central Blood Bank", "New York, NY", &[(BloodGroup::ONegative, 5)]),
            bank("2", "Hope Donation Center", "Los Angeles, CA", &[(BloodGroup::APositive, 5)]),
            bank("3", "Metro Blood Center", "New York, NY", &[(BloodGroup::ONegative, 0)]),
        ]
    }

    #[test]
    fn test_empty_query_matches_all() {
        let banks = banks();
        assert_eq!(DirectoryQuery::default().filter(&banks).len(), 3);
    }

    #[test]
    fn test_search_matches_name_or_location() {
        let banks = banks();
        let query = DirectoryQuery {
            q: Some("new york".to_owned()),
            blood_group: None,
        };
        let names: Vec<_> = query.filter(&banks).iter().map(|b| b.record.name.as_str()).collect();
        assert_eq!(names, vec!["City Central Blood Bank", "Metro Blood Center"]);

        let query = DirectoryQuery {
            q: Some("HOPE".to_owned()),
            blood_group: None,
        };
        assert_eq!(query.filter(&banks).len(), 1);
    }

    #[test]
    fn test_blood_group_requires_positive_stock() {
        let banks = banks();
        let query = DirectoryQuery {
            q: None,
            blood_group: Some(BloodGroup::ONegative),
        };
        let found = query.filter(&banks);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "1");
    }
}
