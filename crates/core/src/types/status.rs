//! Status and classification enums for portal records.

use serde::{Deserialize, Serialize};

/// Blood request status.
///
/// The admin quick action flips between the two values; the full edit form
/// may set either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RequestStatus {
    #[default]
    Pending,
    Fulfilled,
}

impl RequestStatus {
    /// The other status.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Fulfilled,
            Self::Fulfilled => Self::Pending,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Fulfilled => write!(f, "Fulfilled"),
        }
    }
}

/// How soon a blood request must be met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Urgency {
    /// Within 24 hours.
    Urgent,
    /// Within 2-3 days.
    Standard,
    #[serde(rename = "Within a Week")]
    WithinAWeek,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Urgent => write!(f, "Urgent"),
            Self::Standard => write!(f, "Standard"),
            Self::WithinAWeek => write!(f, "Within a Week"),
        }
    }
}

impl std::str::FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Urgent" => Ok(Self::Urgent),
            "Standard" => Ok(Self::Standard),
            "Within a Week" => Ok(Self::WithinAWeek),
            _ => Err(format!("invalid urgency: {s}")),
        }
    }
}

/// Account role, fixed when the profile is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Lands on the admin dashboard after sign-in.
    Admin,
    /// Lands on the personal dashboard after sign-in.
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Donor gender as collected by the donation form. Not stored on the donor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}
