//! Form validation for the portal's submission surfaces.
//!
//! Each form validates locally and either yields a typed payload ready for
//! the application context or a [`FieldErrors`] list with one message per
//! offending field. Validation never touches the store.
//!
//! The donor age range and donation interval are *not* checked here; they
//! belong to [`crate::eligibility`] so that an ineligible but well-formed
//! submission gets an eligibility verdict rather than a field error.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{
    BankRecord, BloodGroup, DonorRecord, Email, Gender, NewBloodRequest, Urgency,
};

/// Minimum password length for sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Form field name as the client sends it.
    pub field: &'static str,
    /// Message shown next to the field.
    pub message: String,
}

/// Every field error found in one submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, thiserror::Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    /// Record an error for `field`.
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// All errors, in field order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// True when at least one error is recorded for `field`.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(value)` when no errors were recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when any field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

// =============================================================================
// Donor registration
// =============================================================================

/// Donation form as submitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorForm {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub blood_group: String,
    pub phone: String,
    pub email: String,
    pub location: String,
    pub last_donation_date: NaiveDate,
}

/// A well-formed donation submission, not yet checked for eligibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDonorForm {
    /// Donor record to store (owner is stamped by the context).
    pub donor: DonorRecord,
    pub age: u32,
    pub gender: Gender,
    pub location: String,
}

impl DonorForm {
    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns [`FieldErrors`] listing each invalid field.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidDonorForm, FieldErrors> {
        let mut errors = FieldErrors::default();

        let name = self.name.trim();
        if name.chars().count() < 2 {
            errors.push("name", "Name must be at least 2 characters.");
        }

        let gender = match self.gender.trim() {
            "Male" => Some(Gender::Male),
            "Female" => Some(Gender::Female),
            "Other" => Some(Gender::Other),
            _ => {
                errors.push("gender", "Please select your gender.");
                None
            }
        };

        let blood_group = parse_blood_group(&self.blood_group, &mut errors);
        check_phone(&self.phone, "phone", &mut errors);
        let email = parse_email(&self.email, "email", &mut errors);

        let location = self.location.trim();
        if location.chars().count() < 3 {
            errors.push("location", "Location must be at least 3 characters.");
        }

        if self.last_donation_date > today {
            errors.push(
                "lastDonationDate",
                "Last donation date cannot be in the future.",
            );
        }

        match (gender, blood_group, email) {
            (Some(gender), Some(blood_group), Some(email)) if errors.is_empty() => {
                Ok(ValidDonorForm {
                    donor: DonorRecord {
                        user_id: None,
                        name: name.to_owned(),
                        blood_group,
                        last_donation: self.last_donation_date,
                        email,
                        phone: self.phone.trim().to_owned(),
                    },
                    age: self.age,
                    gender,
                    location: location.to_owned(),
                })
            }
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Blood request
// =============================================================================

/// Blood request form as submitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestForm {
    /// Patient's full name.
    pub patient_name: String,
    pub blood_group: String,
    pub quantity: u32,
    pub urgency: String,
    pub hospital_name: String,
    pub contact_number: String,
    pub email: String,
    pub city: String,
}

impl RequestForm {
    /// Validate every field and produce the submission. Contact details are
    /// checked but not stored on the request.
    ///
    /// # Errors
    ///
    /// Returns [`FieldErrors`] listing each invalid field.
    pub fn validate(&self) -> Result<NewBloodRequest, FieldErrors> {
        let mut errors = FieldErrors::default();

        let patient_name = self.patient_name.trim();
        if patient_name.chars().count() < 2 {
            errors.push("patientName", "Name must be at least 2 characters.");
        }

        let blood_group = parse_blood_group(&self.blood_group, &mut errors);

        let units = NonZeroU32::new(self.quantity);
        if units.is_none() {
            errors.push("quantity", "Quantity must be at least 1 unit.");
        }

        let urgency = self.urgency.trim().parse::<Urgency>().ok();
        if urgency.is_none() {
            errors.push("urgency", "Please select an urgency level.");
        }

        let hospital = self.hospital_name.trim();
        if hospital.chars().count() < 3 {
            errors.push("hospitalName", "Hospital name is required.");
        }

        check_phone(&self.contact_number, "contactNumber", &mut errors);
        parse_email(&self.email, "email", &mut errors);

        if self.city.trim().chars().count() < 2 {
            errors.push("city", "City is required.");
        }

        match (blood_group, units, urgency) {
            (Some(blood_group), Some(units), Some(urgency)) if errors.is_empty() => {
                Ok(NewBloodRequest {
                    user_id: None,
                    patient_name: patient_name.to_owned(),
                    blood_group,
                    units,
                    hospital: hospital.to_owned(),
                    urgency,
                })
            }
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Blood bank (admin)
// =============================================================================

/// Admin form for adding a bank.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankForm {
    pub name: String,
    pub location: String,
    pub contact: String,
    #[serde(default)]
    pub available: BTreeMap<BloodGroup, u32>,
}

impl BankForm {
    /// All three text fields are required.
    ///
    /// # Errors
    ///
    /// Returns [`FieldErrors`] for each empty field.
    pub fn validate(&self) -> Result<BankRecord, FieldErrors> {
        let mut errors = FieldErrors::default();
        for (field, value) in [
            ("name", &self.name),
            ("location", &self.location),
            ("contact", &self.contact),
        ] {
            if value.trim().is_empty() {
                errors.push(field, "Please fill out all fields to add a new bank.");
            }
        }

        errors.into_result(BankRecord {
            name: self.name.trim().to_owned(),
            location: self.location.trim().to_owned(),
            contact: self.contact.trim().to_owned(),
            available: self.available.clone(),
        })
    }
}

// =============================================================================
// Accounts
// =============================================================================

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Validated sign-up credentials.
#[derive(Debug, Clone)]
pub struct ValidSignUp {
    pub email: Email,
    pub password: String,
}

impl SignUpForm {
    /// Check the email, the password length, and that both passwords match.
    ///
    /// # Errors
    ///
    /// Returns [`FieldErrors`] listing each invalid field.
    pub fn validate(&self) -> Result<ValidSignUp, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = parse_email(&self.email, "email", &mut errors);

        if self.password.len() < MIN_PASSWORD_LENGTH {
            errors.push(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters."),
            );
        }
        if self.password != self.confirm_password {
            errors.push("confirmPassword", "Passwords do not match");
        }

        match email {
            Some(email) if errors.is_empty() => Ok(ValidSignUp {
                email,
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Sign-in form.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_blood_group(value: &str, errors: &mut FieldErrors) -> Option<BloodGroup> {
    let parsed = value.parse::<BloodGroup>().ok();
    if parsed.is_none() {
        errors.push("bloodGroup", "Please select a blood group.");
    }
    parsed
}

fn parse_email(value: &str, field: &'static str, errors: &mut FieldErrors) -> Option<Email> {
    match Email::parse(value) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.push(field, "Please enter a valid email address.");
            None
        }
    }
}

/// Ten ASCII digits, nothing else.
fn check_phone(value: &str, field: &'static str, errors: &mut FieldErrors) {
    let value = value.trim();
    if value.len() != 10 || !value.bytes().all(|b| b.is_ascii_digit()) {
        errors.push(field, "Please enter a valid 10-digit phone number.");
    }
}
