//! Donor registration.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument};

use lifestream_core::eligibility::{self, Eligibility};
use lifestream_core::forms::{DonorForm, FieldErrors};
use lifestream_core::DonorKey;

use crate::context::{AppContext, PendingWrite};
use crate::notify::{AdminNewDonor, DonorConfirmation, Notifier, PendingNotification};
use crate::store::StoreError;

/// Result of a donation submission that passed field validation.
#[derive(Debug)]
pub enum DonationOutcome {
    /// At least one eligibility rule failed. Nothing was written or sent.
    Ineligible(Eligibility),
    /// The donor write and both notifications are in flight.
    Accepted(AcceptedDonation),
}

/// An eligible donation whose write and notifications were dispatched.
#[derive(Debug)]
pub struct AcceptedDonation {
    name: String,
    write: PendingWrite<DonorKey>,
    confirmation: PendingNotification,
    admin_alert: PendingNotification,
}

/// What the donor is told once everything has settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationReceipt {
    pub key: DonorKey,
    pub title: &'static str,
    pub message: String,
    /// False when the confirmation email could not be sent.
    pub email_sent: bool,
}

impl AcceptedDonation {
    /// Wait for the donor write and both notifications.
    ///
    /// A failed notification only changes the wording of the receipt.
    ///
    /// # Errors
    ///
    /// Returns the store error if the donor write failed.
    pub async fn settle(self) -> Result<DonationReceipt, StoreError> {
        let (written, confirmation, admin_alert) =
            tokio::join!(self.write, self.confirmation, self.admin_alert);
        let key = written?;

        if admin_alert.is_err() {
            info!(donor = %key, "Admin alert not delivered");
        }

        let email_sent = confirmation.is_ok();
        let message = if email_sent {
            format!("Thank you, {}. Your submission has been received.", self.name)
        } else {
            format!(
                "Thank you, {}. Your donation form has been submitted. We will contact you shortly.",
                self.name
            )
        };

        Ok(DonationReceipt {
            key,
            title: "Registration Successful!",
            message,
            email_sent,
        })
    }
}

/// Validates donation forms, applies the eligibility rules, and registers
/// eligible donors.
#[derive(Debug, Clone)]
pub struct DonationService {
    notifier: Notifier,
}

impl DonationService {
    #[must_use]
    pub const fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    /// Submit a donation form as of `today`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldErrors`] if the form is malformed. Ineligibility is not
    /// an error; it is reported as [`DonationOutcome::Ineligible`].
    #[instrument(skip(self, ctx, form), fields(blood_group = %form.blood_group))]
    pub fn submit(
        &self,
        ctx: &AppContext,
        form: &DonorForm,
        today: NaiveDate,
    ) -> Result<DonationOutcome, FieldErrors> {
        let valid = form.validate(today)?;

        let verdict = eligibility::evaluate(valid.age, valid.donor.last_donation, today);
        if !verdict.is_eligible() {
            info!(reasons = ?verdict.reasons(), "Donation rejected by eligibility rules");
            return Ok(DonationOutcome::Ineligible(verdict));
        }

        let donor = valid.donor;
        let confirmation = DonorConfirmation {
            name: donor.name.clone(),
            email: donor.email.clone(),
        };
        let admin_alert = AdminNewDonor {
            name: donor.name.clone(),
            email: donor.email.clone(),
            blood_group: donor.blood_group,
        };
        let name = donor.name.clone();

        let write = ctx.add_donor(donor);
        Ok(DonationOutcome::Accepted(AcceptedDonation {
            name,
            write,
            confirmation: self.notifier.dispatch_donor_confirmation(confirmation),
            admin_alert: self.notifier.dispatch_admin_new_donor(admin_alert),
        }))
    }
}
