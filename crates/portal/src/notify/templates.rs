//! Message templates.
//!
//! Each message renders to a subject plus HTML and plain-text bodies. The
//! content is fixed; only the named fields vary.

use askama::Template;

use lifestream_core::{BloodGroup, Email};

use super::{NotifyError, OutgoingMail};

pub const DONOR_CONFIRMATION_SUBJECT: &str = "Thank you for registering as a blood donor!";
pub const ADMIN_NEW_DONOR_SUBJECT: &str = "New Donor Registration on LifeStream Portal";

#[derive(Template)]
#[template(path = "email/donor_confirmation.html")]
struct DonorConfirmationHtml<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/donor_confirmation.txt")]
struct DonorConfirmationText<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/admin_new_donor.html")]
struct AdminNewDonorHtml<'a> {
    name: &'a str,
    email: &'a str,
    blood_group: &'a str,
}

#[derive(Template)]
#[template(path = "email/admin_new_donor.txt")]
struct AdminNewDonorText<'a> {
    name: &'a str,
    email: &'a str,
    blood_group: &'a str,
}

/// Thank-you message to a newly registered donor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonorConfirmation {
    pub name: String,
    pub email: Email,
}

impl DonorConfirmation {
    /// Render the message, addressed to the donor.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if rendering fails.
    pub fn render(&self) -> Result<OutgoingMail, NotifyError> {
        let name = self.name.as_str();
        Ok(OutgoingMail {
            to: self.email.clone(),
            subject: DONOR_CONFIRMATION_SUBJECT.to_owned(),
            html: DonorConfirmationHtml { name }.render()?,
            text: DonorConfirmationText { name }.render()?,
        })
    }
}

/// New-donor alert for the site administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminNewDonor {
    pub name: String,
    pub email: Email,
    pub blood_group: BloodGroup,
}

impl AdminNewDonor {
    /// Render the message, addressed to `admin`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if rendering fails.
    pub fn render(&self, admin: &Email) -> Result<OutgoingMail, NotifyError> {
        let name = self.name.as_str();
        let email = self.email.as_str();
        let blood_group = self.blood_group.as_str();
        Ok(OutgoingMail {
            to: admin.clone(),
            subject: ADMIN_NEW_DONOR_SUBJECT.to_owned(),
            html: AdminNewDonorHtml {
                name,
                email,
                blood_group,
            }
            .render()?,
            text: AdminNewDonorText {
                name,
                email,
                blood_group,
            }
            .render()?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_donor_confirmation_renders_name() {
        let mail = DonorConfirmation {
            name: "Alice".into(),
            email: Email::parse("a@x.com").unwrap(),
        }
        .render()
        .unwrap();

        assert_eq!(mail.to.as_str(), "a@x.com");
        assert_eq!(mail.subject, DONOR_CONFIRMATION_SUBJECT);
        assert!(mail.html.contains("Dear Alice,"));
        assert!(mail.text.starts_with("Dear Alice,"));
    }

    #[test]
    fn test_admin_alert_lists_details() {
        let admin = Email::parse("admin@example.com").unwrap();
        let mail = AdminNewDonor {
            name: "Alice".into(),
            email: Email::parse("a@x.com").unwrap(),
            blood_group: BloodGroup::AbNegative,
        }
        .render(&admin)
        .unwrap();

        assert_eq!(mail.to, admin);
        assert_eq!(mail.subject, ADMIN_NEW_DONOR_SUBJECT);
        assert!(mail.html.contains("<strong>Blood Group:</strong> AB-"));
        assert!(mail.text.contains("a@x.com"));
    }

    #[test]
    fn test_html_escapes_donor_name() {
        let mail = DonorConfirmation {
            name: "<b>Mallory</b>".into(),
            email: Email::parse("m@x.com").unwrap(),
        }
        .render()
        .unwrap();
        assert!(!mail.html.contains("<b>Mallory</b>"));
    }
}
