//! Submission services.
//!
//! Each service takes a validated form through the session's
//! [`AppContext`](crate::context::AppContext) and, for donations, the
//! notifier. Services hold no per-session state.

pub mod auth;
pub mod bank;
pub mod donation;
pub mod request;

pub use auth::{AuthService, Destination, SignInOutcome};
pub use bank::BankService;
pub use donation::{AcceptedDonation, DonationOutcome, DonationReceipt, DonationService};
pub use request::{RequestReceipt, RequestService, SubmittedRequest};
