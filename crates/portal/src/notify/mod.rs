//! Notification dispatcher.
//!
//! Renders a message from structured input and hands it to a
//! [`MailTransport`] on a background task. Delivery failures are logged and
//! reported through the returned [`PendingNotification`]; they never affect
//! the write that triggered the message.

pub mod templates;
pub mod transport;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{Instrument, info_span, warn};

use lifestream_core::Email;

pub use templates::{AdminNewDonor, DonorConfirmation};
pub use transport::{ConsoleTransport, SmtpTransport};

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failed to build the message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Transport rejected the message for another reason.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The send task was cancelled or panicked.
    #[error("Notification task failed: {0}")]
    Dispatch(String),
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Email,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Delivers rendered messages.
#[async_trait]
pub trait MailTransport: Send + Sync + 'static {
    /// Deliver one message.
    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotifyError>;
}

/// Outcome of a dispatched notification.
#[derive(Debug)]
pub struct PendingNotification {
    handle: JoinHandle<Result<(), NotifyError>>,
}

impl Future for PendingNotification {
    type Output = Result<(), NotifyError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|joined| joined.unwrap_or_else(|e| Err(NotifyError::Dispatch(e.to_string()))))
    }
}

/// Renders and dispatches portal notifications.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn MailTransport>,
    admin_email: Email,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// Create a notifier sending through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn MailTransport>, admin_email: Email) -> Self {
        Self {
            transport,
            admin_email,
        }
    }

    /// Address that receives admin alerts.
    #[must_use]
    pub const fn admin_email(&self) -> &Email {
        &self.admin_email
    }

    /// Send the thank-you message to a new donor.
    pub fn dispatch_donor_confirmation(&self, input: DonorConfirmation) -> PendingNotification {
        self.dispatch("donor_confirmation", input.render())
    }

    /// Alert the administrator about a new donor.
    pub fn dispatch_admin_new_donor(&self, input: AdminNewDonor) -> PendingNotification {
        self.dispatch("admin_new_donor", input.render(&self.admin_email))
    }

    fn dispatch(
        &self,
        kind: &'static str,
        rendered: Result<OutgoingMail, NotifyError>,
    ) -> PendingNotification {
        let transport = Arc::clone(&self.transport);
        let span = info_span!("notify", kind);
        let handle = tokio::spawn(
            async move {
                let result = match rendered {
                    Ok(mail) => transport.send(&mail).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = &result {
                    warn!(error = %e, "Notification failed");
                }
                result
            }
            .instrument(span),
        );
        PendingNotification { handle }
    }
}
