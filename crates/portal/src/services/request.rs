//! Blood request submission.

use serde::Serialize;
use tracing::instrument;

use lifestream_core::forms::{FieldErrors, RequestForm};
use lifestream_core::{BloodGroup, RequestKey};

use crate::context::{AppContext, PendingWrite};
use crate::store::StoreError;

/// Confirmation shown after a request is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestReceipt {
    pub key: RequestKey,
    pub title: &'static str,
    pub message: String,
}

/// A submitted request whose write is in flight.
#[derive(Debug)]
pub struct SubmittedRequest {
    write: PendingWrite<RequestKey>,
    units: u32,
    blood_group: BloodGroup,
}

impl SubmittedRequest {
    /// Wait for the store to acknowledge the request.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write failed.
    pub async fn settle(self) -> Result<RequestReceipt, StoreError> {
        let key = self.write.await?;
        Ok(RequestReceipt {
            key,
            title: "Request Submitted Successfully!",
            message: format!(
                "Your request for {} unit(s) of {} blood has been broadcasted. We will notify you when a donor is found.",
                self.units, self.blood_group
            ),
        })
    }

    /// The underlying write, for callers that only need the key.
    #[must_use]
    pub fn into_write(self) -> PendingWrite<RequestKey> {
        self.write
    }
}

/// Validates request forms and submits them as `Pending` requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestService;

impl RequestService {
    /// Submit a request form.
    ///
    /// # Errors
    ///
    /// Returns [`FieldErrors`] if the form is malformed.
    #[instrument(skip(self, ctx, form), fields(blood_group = %form.blood_group))]
    pub fn submit(
        &self,
        ctx: &AppContext,
        form: &RequestForm,
    ) -> Result<SubmittedRequest, FieldErrors> {
        let request = form.validate()?;
        let units = request.units.get();
        let blood_group = request.blood_group;
        Ok(SubmittedRequest {
            write: ctx.add_request(request),
            units,
            blood_group,
        })
    }
}
