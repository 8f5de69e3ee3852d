//! Blood request submission.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use lifestream_core::forms::RequestForm;

use crate::error::AppError;
use crate::middleware::PortalContext;
use crate::services::RequestReceipt;
use crate::state::AppState;

/// Submit a blood request.
///
/// POST /api/requests
#[instrument(skip_all, fields(blood_group = %form.blood_group, urgency = %form.urgency))]
pub async fn submit(
    State(state): State<AppState>,
    PortalContext(ctx): PortalContext,
    Json(form): Json<RequestForm>,
) -> Result<(StatusCode, Json<RequestReceipt>), AppError> {
    let receipt = state.requests().submit(&ctx, &form)?.settle().await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
