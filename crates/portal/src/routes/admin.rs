//! Admin route handlers.
//!
//! Every handler requires an admin session. Edits are applied as partial
//! updates; eligibility is not re-checked on donor edits.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use lifestream_core::forms::BankForm;
use lifestream_core::stats::DashboardStats;
use lifestream_core::{
    BankKey, BankPatch, BloodRequest, Donor, DonorKey, DonorPatch, RequestKey, RequestPatch,
    RequestStatus,
};

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// GET /api/admin/stats
pub async fn stats(RequireAdmin(ctx): RequireAdmin) -> Json<DashboardStats> {
    Json(ctx.stats())
}

/// GET /api/admin/donors
pub async fn list_donors(RequireAdmin(ctx): RequireAdmin) -> Json<Vec<Donor>> {
    Json(ctx.donors().to_vec())
}

/// GET /api/admin/requests
pub async fn list_requests(RequireAdmin(ctx): RequireAdmin) -> Json<Vec<BloodRequest>> {
    Json(ctx.requests().to_vec())
}

/// PUT /api/admin/donors/{key}
#[instrument(skip_all)]
pub async fn update_donor(
    RequireAdmin(ctx): RequireAdmin,
    Path(key): Path<DonorKey>,
    Json(patch): Json<DonorPatch>,
) -> Result<StatusCode, AppError> {
    ctx.update_donor(key, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/donors/{key}
#[instrument(skip_all)]
pub async fn delete_donor(
    RequireAdmin(ctx): RequireAdmin,
    Path(key): Path<DonorKey>,
) -> Result<StatusCode, AppError> {
    ctx.delete_donor(key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/admin/requests/{key}
#[instrument(skip_all)]
pub async fn update_request(
    RequireAdmin(ctx): RequireAdmin,
    Path(key): Path<RequestKey>,
    Json(patch): Json<RequestPatch>,
) -> Result<StatusCode, AppError> {
    ctx.update_request(key, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/requests/{key}
#[instrument(skip_all)]
pub async fn delete_request(
    RequireAdmin(ctx): RequireAdmin,
    Path(key): Path<RequestKey>,
) -> Result<StatusCode, AppError> {
    ctx.delete_request(key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// New status after a toggle.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub status: RequestStatus,
}

/// POST /api/admin/requests/{key}/toggle
#[instrument(skip_all)]
pub async fn toggle_request(
    RequireAdmin(ctx): RequireAdmin,
    Path(key): Path<RequestKey>,
) -> Result<Json<ToggleResponse>, AppError> {
    let status = ctx.toggle_request_status(key).await?;
    Ok(Json(ToggleResponse { status }))
}

/// Created bank key.
#[derive(Debug, Serialize)]
pub struct CreatedBank {
    pub key: BankKey,
    pub message: String,
}

/// POST /api/admin/banks
#[instrument(skip_all, fields(name = %form.name))]
pub async fn add_bank(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
    Json(form): Json<BankForm>,
) -> Result<(StatusCode, Json<CreatedBank>), AppError> {
    let key = state.banks().add(&ctx, &form)?.await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedBank {
            key,
            message: format!("{} has been successfully added.", form.name.trim()),
        }),
    ))
}

/// PUT /api/admin/banks/{key}
#[instrument(skip_all)]
pub async fn update_bank(
    RequireAdmin(ctx): RequireAdmin,
    Path(key): Path<BankKey>,
    Json(patch): Json<BankPatch>,
) -> Result<StatusCode, AppError> {
    ctx.update_bank(key, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/banks/{key}
#[instrument(skip_all)]
pub async fn delete_bank(
    RequireAdmin(ctx): RequireAdmin,
    Path(key): Path<BankKey>,
) -> Result<StatusCode, AppError> {
    ctx.delete_bank(key).await?;
    Ok(StatusCode::NO_CONTENT)
}
