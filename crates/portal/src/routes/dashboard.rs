//! Signed-in user dashboard.

use axum::Json;
use serde::Serialize;
use tracing::instrument;

use lifestream_core::{BloodRequest, Donor, UserProfile};

use crate::middleware::RequireUser;

/// The signed-in user's own records.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDashboard {
    pub profile: Option<UserProfile>,
    pub donations: Vec<Donor>,
    pub requests: Vec<BloodRequest>,
}

/// GET /api/me/dashboard
#[instrument(skip_all, fields(uid = %user.identity.uid))]
pub async fn mine(user: RequireUser) -> Json<UserDashboard> {
    let ctx = user.ctx;
    Json(UserDashboard {
        profile: ctx.user_profile(),
        donations: ctx.my_donations(),
        requests: ctx.my_requests(),
    })
}
