//! Blood bank directory.

use axum::{Json, extract::{Query, State}};
use tracing::instrument;

use lifestream_core::Bank;
use lifestream_core::directory::DirectoryQuery;

use crate::middleware::PortalContext;
use crate::state::AppState;

/// Search the directory.
///
/// GET /api/banks?q=&blood_group=
#[instrument(skip_all)]
pub async fn directory(
    State(state): State<AppState>,
    PortalContext(ctx): PortalContext,
    Query(query): Query<DirectoryQuery>,
) -> Json<Vec<Bank>> {
    Json(state.banks().directory(&ctx, &query))
}
