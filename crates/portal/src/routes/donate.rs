//! Donor registration and eligibility checks.

use axum::{Json, extract::State, http::StatusCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use lifestream_core::eligibility::{self, Violation};
use lifestream_core::forms::DonorForm;

use crate::error::AppError;
use crate::middleware::PortalContext;
use crate::services::{DonationOutcome, DonationReceipt};
use crate::state::AppState;

/// Eligibility check input.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityQuery {
    pub age: u32,
    pub last_donation_date: NaiveDate,
}

/// Eligibility verdict.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResponse {
    pub eligible: bool,
    pub title: &'static str,
    pub message: &'static str,
    pub violations: Vec<Violation>,
    pub reasons: Vec<&'static str>,
}

impl EligibilityResponse {
    fn from_verdict(verdict: &eligibility::Eligibility) -> Self {
        if verdict.is_eligible() {
            Self {
                eligible: true,
                title: "You are eligible to donate!",
                message: "Based on your answers, you meet the basic requirements to donate blood.",
                violations: Vec::new(),
                reasons: Vec::new(),
            }
        } else {
            Self {
                eligible: false,
                title: "Not Eligible to Donate",
                message: "Based on the information provided, you are not currently eligible to donate blood.",
                violations: verdict.violations().to_vec(),
                reasons: verdict.reasons(),
            }
        }
    }
}

/// Donation submission response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonateResponse {
    #[serde(flatten)]
    pub eligibility: EligibilityResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<DonationReceipt>,
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Check eligibility without registering.
///
/// POST /api/eligibility
#[instrument(skip_all, fields(age = query.age))]
pub async fn check_eligibility(Json(query): Json<EligibilityQuery>) -> Json<EligibilityResponse> {
    let verdict = eligibility::evaluate(query.age, query.last_donation_date, today());
    Json(EligibilityResponse::from_verdict(&verdict))
}

/// Register a donor.
///
/// POST /api/donate
///
/// Ineligible submissions get `200` with `eligible: false` and nothing is
/// stored. Eligible ones get `201` once the donor write is acknowledged.
#[instrument(skip_all, fields(blood_group = %form.blood_group))]
pub async fn submit(
    State(state): State<AppState>,
    PortalContext(ctx): PortalContext,
    Json(form): Json<DonorForm>,
) -> Result<(StatusCode, Json<DonateResponse>), AppError> {
    match state.donations().submit(&ctx, &form, today())? {
        DonationOutcome::Ineligible(verdict) => Ok((
            StatusCode::OK,
            Json(DonateResponse {
                eligibility: EligibilityResponse::from_verdict(&verdict),
                receipt: None,
            }),
        )),
        DonationOutcome::Accepted(accepted) => {
            let receipt = accepted.settle().await?;
            Ok((
                StatusCode::CREATED,
                Json(DonateResponse {
                    eligibility: EligibilityResponse::from_verdict(&eligibility::Eligibility::default()),
                    receipt: Some(receipt),
                }),
            ))
        }
    }
}
