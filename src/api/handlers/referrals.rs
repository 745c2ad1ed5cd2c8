// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::routes::error_response;
use crate::api::AppState;
use crate::models::{Referral, ReferralStatus};

/// Response for the code issuance endpoint
#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub code: String,
    pub link: String,
}

/// Get (or lazily issue) the referral code for an account
pub async fn get_code(
    Path(account_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.referral.ensure_code(&account_id).await {
        Ok(code) => {
            let link = state.referral.config().referral_link(&code);
            (StatusCode::OK, Json(CodeResponse { code, link })).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub code: String,
    pub account_id: Option<String>,
}

/// Response for code validation
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// Check whether a referral code belongs to a real, non-self account
pub async fn validate_code(
    Query(query): Query<ValidateQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    debug!("Validating referral code {}", query.code);

    match state
        .referral
        .validate(&query.code, query.account_id.as_deref())
        .await
    {
        Ok(valid) => (StatusCode::OK, Json(ValidateResponse { valid })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct AttributeRequest {
    pub account_id: String,
    pub raw_code: String,
}

/// Record referral attribution for a newly authenticated account
pub async fn attribute(
    State(state): State<AppState>,
    Json(request): Json<AttributeRequest>,
) -> impl IntoResponse {
    match state
        .referral
        .attribute(&request.account_id, &request.raw_code)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Referral list plus the headline numbers shown on the invite page
#[derive(Debug, Serialize)]
pub struct ReferralListResponse {
    pub referrals: Vec<Referral>,
    pub total: usize,
    pub completed: usize,
    pub points_earned: i64,
}

/// List the referral edges recorded for a referrer
pub async fn list_referrals(
    Path(account_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.referral.list_for_referrer(&account_id).await {
        Ok(referrals) => {
            let completed = referrals
                .iter()
                .filter(|r| r.status == ReferralStatus::Completed.as_str())
                .count();
            let points_earned = referrals
                .iter()
                .filter(|r| r.reward_granted)
                .map(|r| r.reward_amount as i64)
                .sum();

            let response = ReferralListResponse {
                total: referrals.len(),
                completed,
                points_earned,
                referrals,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub referral: Referral,
    pub changed: bool,
}

/// Explicitly transition a referral's status
pub async fn update_status(
    Path(referral_id): Path<i32>,
    State(state): State<AppState>,
    Json(request): Json<StatusUpdateRequest>,
) -> impl IntoResponse {
    let status = match request.status.parse::<ReferralStatus>() {
        Ok(status) => status,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e })),
            )
                .into_response()
        }
    };

    match state.referral.update_status(referral_id, status).await {
        Ok((referral, changed)) => {
            (StatusCode::OK, Json(StatusUpdateResponse { referral, changed })).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

/// Bulk-normalize legacy referral codes onto the canonical prefix
pub async fn migrate_legacy(State(state): State<AppState>) -> impl IntoResponse {
    match state.referral.migrate_legacy_codes().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
