// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::api::routes::{error_response, ApiResponse, PaginationParams};
use crate::api::AppState;
use crate::events::AccountProfile;
use crate::models::Account;

/// Fetch one account by its identity provider id
pub async fn get_account(
    Path(account_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.directory.get(&account_id).await {
        Ok(account) => (StatusCode::OK, Json(ApiResponse::success(account))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub account_id: String,
    pub full_name: Option<String>,
    pub points: i32,
}

/// Accounts ranked by points balance
pub async fn get_leaderboard(
    Query(params): Query<PaginationParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let limit = params.limit();
    let offset = params.offset();

    match state.directory.leaderboard(limit, offset).await {
        Ok(accounts) => {
            let entries: Vec<LeaderboardEntry> = accounts
                .into_iter()
                .enumerate()
                .map(|(i, account)| LeaderboardEntry {
                    rank: offset + i as i64 + 1,
                    account_id: account.id,
                    full_name: account.full_name,
                    points: account.points,
                })
                .collect();

            (StatusCode::OK, Json(ApiResponse::success(entries))).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

/// Post-authentication profile sync from the web client.
///
/// Runs the same upsert as the provider webhook, then makes sure the
/// account carries an outgoing referral code and a seeded task list.
pub async fn sync_account(
    State(state): State<AppState>,
    Json(profile): Json<AccountProfile>,
) -> impl IntoResponse {
    let result = match state.directory.upsert(&profile).await {
        Ok(result) => result,
        Err(e) => return error_response(e).into_response(),
    };

    if result.phone_newly_set {
        if let Err(e) = state.referral.complete_referral_for(&result.account.id).await {
            warn!(
                "Could not complete referral for {} during sync: {}",
                result.account.id, e
            );
        }
    }

    // First visit also provisions the outgoing code and task list; both are
    // idempotent, so repeating them on every sync is harmless.
    if let Err(e) = state.referral.ensure_code(&result.account.id).await {
        warn!(
            "Could not ensure referral code for {} during sync: {}",
            result.account.id, e
        );
    }
    if let Err(e) = state.ledger.assign(&result.account.id).await {
        warn!(
            "Could not assign tasks to {} during sync: {}",
            result.account.id, e
        );
    }

    let account: Result<Account, _> = state.directory.get(&result.account.id).await;
    match account {
        Ok(account) => (
            if result.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            },
            Json(ApiResponse::success(account)),
        )
            .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
