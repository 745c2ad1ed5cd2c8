// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::routes::error_response;
use crate::api::AppState;
use crate::models::Task;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub account_id: String,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub total: usize,
}

/// Seed the account's task list from the active template catalog
pub async fn assign_tasks(
    State(state): State<AppState>,
    Json(request): Json<AssignRequest>,
) -> impl IntoResponse {
    match state.ledger.assign(&request.account_id).await {
        Ok(tasks) => {
            let response = TaskListResponse {
                total: tasks.len(),
                tasks,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub task_id: i32,
    pub account_id: String,
}

/// Complete a task and credit its reward
pub async fn complete_task(
    State(state): State<AppState>,
    Json(request): Json<CompleteRequest>,
) -> impl IntoResponse {
    match state
        .ledger
        .complete(request.task_id, &request.account_id)
        .await
    {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// List an account's tasks
pub async fn list_tasks(
    Path(account_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.ledger.list(&account_id).await {
        Ok(tasks) => {
            let response = TaskListResponse {
                total: tasks.len(),
                tasks,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}
