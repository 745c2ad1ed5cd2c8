// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::error;

use crate::metrics;

/// Prometheus text exposition of the default registry
pub async fn get_metrics() -> impl IntoResponse {
    match metrics::gather() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to encode metrics".to_string(),
            )
        }
    }
}
