use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::RewardsError;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a success response with data
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response with message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Map a service error onto a status code and user-visible body. Storage
/// problems get a generic retry-later message; internal detail goes to the
/// log only.
pub fn error_response(err: RewardsError) -> (StatusCode, Json<serde_json::Value>) {
    match err {
        RewardsError::InvalidInput(msg) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": msg })),
        ),
        RewardsError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("{} not found", what) })),
        ),
        err => {
            error!("Request failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Temporary problem talking to storage, please retry"
                })),
            )
        }
    }
}

/// Pagination parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            limit: Some(10),
            offset: Some(0),
        }
    }
}

/// Standard pagination implementation
impl PaginationParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let params = PaginationParams {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(params.limit(), 100);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn storage_errors_do_not_leak_detail() {
        let (status, body) = error_response(RewardsError::Storage(
            diesel::result::Error::BrokenTransactionManager,
        ));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let text = body.0["error"].as_str().unwrap_or_default();
        assert!(!text.contains("transaction"));
    }
}
