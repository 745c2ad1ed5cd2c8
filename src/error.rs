// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Service-level error taxonomy. Storage failures are kept distinct from
/// "not found" and "invalid input" so callers never treat a lookup failure
/// as proof of invalidity.
#[derive(Debug, Error)]
pub enum RewardsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Storage(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] crate::db::DbPoolError),

    #[error("internal error: {0}")]
    Internal(String),
}
