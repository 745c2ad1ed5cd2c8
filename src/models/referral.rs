// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::schema::referrals;

/// Lifecycle of a referral edge. `Completed` is reached at most once; the
/// reward fields are written on that transition only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Completed,
    Rejected,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "pending",
            ReferralStatus::Completed => "completed",
            ReferralStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferralStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReferralStatus::Pending),
            "completed" => Ok(ReferralStatus::Completed),
            "rejected" => Ok(ReferralStatus::Rejected),
            other => Err(format!("unknown referral status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = referrals)]
pub struct Referral {
    pub id: i32,
    pub referrer_id: String,
    pub referred_id: String,
    pub status: String,
    pub reward_granted: bool,
    pub reward_amount: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Serialize, Deserialize)]
#[diesel(table_name = referrals)]
pub struct NewReferral {
    pub referrer_id: String,
    pub referred_id: String,
    pub status: String,
    pub reward_granted: bool,
    pub reward_amount: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ReferralStatus::Pending,
            ReferralStatus::Completed,
            ReferralStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<ReferralStatus>(), Ok(status));
        }
        assert!("expired".parse::<ReferralStatus>().is_err());
    }
}
