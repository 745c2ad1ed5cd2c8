// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use crate::schema::accounts;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = accounts)]
pub struct Account {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone_number: Option<String>,
    pub referral_code: Option<String>,
    pub referred_by: Option<String>,
    pub points: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Serialize, Deserialize)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Profile fields synced from the identity provider; last write wins.
#[derive(Debug, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = accounts)]
pub struct UpdateAccount {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone_number: Option<String>,
    pub updated_at: NaiveDateTime,
}
