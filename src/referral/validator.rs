// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::error::RewardsError;
use crate::models::Account;
use crate::schema::accounts;

use super::ReferralService;

impl ReferralService {
    /// Resolve a canonical code to the account that owns it. Exact match
    /// first; legacy rows may differ in case, so retry case-insensitively.
    /// Storage failures are returned as errors, never as "no owner".
    pub async fn find_code_owner(
        &self,
        canonical_code: &str,
    ) -> Result<Option<Account>, RewardsError> {
        let mut conn = self.get_connection().await?;

        let exact = accounts::table
            .filter(accounts::referral_code.eq(canonical_code))
            .select(Account::as_select())
            .first::<Account>(&mut conn)
            .await
            .optional()?;

        if exact.is_some() {
            return Ok(exact);
        }

        let folded = accounts::table
            .filter(accounts::referral_code.ilike(canonical_code))
            .select(Account::as_select())
            .first::<Account>(&mut conn)
            .await
            .optional()?;

        Ok(folded)
    }

    /// Check whether a raw or canonical code refers to a real account.
    /// When `for_account` is supplied, a code owned by that same account is
    /// invalid (self-referral).
    pub async fn validate(
        &self,
        raw_code: &str,
        for_account: Option<&str>,
    ) -> Result<bool, RewardsError> {
        let Some(code) = self.canonical_code(raw_code) else {
            return Ok(false);
        };

        let owner = self.find_code_owner(&code).await?;
        let valid = match (&owner, for_account) {
            (Some(account), Some(caller)) => account.id != caller,
            (Some(_), None) => true,
            (None, _) => false,
        };

        debug!("Validated referral code {}: {}", code, valid);
        Ok(valid)
    }
}
