// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::RewardsError;
use crate::metrics;
use crate::models::{NewReferral, ReferralStatus};
use crate::schema::{accounts, referrals};

use super::ReferralService;

/// Result of an attribution attempt. `applied == false` outcomes carry a
/// machine-readable reason; both the applied and already-attributed
/// outcomes tell the client to drop its held token so it is not re-applied
/// on a later session.
#[derive(Debug, Clone, Serialize)]
pub struct AttributionOutcome {
    pub applied: bool,
    pub canonical_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub clear_token: bool,
}

impl AttributionOutcome {
    fn applied(code: String) -> Self {
        Self {
            applied: true,
            canonical_code: Some(code),
            reason: None,
            clear_token: true,
        }
    }

    fn rejected(code: Option<String>, reason: &'static str) -> Self {
        Self {
            applied: false,
            canonical_code: code,
            reason: Some(reason),
            clear_token: reason == "already_attributed",
        }
    }
}

impl ReferralService {
    /// Durably attribute a newly authenticated account to a referrer,
    /// exactly once. The raw code is untrusted input.
    ///
    /// First write wins: once `referred_by` is non-null it is never
    /// overwritten, so retries and late tokens are no-ops. The write itself
    /// is a single conditional update; there is no read-then-write window.
    pub async fn attribute(
        &self,
        referred_account_id: &str,
        raw_code: &str,
    ) -> Result<AttributionOutcome, RewardsError> {
        if referred_account_id.is_empty() {
            return Err(RewardsError::InvalidInput(
                "account id must not be empty".to_string(),
            ));
        }

        let Some(code) = self.canonical_code(raw_code) else {
            metrics::ATTRIBUTIONS.with_label_values(&["invalid_code"]).inc();
            return Ok(AttributionOutcome::rejected(None, "invalid_code"));
        };

        let Some(referrer) = self.find_code_owner(&code).await? else {
            metrics::ATTRIBUTIONS.with_label_values(&["invalid_code"]).inc();
            return Ok(AttributionOutcome::rejected(Some(code), "invalid_code"));
        };

        if referrer.id == referred_account_id {
            metrics::ATTRIBUTIONS.with_label_values(&["self_referral"]).inc();
            return Ok(AttributionOutcome::rejected(Some(code), "self_referral"));
        }

        let mut conn = self.get_connection().await?;
        let now = Utc::now().naive_utc();

        let updated = diesel::update(
            accounts::table
                .filter(accounts::id.eq(referred_account_id))
                .filter(accounts::referred_by.is_null()),
        )
        .set((
            accounts::referred_by.eq(&code),
            accounts::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .await?;

        if updated == 0 {
            // Either the account is already attributed or it does not exist
            let referred_by = accounts::table
                .filter(accounts::id.eq(referred_account_id))
                .select(accounts::referred_by)
                .first::<Option<String>>(&mut conn)
                .await
                .optional()?
                .ok_or(RewardsError::NotFound("account"))?;

            return match referred_by {
                Some(_) => {
                    metrics::ATTRIBUTIONS
                        .with_label_values(&["already_attributed"])
                        .inc();
                    Ok(AttributionOutcome::rejected(Some(code), "already_attributed"))
                }
                None => Err(RewardsError::Internal(format!(
                    "attribution update matched no row for live account {}",
                    referred_account_id
                ))),
            };
        }

        info!(
            "Attributed account {} to referrer {} via {}",
            referred_account_id, referrer.id, code
        );
        metrics::ATTRIBUTIONS.with_label_values(&["applied"]).inc();

        // Secondary audit edge; its failure never rolls back the
        // attribution above.
        let edge = NewReferral {
            referrer_id: referrer.id.clone(),
            referred_id: referred_account_id.to_string(),
            status: ReferralStatus::Pending.as_str().to_string(),
            reward_granted: false,
            reward_amount: 0,
            created_at: now,
            updated_at: now,
        };

        let inserted = diesel::insert_into(referrals::table)
            .values(&edge)
            .on_conflict((referrals::referrer_id, referrals::referred_id))
            .do_nothing()
            .execute(&mut conn)
            .await;

        if let Err(e) = inserted {
            warn!(
                "Failed to record referral edge {} -> {}: {}",
                referrer.id, referred_account_id, e
            );
        }

        Ok(AttributionOutcome::applied(code))
    }
}
