// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

mod attribution;
mod canonical;
mod issuer;
mod validator;

pub use attribution::AttributionOutcome;
pub use canonical::canonicalize;
pub use issuer::LegacyMigrationReport;

use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::info;

use crate::config::ReferralConfig;
use crate::db::{Database, DbConnection};
use crate::error::RewardsError;
use crate::models::{Referral, ReferralStatus};
use crate::schema::{accounts, referrals};

/// Referral workflow: canonicalization, validation, attribution and code
/// issuance against the account store. One instance is shared by all
/// request handlers; configuration is fixed at construction.
pub struct ReferralService {
    db: Arc<Database>,
    config: ReferralConfig,
}

impl ReferralService {
    pub fn new(db: Arc<Database>, config: ReferralConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &ReferralConfig {
        &self.config
    }

    /// Canonicalize a raw token with this service's configured prefix.
    pub fn canonical_code(&self, raw: &str) -> Option<String> {
        canonical::canonicalize(&self.config.canonical_prefix, raw)
    }

    async fn get_connection(&self) -> Result<DbConnection, RewardsError> {
        self.db.get_connection().await.map_err(RewardsError::from)
    }

    /// Referral edges recorded for a referrer, newest first.
    pub async fn list_for_referrer(&self, referrer_id: &str) -> Result<Vec<Referral>, RewardsError> {
        let mut conn = self.get_connection().await?;

        let edges = referrals::table
            .filter(referrals::referrer_id.eq(referrer_id))
            .order_by(referrals::created_at.desc())
            .load::<Referral>(&mut conn)
            .await?;

        Ok(edges)
    }

    /// Complete the referred account's pending referral, if any. Called when
    /// the referred account supplies a phone number. The status guard makes
    /// the transition and its reward single-shot under concurrent delivery.
    pub async fn complete_referral_for(
        &self,
        referred_id: &str,
    ) -> Result<Option<Referral>, RewardsError> {
        let mut conn = self.get_connection().await?;
        let now = Utc::now().naive_utc();

        let completed = diesel::update(
            referrals::table
                .filter(referrals::referred_id.eq(referred_id))
                .filter(referrals::status.eq(ReferralStatus::Pending.as_str())),
        )
        .set((
            referrals::status.eq(ReferralStatus::Completed.as_str()),
            referrals::reward_granted.eq(true),
            referrals::reward_amount.eq(self.config.reward_amount),
            referrals::updated_at.eq(now),
        ))
        .returning(Referral::as_returning())
        .get_result::<Referral>(&mut conn)
        .await
        .optional()?;

        if let Some(edge) = &completed {
            self.credit_referrer(&mut conn, edge).await?;
        }

        Ok(completed)
    }

    /// Explicit status transition for a referral edge. Returns the edge and
    /// whether this call changed it; transitions out of a terminal status
    /// are no-ops, not errors.
    pub async fn update_status(
        &self,
        referral_id: i32,
        new_status: ReferralStatus,
    ) -> Result<(Referral, bool), RewardsError> {
        if new_status == ReferralStatus::Pending {
            return Err(RewardsError::InvalidInput(
                "a referral cannot be moved back to pending".to_string(),
            ));
        }

        let mut conn = self.get_connection().await?;
        let now = Utc::now().naive_utc();

        let changed = match new_status {
            // Reward fields are set exactly once, on this transition
            ReferralStatus::Completed => {
                diesel::update(
                    referrals::table
                        .filter(referrals::id.eq(referral_id))
                        .filter(referrals::status.eq(ReferralStatus::Pending.as_str())),
                )
                .set((
                    referrals::status.eq(ReferralStatus::Completed.as_str()),
                    referrals::reward_granted.eq(true),
                    referrals::reward_amount.eq(self.config.reward_amount),
                    referrals::updated_at.eq(now),
                ))
                .returning(Referral::as_returning())
                .get_result::<Referral>(&mut conn)
                .await
                .optional()?
            }
            _ => {
                diesel::update(
                    referrals::table
                        .filter(referrals::id.eq(referral_id))
                        .filter(referrals::status.eq(ReferralStatus::Pending.as_str())),
                )
                .set((
                    referrals::status.eq(new_status.as_str()),
                    referrals::updated_at.eq(now),
                ))
                .returning(Referral::as_returning())
                .get_result::<Referral>(&mut conn)
                .await
                .optional()?
            }
        };

        if let Some(edge) = changed {
            if new_status == ReferralStatus::Completed {
                self.credit_referrer(&mut conn, &edge).await?;
            }
            return Ok((edge, true));
        }

        // No pending row matched: either the edge is absent or already
        // in a terminal status.
        let edge = referrals::table
            .filter(referrals::id.eq(referral_id))
            .select(Referral::as_select())
            .first::<Referral>(&mut conn)
            .await
            .optional()?
            .ok_or(RewardsError::NotFound("referral"))?;

        Ok((edge, false))
    }

    /// Atomic points credit to the referrer for a completed edge.
    async fn credit_referrer(
        &self,
        conn: &mut DbConnection,
        edge: &Referral,
    ) -> Result<(), RewardsError> {
        if edge.reward_amount <= 0 {
            return Ok(());
        }

        let now = Utc::now().naive_utc();
        diesel::update(accounts::table.filter(accounts::id.eq(&edge.referrer_id)))
            .set((
                accounts::points.eq(accounts::points + edge.reward_amount),
                accounts::updated_at.eq(now),
            ))
            .execute(conn)
            .await?;

        crate::metrics::POINTS_AWARDED.inc_by(edge.reward_amount as u64);
        info!(
            "Referral {} completed: credited {} points to {}",
            edge.id, edge.reward_amount, edge.referrer_id
        );

        Ok(())
    }
}
