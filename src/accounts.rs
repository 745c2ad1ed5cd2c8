// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{debug, info};

use crate::db::{Database, DbConnection};
use crate::error::RewardsError;
use crate::events::AccountProfile;
use crate::models::{Account, NewAccount, UpdateAccount};
use crate::schema::accounts;

/// Result of syncing a profile from the identity provider.
#[derive(Debug)]
pub struct SyncResult {
    pub account: Account,
    pub created: bool,
    /// True when this sync supplied a phone number the account lacked;
    /// the caller uses it to complete a pending referral.
    pub phone_newly_set: bool,
}

/// Account store synced from the identity provider. The provider's webhook
/// events and the client's post-authentication sync call both land here.
pub struct AccountDirectory {
    db: Arc<Database>,
}

impl AccountDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn get_connection(&self) -> Result<DbConnection, RewardsError> {
        self.db.get_connection().await.map_err(RewardsError::from)
    }

    pub async fn get(&self, account_id: &str) -> Result<Account, RewardsError> {
        let mut conn = self.get_connection().await?;

        accounts::table
            .filter(accounts::id.eq(account_id))
            .select(Account::as_select())
            .first::<Account>(&mut conn)
            .await
            .optional()?
            .ok_or(RewardsError::NotFound("account"))
    }

    /// Accounts ranked by points balance.
    pub async fn leaderboard(&self, limit: i64, offset: i64) -> Result<Vec<Account>, RewardsError> {
        let mut conn = self.get_connection().await?;

        let top = accounts::table
            .order_by((accounts::points.desc(), accounts::created_at.asc()))
            .limit(limit)
            .offset(offset)
            .select(Account::as_select())
            .load::<Account>(&mut conn)
            .await?;

        Ok(top)
    }

    /// Create or update an account from an identity provider profile.
    ///
    /// De-duplicated by identifier first; a row pre-provisioned under the
    /// same email but not yet carrying this identifier is updated in place
    /// rather than duplicated (the identifier is the immutable key, so only
    /// profile fields move). Profile fields are last-write-wins.
    pub async fn upsert(&self, profile: &AccountProfile) -> Result<SyncResult, RewardsError> {
        if profile.id.is_empty() {
            return Err(RewardsError::InvalidInput(
                "account id must not be empty".to_string(),
            ));
        }

        let mut conn = self.get_connection().await?;
        let now = Utc::now().naive_utc();

        let existing = accounts::table
            .filter(accounts::id.eq(&profile.id))
            .select(Account::as_select())
            .first::<Account>(&mut conn)
            .await
            .optional()?;

        // Fall back to email match for rows created before the identifier
        // was known.
        let existing = match existing {
            Some(account) => Some(account),
            None => match &profile.email {
                Some(email) => {
                    accounts::table
                        .filter(accounts::email.eq(email))
                        .select(Account::as_select())
                        .first::<Account>(&mut conn)
                        .await
                        .optional()?
                }
                None => None,
            },
        };

        match existing {
            Some(account) => {
                let had_phone = account.phone_number.is_some();

                let changes = UpdateAccount {
                    email: profile.email.clone(),
                    full_name: profile.full_name.clone(),
                    avatar_url: profile.avatar_url.clone(),
                    phone_number: profile.phone_number.clone(),
                    updated_at: now,
                };

                let updated = diesel::update(accounts::table.filter(accounts::id.eq(&account.id)))
                    .set(&changes)
                    .returning(Account::as_returning())
                    .get_result::<Account>(&mut conn)
                    .await?;

                debug!("Synced profile for account {}", updated.id);

                Ok(SyncResult {
                    phone_newly_set: !had_phone && updated.phone_number.is_some(),
                    created: false,
                    account: updated,
                })
            }
            None => {
                let row = NewAccount {
                    id: profile.id.clone(),
                    email: profile.email.clone(),
                    full_name: profile.full_name.clone(),
                    avatar_url: profile.avatar_url.clone(),
                    phone_number: profile.phone_number.clone(),
                    created_at: now,
                    updated_at: now,
                };

                // The webhook and the first authenticated visit race to
                // create the row; the conflict target makes the loser an
                // update instead of an error.
                let created = diesel::insert_into(accounts::table)
                    .values(&row)
                    .on_conflict(accounts::id)
                    .do_update()
                    .set((
                        accounts::email.eq(row.email.clone()),
                        accounts::full_name.eq(row.full_name.clone()),
                        accounts::avatar_url.eq(row.avatar_url.clone()),
                        accounts::phone_number.eq(row.phone_number.clone()),
                        accounts::updated_at.eq(now),
                    ))
                    .returning(Account::as_returning())
                    .get_result::<Account>(&mut conn)
                    .await?;

                info!("Created account {}", created.id);

                Ok(SyncResult {
                    phone_newly_set: created.phone_number.is_some(),
                    created: true,
                    account: created,
                })
            }
        }
    }

    /// Remove an account on the provider's deletion event. Referral edges
    /// and tasks go with it via ON DELETE CASCADE.
    pub async fn delete(&self, account_id: &str) -> Result<bool, RewardsError> {
        let mut conn = self.get_connection().await?;

        let deleted = diesel::delete(accounts::table.filter(accounts::id.eq(account_id)))
            .execute(&mut conn)
            .await?;

        if deleted > 0 {
            info!("Deleted account {}", account_id);
        }

        Ok(deleted > 0)
    }
}
