// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::RunQueryDsl;
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::RewardsError;
use crate::metrics;
use crate::schema::accounts;

use super::ReferralService;

const MAX_CODE_ATTEMPTS: usize = 3;

/// Outcome counts of a legacy-code migration run.
#[derive(Debug, Default, Serialize)]
pub struct LegacyMigrationReport {
    /// Accounts rewritten onto a canonical code.
    pub migrated: usize,
    /// `referred_by` references repointed from an old code to its
    /// replacement.
    pub repointed: usize,
}

/// Canonical code with a fresh random body. Bodies are uppercase
/// alphanumerics, never hyphenated, so canonicalization cannot truncate
/// them.
fn generate_code(prefix: &str, body_length: usize) -> String {
    let body: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(body_length)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();

    format!("{}{}", prefix, body)
}

impl ReferralService {
    fn generate_code(&self) -> String {
        generate_code(&self.config.canonical_prefix, self.config.code_length)
    }

    /// Return the account's referral code, generating one if absent.
    ///
    /// The common case is a plain read. Generation does not pre-check
    /// uniqueness; the unique index on `referral_code` is the backstop, and
    /// a collision there retries with a fresh body. A concurrent issuer
    /// winning the conditional update is not an error: its code is read
    /// back and returned.
    pub async fn ensure_code(&self, account_id: &str) -> Result<String, RewardsError> {
        let mut conn = self.get_connection().await?;

        let existing = accounts::table
            .filter(accounts::id.eq(account_id))
            .select(accounts::referral_code)
            .first::<Option<String>>(&mut conn)
            .await
            .optional()?
            .ok_or(RewardsError::NotFound("account"))?;

        if let Some(code) = existing {
            return Ok(code);
        }

        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = self.generate_code();
            let now = Utc::now().naive_utc();

            let result = diesel::update(
                accounts::table
                    .filter(accounts::id.eq(account_id))
                    .filter(accounts::referral_code.is_null()),
            )
            .set((
                accounts::referral_code.eq(&candidate),
                accounts::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await;

            match result {
                Ok(0) => {
                    // A concurrent request issued a code first
                    let stored = accounts::table
                        .filter(accounts::id.eq(account_id))
                        .select(accounts::referral_code)
                        .first::<Option<String>>(&mut conn)
                        .await?;

                    return stored.ok_or_else(|| {
                        RewardsError::Internal(format!(
                            "referral code missing after concurrent issue for {}",
                            account_id
                        ))
                    });
                }
                Ok(_) => {
                    info!("Issued referral code {} to account {}", candidate, account_id);
                    metrics::CODES_ISSUED.inc();
                    return Ok(candidate);
                }
                Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    warn!("Referral code collision on {}, regenerating", candidate);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RewardsError::Internal(format!(
            "could not issue a unique referral code for {} after {} attempts",
            account_id, MAX_CODE_ATTEMPTS
        )))
    }

    /// One-off bulk normalization of legacy referral codes.
    ///
    /// Every account whose code lacks the canonical prefix gets a fresh
    /// canonical code, then `referred_by` references to the old code are
    /// repointed at the new one. The two writes are not transactional
    /// across accounts; rerunning reconciles any partial completion, since
    /// accounts already on the canonical prefix are skipped.
    pub async fn migrate_legacy_codes(&self) -> Result<LegacyMigrationReport, RewardsError> {
        let mut conn = self.get_connection().await?;

        let legacy: Vec<(String, Option<String>)> = accounts::table
            .filter(accounts::referral_code.is_not_null())
            .filter(accounts::referral_code.not_like(format!("{}%", self.config.canonical_prefix)))
            .select((accounts::id, accounts::referral_code))
            .load(&mut conn)
            .await?;

        let mut report = LegacyMigrationReport::default();

        for (account_id, old_code) in legacy {
            let Some(old_code) = old_code else { continue };

            let mut new_code = None;
            for _ in 0..MAX_CODE_ATTEMPTS {
                let candidate = self.generate_code();
                let now = Utc::now().naive_utc();

                let result = diesel::update(accounts::table.filter(accounts::id.eq(&account_id)))
                    .set((
                        accounts::referral_code.eq(&candidate),
                        accounts::updated_at.eq(now),
                    ))
                    .execute(&mut conn)
                    .await;

                match result {
                    Ok(_) => {
                        new_code = Some(candidate);
                        break;
                    }
                    Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                        warn!("Referral code collision on {}, regenerating", candidate);
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let Some(new_code) = new_code else {
                warn!(
                    "Skipping account {}: no unique code after {} attempts",
                    account_id, MAX_CODE_ATTEMPTS
                );
                continue;
            };

            report.migrated += 1;
            info!(
                "Migrated account {} from code {} to {}",
                account_id, old_code, new_code
            );

            // Repoint referred accounts at the replacement code
            let now = Utc::now().naive_utc();
            let repointed = diesel::update(
                accounts::table.filter(accounts::referred_by.eq(&old_code)),
            )
            .set((
                accounts::referred_by.eq(&new_code),
                accounts::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await?;

            report.repointed += repointed;
        }

        info!(
            "Legacy code migration finished: {} migrated, {} repointed",
            report.migrated, report.repointed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::generate_code;
    use crate::referral::canonicalize;

    #[test]
    fn generated_codes_are_canonical_and_hyphen_free() {
        for _ in 0..50 {
            let code = generate_code("rafiki-", 6);
            let body = code.strip_prefix("rafiki-").expect("canonical prefix");
            assert_eq!(body.len(), 6);
            assert!(body.chars().all(|c| c.is_ascii_alphanumeric()));
            assert_eq!(body, body.to_uppercase());
            // A generated code survives canonicalization unchanged
            assert_eq!(canonicalize("rafiki-", &code), Some(code.clone()));
        }
    }

    #[test]
    fn generated_codes_respect_configured_length() {
        let code = generate_code("rafiki-", 10);
        assert_eq!(code.len(), "rafiki-".len() + 10);
    }
}
