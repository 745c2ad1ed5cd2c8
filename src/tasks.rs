// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::TasksConfig;
use crate::db::{Database, DbConnection};
use crate::error::RewardsError;
use crate::metrics;
use crate::models::{NewTask, Task, TaskTemplate};
use crate::schema::{accounts, task_templates, tasks};

/// What a completion call did. `new_points` is present only when points
/// actually moved in this call.
#[derive(Debug, Serialize)]
pub struct CompletionReceipt {
    pub task: Task,
    pub points_awarded: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_points: Option<i32>,
}

/// Task assignment and completion ledger. Assigns the active template
/// catalog to an account exactly once per template title and flips each
/// task to completed exactly once, crediting its reward atomically with
/// the flip.
pub struct TaskLedger {
    db: Arc<Database>,
    config: TasksConfig,
}

impl TaskLedger {
    pub fn new(db: Arc<Database>, config: TasksConfig) -> Self {
        Self { db, config }
    }

    async fn get_connection(&self) -> Result<DbConnection, RewardsError> {
        self.db.get_connection().await.map_err(RewardsError::from)
    }

    /// All tasks for an account, oldest first.
    pub async fn list(&self, account_id: &str) -> Result<Vec<Task>, RewardsError> {
        let mut conn = self.get_connection().await?;

        let all = tasks::table
            .filter(tasks::user_id.eq(account_id))
            .order_by(tasks::created_at.asc())
            .load::<Task>(&mut conn)
            .await?;

        Ok(all)
    }

    /// Seed the account's task list from the active template catalog and
    /// return the full current list.
    ///
    /// Template title is the sole de-duplication key, so a second call with
    /// an unchanged catalog creates nothing. A renamed template produces a
    /// fresh task for every account; the unique index on `(user_id, title)`
    /// plus `ON CONFLICT DO NOTHING` keeps concurrent duplicate requests
    /// from inserting twice.
    pub async fn assign(&self, account_id: &str) -> Result<Vec<Task>, RewardsError> {
        let mut conn = self.get_connection().await?;

        let account_exists = accounts::table
            .filter(accounts::id.eq(account_id))
            .count()
            .get_result::<i64>(&mut conn)
            .await?
            > 0;

        if !account_exists {
            return Err(RewardsError::NotFound("account"));
        }

        let templates = task_templates::table
            .filter(task_templates::is_active.eq(true))
            .load::<TaskTemplate>(&mut conn)
            .await?;

        let existing_titles = tasks::table
            .filter(tasks::user_id.eq(account_id))
            .select(tasks::title)
            .load::<String>(&mut conn)
            .await?;

        let missing = templates_needing_assignment(&templates, &existing_titles);

        if !missing.is_empty() {
            let now = Utc::now().naive_utc();
            let expires_at = now + Duration::days(self.config.expiry_days);

            let rows: Vec<NewTask> = missing
                .iter()
                .map(|template| NewTask {
                    user_id: account_id.to_string(),
                    title: template.title.clone(),
                    description: template.description.clone(),
                    task_type: template.task_type.clone(),
                    link: template.link.clone(),
                    reward: template.reward,
                    is_completed: false,
                    expires_at: Some(expires_at),
                    created_at: now,
                    updated_at: now,
                })
                .collect();

            diesel::insert_into(tasks::table)
                .values(&rows)
                .on_conflict((tasks::user_id, tasks::title))
                .do_nothing()
                .execute(&mut conn)
                .await?;

            info!("Assigned {} new tasks to account {}", rows.len(), account_id);
        } else {
            debug!("No new tasks to assign to account {}", account_id);
        }

        self.list(account_id).await
    }

    /// Complete a task owned by the account and credit its reward.
    ///
    /// The false-to-true flip is a single conditional update; only the
    /// request that lands it credits points, so a double-submitted click
    /// can never double-credit. The credit itself is an atomic SQL
    /// increment, not a read-modify-write. A missing or foreign task id is
    /// NotFound; completing an already-completed task is a quiet no-op.
    pub async fn complete(
        &self,
        task_id: i32,
        account_id: &str,
    ) -> Result<CompletionReceipt, RewardsError> {
        let mut conn = self.get_connection().await?;
        let now = Utc::now().naive_utc();

        let flipped = diesel::update(
            tasks::table
                .filter(tasks::id.eq(task_id))
                .filter(tasks::user_id.eq(account_id))
                .filter(tasks::is_completed.eq(false)),
        )
        .set((tasks::is_completed.eq(true), tasks::updated_at.eq(now)))
        .execute(&mut conn)
        .await?;

        let task = tasks::table
            .filter(tasks::id.eq(task_id))
            .filter(tasks::user_id.eq(account_id))
            .select(Task::as_select())
            .first::<Task>(&mut conn)
            .await
            .optional()?
            .ok_or(RewardsError::NotFound("task"))?;

        if flipped == 0 {
            debug!(
                "Task {} for account {} was already completed",
                task_id, account_id
            );
            return Ok(CompletionReceipt {
                task,
                points_awarded: 0,
                new_points: None,
            });
        }

        metrics::TASKS_COMPLETED.inc();

        let mut points_awarded = 0;
        let mut new_points = None;

        if task.reward > 0 {
            let balance = diesel::update(accounts::table.filter(accounts::id.eq(account_id)))
                .set((
                    accounts::points.eq(accounts::points + task.reward),
                    accounts::updated_at.eq(now),
                ))
                .returning(accounts::points)
                .get_result::<i32>(&mut conn)
                .await?;

            points_awarded = task.reward;
            new_points = Some(balance);
            metrics::POINTS_AWARDED.inc_by(task.reward as u64);

            info!(
                "Task {} completed by {}: awarded {} points, balance {}",
                task_id, account_id, task.reward, balance
            );
        }

        Ok(CompletionReceipt {
            task,
            points_awarded,
            new_points,
        })
    }
}

/// Templates with no task row for the account yet, keyed by title.
fn templates_needing_assignment<'a>(
    templates: &'a [TaskTemplate],
    existing_titles: &[String],
) -> Vec<&'a TaskTemplate> {
    let existing: HashSet<&str> = existing_titles.iter().map(String::as_str).collect();

    templates
        .iter()
        .filter(|template| !existing.contains(template.title.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::templates_needing_assignment;
    use crate::models::TaskTemplate;
    use chrono::Utc;

    fn template(title: &str) -> TaskTemplate {
        TaskTemplate {
            id: 1,
            title: title.to_string(),
            description: None,
            task_type: "generic".to_string(),
            link: None,
            reward: 10,
            is_active: true,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn only_unassigned_titles_are_selected() {
        let templates = vec![
            template("Watch an ad"),
            template("Fill a survey"),
            template("Invite a friend"),
        ];
        let existing = vec!["Fill a survey".to_string()];

        let missing = templates_needing_assignment(&templates, &existing);
        let titles: Vec<&str> = missing.iter().map(|t| t.title.as_str()).collect();

        assert_eq!(titles, vec!["Watch an ad", "Invite a friend"]);
    }

    #[test]
    fn unchanged_catalog_assigns_nothing() {
        let templates = vec![template("Watch an ad"), template("Fill a survey")];
        let existing = vec!["Watch an ad".to_string(), "Fill a survey".to_string()];

        assert!(templates_needing_assignment(&templates, &existing).is_empty());
    }

    #[test]
    fn empty_catalog_assigns_nothing() {
        assert!(templates_needing_assignment(&[], &[]).is_empty());
    }
}
