// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use crate::schema::{task_templates, tasks};

/// A catalog entry describing an assignable unit of work. Maintained by
/// operators out of band; read-only here.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = task_templates)]
pub struct TaskTemplate {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub task_type: String,
    pub link: Option<String>,
    pub reward: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// One instantiation of a template for one account.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = tasks)]
pub struct Task {
    pub id: i32,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub task_type: String,
    pub link: Option<String>,
    pub reward: i32,
    pub is_completed: bool,
    pub expires_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Serialize, Deserialize)]
#[diesel(table_name = tasks)]
pub struct NewTask {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub task_type: String,
    pub link: Option<String>,
    pub reward: i32,
    pub is_completed: bool,
    pub expires_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
