// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

// Import diesel table macros
use diesel::table;
use diesel::allow_tables_to_appear_in_same_query;

// Define accounts table
table! {
    accounts (id) {
        id -> Varchar,
        email -> Nullable<Varchar>,
        full_name -> Nullable<Varchar>,
        avatar_url -> Nullable<Varchar>,
        phone_number -> Nullable<Varchar>,
        referral_code -> Nullable<Varchar>,
        referred_by -> Nullable<Varchar>,
        points -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

// Define referral edges table
table! {
    referrals (id) {
        id -> Integer,
        referrer_id -> Varchar,
        referred_id -> Varchar,
        status -> Varchar,
        reward_granted -> Bool,
        reward_amount -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

// Define operator-maintained task catalog table
table! {
    task_templates (id) {
        id -> Integer,
        title -> Varchar,
        description -> Nullable<Text>,
        task_type -> Varchar,
        link -> Nullable<Varchar>,
        reward -> Integer,
        is_active -> Bool,
        created_at -> Timestamp,
    }
}

// Define per-account task instances table
table! {
    tasks (id) {
        id -> Integer,
        user_id -> Varchar,
        title -> Varchar,
        description -> Nullable<Text>,
        task_type -> Varchar,
        link -> Nullable<Varchar>,
        reward -> Integer,
        is_completed -> Bool,
        expires_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

// Allow joining the tables if needed
allow_tables_to_appear_in_same_query!(
    accounts,
    referrals,
    task_templates,
    tasks,
);
