// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

pub mod accounts;
pub mod health;
pub mod metrics;
pub mod referrals;
pub mod tasks;
pub mod webhooks;
