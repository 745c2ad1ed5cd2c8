// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec,
};

/// Attribution outcomes, labeled by reason ("applied", "invalid_code",
/// "self_referral", "already_attributed").
pub static ATTRIBUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rafiki_attributions_total",
        "Referral attribution attempts by outcome",
        &["outcome"]
    )
    .expect("register rafiki_attributions_total")
});

pub static CODES_ISSUED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "rafiki_referral_codes_issued_total",
        "Referral codes generated for accounts"
    )
    .expect("register rafiki_referral_codes_issued_total")
});

pub static TASKS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "rafiki_tasks_completed_total",
        "Tasks transitioned to completed"
    )
    .expect("register rafiki_tasks_completed_total")
});

pub static POINTS_AWARDED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "rafiki_points_awarded_total",
        "Points credited through task completion and referrals"
    )
    .expect("register rafiki_points_awarded_total")
});

/// Render the default registry in the Prometheus text format.
pub fn gather() -> Result<String, prometheus::Error> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("metrics output was not UTF-8: {}", e)))
}
