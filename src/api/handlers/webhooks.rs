// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use crate::api::routes::error_response;
use crate::api::AppState;
use crate::events::{
    self, WebhookError, EVENT_ACCOUNT_CREATED, EVENT_ACCOUNT_DELETED, EVENT_ACCOUNT_UPDATED,
};

const HEADER_MESSAGE_ID: &str = "webhook-id";
const HEADER_TIMESTAMP: &str = "webhook-timestamp";
const HEADER_SIGNATURE: &str = "webhook-signature";

fn require_header<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}

/// Identity provider lifecycle webhook. The signature is verified before
/// any part of the payload is trusted.
pub async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let verified = (|| {
        let message_id = require_header(&headers, HEADER_MESSAGE_ID)?;
        let timestamp = require_header(&headers, HEADER_TIMESTAMP)?;
        let signature = require_header(&headers, HEADER_SIGNATURE)?;

        events::verify_signature(
            &state.webhook.signing_secret,
            message_id,
            timestamp,
            signature,
            &body,
            state.webhook.tolerance_secs,
        )
    })();

    if let Err(e) = verified {
        warn!("Rejected identity webhook: {}", e);
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "webhook verification failed" })),
        )
            .into_response();
    }

    let event = match events::parse_event(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Unparseable identity webhook: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "malformed webhook payload" })),
            )
                .into_response();
        }
    };

    info!(
        "Processing identity event {} for {}",
        event.event_type, event.data.id
    );

    let outcome = match event.event_type.as_str() {
        EVENT_ACCOUNT_CREATED | EVENT_ACCOUNT_UPDATED => {
            let profile = event.data.into_profile();
            match state.directory.upsert(&profile).await {
                Ok(result) => {
                    // Supplying a phone number is what completes the
                    // referred side of a pending referral.
                    if result.phone_newly_set {
                        if let Err(e) =
                            state.referral.complete_referral_for(&result.account.id).await
                        {
                            warn!(
                                "Could not complete referral for {}: {}",
                                result.account.id, e
                            );
                        }
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        EVENT_ACCOUNT_DELETED => state.directory.delete(&event.data.id).await.map(|_| ()),
        other => {
            // Unknown event types are acknowledged so the provider does
            // not retry them forever.
            info!("Ignoring unhandled identity event type {}", other);
            Ok(())
        }
    };

    match outcome {
        Ok(()) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
