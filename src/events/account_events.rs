// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

pub const EVENT_ACCOUNT_CREATED: &str = "user.created";
pub const EVENT_ACCOUNT_UPDATED: &str = "user.updated";
pub const EVENT_ACCOUNT_DELETED: &str = "user.deleted";

/// Envelope delivered by the identity provider's webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: AccountEventData,
}

/// Profile payload carried by account lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEventData {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Normalized profile shape shared by the webhook path and the client's
/// post-authentication sync call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl AccountEventData {
    /// Convert the event payload into the normalized profile shape.
    pub fn into_profile(&self) -> AccountProfile {
        let full_name = match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        };

        AccountProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            full_name,
            avatar_url: self.avatar_url.clone(),
            phone_number: self.phone_number.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_available_parts() {
        let data = AccountEventData {
            id: "user_1".to_string(),
            email: Some("amina@example.com".to_string()),
            first_name: Some("Amina".to_string()),
            last_name: Some("Odhiambo".to_string()),
            avatar_url: None,
            phone_number: None,
        };
        assert_eq!(
            data.into_profile().full_name,
            Some("Amina Odhiambo".to_string())
        );

        let partial = AccountEventData {
            last_name: None,
            ..data.clone()
        };
        assert_eq!(partial.into_profile().full_name, Some("Amina".to_string()));
    }

    #[test]
    fn event_envelope_parses_provider_payload() {
        let payload = serde_json::json!({
            "type": "user.created",
            "data": {
                "id": "user_29w8",
                "email": "amina@example.com",
                "first_name": "Amina",
                "phone_number": "+254700000001"
            }
        });

        let event: AccountEvent = serde_json::from_value(payload).expect("parse event");
        assert_eq!(event.event_type, EVENT_ACCOUNT_CREATED);
        assert_eq!(event.data.id, "user_29w8");
        assert_eq!(event.data.last_name, None);
    }
}
