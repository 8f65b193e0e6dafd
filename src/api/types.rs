//! Wire envelopes for the history endpoints.
//!
//! Decoding is deliberately forgiving: a missing or mistyped field becomes
//! empty data with a warning, and one bad message does not discard its
//! neighbours.

use crate::history::types::{ContactLists, Message};
use serde::Deserialize;
use serde_json::Value;

/// One page from `GET messages`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total_pages: u32,
}

/// One entry from `GET sessions`. `messages` is `None` when the backend
/// listed the session without its transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: String,
    pub messages: Option<Vec<Message>>,
}

/// What a transcript export is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum IdentifierKind {
    Email,
    Phone,
    Session,
}

fn decode_messages(endpoint: &str, value: Option<&Value>) -> Vec<Message> {
    let Some(Value::Array(items)) = value else {
        if value.is_some_and(|v| !v.is_null()) {
            tracing::warn!(endpoint, "Expected a message array; treating as empty");
        }
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match Message::deserialize(item) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!(endpoint, "Skipping malformed message: {e}");
                None
            }
        })
        .collect()
}

pub fn decode_message_page(body: &Value) -> MessagePage {
    let messages = match body.get("messages") {
        None => {
            tracing::warn!(endpoint = "messages", "Response has no `messages` field");
            Vec::new()
        }
        field => decode_messages("messages", field),
    };
    let total_pages = body
        .get("totalPages")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(1)
        .max(1);
    MessagePage {
        messages,
        total_pages,
    }
}

pub fn decode_contacts(body: &Value) -> ContactLists {
    fn strings(body: &Value, field: &str) -> Vec<String> {
        match body.get(field) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(ToString::to_string)
                .collect(),
            _ => {
                tracing::warn!(endpoint = "unique-contacts", field, "Missing contact list");
                Vec::new()
            }
        }
    }
    ContactLists {
        emails: strings(body, "emails"),
        phone_numbers: strings(body, "phoneNumbers"),
    }
}

pub fn decode_sessions(body: &Value) -> Vec<SessionRecord> {
    let Some(Value::Array(items)) = body.get("sessions") else {
        tracing::warn!(endpoint = "sessions", "Response has no `sessions` array");
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let Some(session_id) = item
                .get("sessionId")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
            else {
                tracing::warn!(endpoint = "sessions", "Skipping session without id");
                return None;
            };
            let messages = match item.get("messages") {
                None | Some(Value::Null) => None,
                field => Some(decode_messages("sessions", field)),
            };
            Some(SessionRecord {
                session_id: session_id.to_string(),
                messages,
            })
        })
        .collect()
}
