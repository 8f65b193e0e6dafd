use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chat message as returned by the backend. Never mutated after fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

impl Message {
    /// No email, no phone, but a session id. Blank strings count as absent.
    pub fn is_guest(&self) -> bool {
        !present(self.contact_email.as_deref())
            && !present(self.contact_phone.as_deref())
            && present(self.session_id.as_deref())
    }
}

/// Messages sharing one session id, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    messages: Vec<Message>,
}

impl Session {
    /// Stable-sorts `messages` by timestamp.
    pub fn new(session_id: impl Into<String>, mut messages: Vec<Message>) -> Self {
        messages.sort_by_key(|m| m.timestamp);
        Self {
            session_id: session_id.into(),
            messages,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_guest(&self) -> bool {
        self.messages.iter().any(Message::is_guest)
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.messages.first().map(|m| m.timestamp)
    }
}

/// Stable label for an anonymous session, e.g. "Guest 3".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestIdentity {
    pub session_id: String,
    pub guest_number: u32,
    pub display_name: String,
}

impl GuestIdentity {
    pub fn new(session_id: impl Into<String>, guest_number: u32) -> Self {
        Self {
            session_id: session_id.into(),
            guest_number,
            display_name: format!("Guest {guest_number}"),
        }
    }
}

/// Distinct contact identifiers known to the backend, used to populate filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactLists {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
}
