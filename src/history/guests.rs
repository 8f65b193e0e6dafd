//! Human-readable numbering for anonymous sessions.
//!
//! Numbers are derived from scratch on every session refresh: guest sessions
//! are ordered by their earliest message and numbered `1..=N`. A newly seen
//! session that started earlier than existing ones shifts the numbers of
//! everything after it.

use super::types::{GuestIdentity, Session};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub session: Session,
    pub guest: Option<GuestIdentity>,
}

/// Output of [`resolve_guests`]: numbered guest sessions (ascending by
/// number) followed by non-guest sessions in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestRoster {
    sessions: Vec<ResolvedSession>,
    by_session: HashMap<String, GuestIdentity>,
}

impl GuestRoster {
    pub fn sessions(&self) -> &[ResolvedSession] {
        &self.sessions
    }

    pub fn identity_for(&self, session_id: &str) -> Option<&GuestIdentity> {
        self.by_session.get(session_id)
    }

    /// Guest identities in number order.
    pub fn guests(&self) -> impl Iterator<Item = &GuestIdentity> {
        self.sessions.iter().filter_map(|s| s.guest.as_ref())
    }

    pub fn guest_count(&self) -> usize {
        self.by_session.len()
    }
}

/// Number every guest session by first-message time.
///
/// A guest session with no messages sorts at `now`. Ties keep input order.
pub fn resolve_guests(sessions: Vec<Session>, now: DateTime<Utc>) -> GuestRoster {
    let (mut guests, others): (Vec<Session>, Vec<Session>) =
        sessions.into_iter().partition(Session::is_guest);

    // sort_by_key is stable
    guests.sort_by_key(|s| s.first_timestamp().unwrap_or(now));

    let mut roster = GuestRoster::default();
    for (index, session) in guests.into_iter().enumerate() {
        let number = u32::try_from(index + 1).unwrap_or(u32::MAX);
        let identity = GuestIdentity::new(session.session_id.clone(), number);
        roster
            .by_session
            .entry(session.session_id.clone())
            .or_insert_with(|| identity.clone());
        roster.sessions.push(ResolvedSession {
            session,
            guest: Some(identity),
        });
    }
    roster
        .sessions
        .extend(others.into_iter().map(|session| ResolvedSession {
            session,
            guest: None,
        }));

    tracing::debug!(
        guests = roster.guest_count(),
        total = roster.sessions.len(),
        "Resolved guest identities"
    );
    roster
}
