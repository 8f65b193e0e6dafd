#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use chatdesk::api::{BackendFuture, HistoryBackend, IdentifierKind, MessagePage, SessionRecord};
use chatdesk::error::{ApiError, ChatdeskError};
use chatdesk::{ChatdeskConfig, HistoryController, Result};
use chatdesk::history::filter::ServerQuery;
use chatdesk::history::pagination::total_pages;
use chatdesk::history::{ContactLists, Message};

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_710_000_000 + secs, 0).unwrap()
}

pub fn guest_msg(id: &str, session: &str, secs: i64) -> Message {
    Message {
        id: id.into(),
        sender: "user".into(),
        content: format!("guest message {id}"),
        timestamp: at(secs),
        contact_email: None,
        contact_phone: None,
        session_id: Some(session.into()),
    }
}

pub fn contact_msg(id: &str, email: &str, secs: i64) -> Message {
    Message {
        id: id.into(),
        sender: "user".into(),
        content: format!("contact message {id}"),
        timestamp: at(secs),
        contact_email: Some(email.into()),
        contact_phone: None,
        session_id: Some(format!("s-{email}")),
    }
}

/// 60 contact messages, a minute apart; the first `matches` mention a
/// refund in mixed case.
pub fn refund_universe(matches: i64) -> Vec<Message> {
    (0..60_i64)
        .map(|i| {
            let mut message = contact_msg(&format!("m{i:02}"), "ana@example.com", i * 60);
            if i < matches {
                message.content = format!("Where is my ReFund? ({i})");
            }
            message
        })
        .collect()
}

pub fn controller_for(backend: &Arc<FakeBackend>) -> HistoryController {
    HistoryController::new(backend.clone(), &ChatdeskConfig::default())
}

/// Let debounced work and retry backoff run to completion on a paused clock.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(10)).await;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Messages,
    Contacts,
    Sessions,
}

/// Scripted in-memory backend. Applies server filters and paging to a fixed
/// message universe, records page queries and transcript lookups separately,
/// and can be told to fail or stall upcoming calls.
pub struct FakeBackend {
    universe: Vec<Message>,
    contacts: ContactLists,
    sessions: Vec<SessionRecord>,
    transcript_delay: Duration,
    queries: Mutex<Vec<ServerQuery>>,
    transcripts: Mutex<Vec<String>>,
    contact_calls: AtomicUsize,
    session_list_calls: AtomicUsize,
    failures: Mutex<HashMap<Endpoint, u32>>,
    broken_sessions: Mutex<HashSet<String>>,
    page_delays: Mutex<VecDeque<Duration>>,
    transcripts_in_flight: AtomicUsize,
    transcripts_peak: AtomicUsize,
}

impl FakeBackend {
    pub fn new(universe: Vec<Message>) -> Self {
        Self {
            universe,
            contacts: ContactLists::default(),
            sessions: Vec::new(),
            transcript_delay: Duration::ZERO,
            queries: Mutex::new(Vec::new()),
            transcripts: Mutex::new(Vec::new()),
            contact_calls: AtomicUsize::new(0),
            session_list_calls: AtomicUsize::new(0),
            failures: Mutex::new(HashMap::new()),
            broken_sessions: Mutex::new(HashSet::new()),
            page_delays: Mutex::new(VecDeque::new()),
            transcripts_in_flight: AtomicUsize::new(0),
            transcripts_peak: AtomicUsize::new(0),
        }
    }

    pub fn with_contacts(mut self, emails: &[&str], phones: &[&str]) -> Self {
        self.contacts = ContactLists {
            emails: emails.iter().map(ToString::to_string).collect(),
            phone_numbers: phones.iter().map(ToString::to_string).collect(),
        };
        self
    }

    pub fn with_sessions(mut self, sessions: Vec<SessionRecord>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_transcript_delay(mut self, delay: Duration) -> Self {
        self.transcript_delay = delay;
        self
    }

    pub fn fail_next(&self, endpoint: Endpoint, times: u32) {
        self.failures.lock().unwrap().insert(endpoint, times);
    }

    pub fn break_session(&self, session_id: &str) {
        self.broken_sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string());
    }

    /// Stall the next page request (not transcript requests) for `delay`.
    pub fn delay_next_page(&self, delay: Duration) {
        self.page_delays.lock().unwrap().push_back(delay);
    }

    /// Messages queries issued for the history list itself.
    pub fn page_queries(&self) -> Vec<ServerQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// Session ids whose transcripts were requested, in call order.
    pub fn transcript_queries(&self) -> Vec<String> {
        self.transcripts.lock().unwrap().clone()
    }

    pub fn contact_calls(&self) -> usize {
        self.contact_calls.load(Ordering::SeqCst)
    }

    pub fn session_list_calls(&self) -> usize {
        self.session_list_calls.load(Ordering::SeqCst)
    }

    pub fn peak_transcript_fetches(&self) -> usize {
        self.transcripts_peak.load(Ordering::SeqCst)
    }

    fn take_failure(&self, endpoint: Endpoint) -> Option<ChatdeskError> {
        let mut failures = self.failures.lock().unwrap();
        let remaining = failures.get_mut(&endpoint)?;
        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;
        Some(
            ApiError::Status {
                endpoint: format!("{endpoint:?}").to_lowercase(),
                status: 503,
            }
            .into(),
        )
    }

    fn select(&self, query: &ServerQuery) -> MessagePage {
        let filters = &query.filters;
        let matching: Vec<Message> = self
            .universe
            .iter()
            .filter(|m| {
                filters
                    .email
                    .as_ref()
                    .is_none_or(|e| m.contact_email.as_ref() == Some(e))
            })
            .filter(|m| {
                filters
                    .phone
                    .as_ref()
                    .is_none_or(|p| m.contact_phone.as_ref() == Some(p))
            })
            .filter(|m| filters.is_guest.is_none_or(|g| m.is_guest() == g))
            .filter(|m| {
                filters
                    .session_id
                    .as_ref()
                    .is_none_or(|s| m.session_id.as_ref() == Some(s))
            })
            .cloned()
            .collect();

        let size = usize::try_from(query.page_size).unwrap();
        let start = usize::try_from(query.page - 1).unwrap() * size;
        MessagePage {
            total_pages: total_pages(matching.len(), query.page_size),
            messages: matching.into_iter().skip(start).take(size).collect(),
        }
    }

    async fn transcript(&self, query: &ServerQuery, session_id: &str) -> Result<MessagePage> {
        let now = self.transcripts_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.transcripts_peak.fetch_max(now, Ordering::SeqCst);
        if !self.transcript_delay.is_zero() {
            tokio::time::sleep(self.transcript_delay).await;
        }
        self.transcripts_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.broken_sessions.lock().unwrap().contains(session_id) {
            return Err(ApiError::Request {
                endpoint: "messages".into(),
                message: format!("connection reset while loading {session_id}"),
            }
            .into());
        }
        Ok(self.select(query))
    }
}

impl HistoryBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn messages<'a>(&'a self, query: &'a ServerQuery) -> BackendFuture<'a, MessagePage> {
        Box::pin(async move {
            self.queries.lock().unwrap().push(query.clone());
            let delay = self.page_delays.lock().unwrap().pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(err) = self.take_failure(Endpoint::Messages) {
                return Err(err);
            }
            Ok(self.select(query))
        })
    }

    fn session_messages<'a>(&'a self, query: &'a ServerQuery) -> BackendFuture<'a, MessagePage> {
        Box::pin(async move {
            let session_id = query.filters.session_id.clone().unwrap_or_default();
            self.transcripts.lock().unwrap().push(session_id.clone());
            self.transcript(query, &session_id).await
        })
    }

    fn unique_contacts(&self) -> BackendFuture<'_, ContactLists> {
        Box::pin(async move {
            self.contact_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.take_failure(Endpoint::Contacts) {
                return Err(err);
            }
            Ok(self.contacts.clone())
        })
    }

    fn sessions(&self) -> BackendFuture<'_, Vec<SessionRecord>> {
        Box::pin(async move {
            self.session_list_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.take_failure(Endpoint::Sessions) {
                return Err(err);
            }
            Ok(self.sessions.clone())
        })
    }

    fn chat_pdf<'a>(
        &'a self,
        kind: IdentifierKind,
        identifier: &'a str,
    ) -> BackendFuture<'a, Vec<u8>> {
        Box::pin(async move { Ok(format!("%PDF-1.4 {kind}:{identifier}").into_bytes()) })
    }
}
