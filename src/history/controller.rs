//! View-controller for the message-history screen.
//!
//! Every filter, search or page change starts a fetch *cycle*. A cycle gets
//! a token from a monotonically increasing counter and stamps it on each
//! data source it refreshes (messages, contacts, sessions). When a fetch
//! completes, its result is applied only if the source still carries the
//! same token; anything older is dropped. The three sources load
//! independently and fail independently.

use crate::api::{HistoryBackend, IdentifierKind, SessionRecord};
use crate::config::ChatdeskConfig;
use crate::error::Result;
use crate::history::filter::{ContactFilter, DateFilter, FilterState, ServerQuery};
use crate::history::guests::{GuestRoster, resolve_guests};
use crate::history::pagination::{
    PageFetch, PageRequest, PageWindow, PaginationOrchestrator, PagingMode,
};
use crate::history::types::{ContactLists, GuestIdentity, Message, Session};
use crate::runtime::{BoundedDispatcher, Debouncer, ExpiringCache, RetryPolicy};
use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ReferenceKey {
    Contacts,
    Sessions,
}

#[derive(Debug, Clone)]
enum ReferenceData {
    Contacts(ContactLists),
    Sessions(Vec<Session>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DataSource {
    Messages,
    Contacts,
    Sessions,
}

impl DataSource {
    pub const ALL: [DataSource; 3] = [Self::Messages, Self::Contacts, Self::Sessions];
}

/// Per-source lifecycle within a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FetchState {
    Idle,
    Fetching,
    Succeeded,
    /// Retries exhausted. The last good data stays on display.
    Failed(String),
}

#[derive(Debug)]
struct SourceSlot {
    state: FetchState,
    cycle: u64,
}

impl SourceSlot {
    fn idle() -> Self {
        Self {
            state: FetchState::Idle,
            cycle: 0,
        }
    }
}

struct ViewState {
    next_cycle: u64,
    filters: FilterState,
    pager: PaginationOrchestrator,
    messages: SourceSlot,
    contacts: SourceSlot,
    sessions: SourceSlot,
    contact_lists: ContactLists,
    roster: GuestRoster,
}

impl ViewState {
    fn slot_mut(&mut self, source: DataSource) -> &mut SourceSlot {
        match source {
            DataSource::Messages => &mut self.messages,
            DataSource::Contacts => &mut self.contacts,
            DataSource::Sessions => &mut self.sessions,
        }
    }

    fn slot(&self, source: DataSource) -> &SourceSlot {
        match source {
            DataSource::Messages => &self.messages,
            DataSource::Contacts => &self.contacts,
            DataSource::Sessions => &self.sessions,
        }
    }

    /// Open a new cycle for `sources`, superseding whatever they were loading.
    fn start_cycle(&mut self, sources: &[DataSource]) -> u64 {
        self.next_cycle += 1;
        let token = self.next_cycle;
        for source in sources {
            let slot = self.slot_mut(*source);
            slot.cycle = token;
            slot.state = FetchState::Fetching;
        }
        token
    }

    /// Supersede in-flight work without starting any.
    fn invalidate(&mut self) {
        self.next_cycle += 1;
        let token = self.next_cycle;
        for source in DataSource::ALL {
            self.slot_mut(source).cycle = token;
        }
    }

    /// True if `token` is still the latest cycle for `source`; logs the drop otherwise.
    fn accepts(&self, source: DataSource, token: u64) -> bool {
        let current = self.slot(source).cycle;
        if current != token {
            tracing::debug!(%source, stale = token, current, "Discarding superseded result");
            return false;
        }
        true
    }
}

/// A message ready for display, with its guest label when it has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub guest_name: Option<String>,
}

/// Everything the rendering layer consumes.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub messages: Vec<AnnotatedMessage>,
    pub window: PageWindow,
    pub mode: PagingMode,
    pub messages_state: FetchState,
    pub contacts_state: FetchState,
    pub sessions_state: FetchState,
    pub contacts: ContactLists,
    pub guests: Vec<GuestIdentity>,
}

impl HistoryView {
    pub fn state(&self, source: DataSource) -> &FetchState {
        match source {
            DataSource::Messages => &self.messages_state,
            DataSource::Contacts => &self.contacts_state,
            DataSource::Sessions => &self.sessions_state,
        }
    }
}

/// Which page a new cycle loads. `KeepPage` repeats the last request, so a
/// retry after a failed page change asks for that page again.
#[derive(Debug, Clone, Copy)]
enum Restart {
    KeepPage,
    FirstPage,
}

struct Inner {
    backend: Arc<dyn HistoryBackend>,
    dispatcher: BoundedDispatcher,
    cache: ExpiringCache<ReferenceKey, ReferenceData>,
    retry: RetryPolicy,
    debouncer: Debouncer,
    session_fetch_cap: u32,
    state: Mutex<ViewState>,
}

/// Owns every moving part of the history view. Build one per view and call
/// [`shutdown`](Self::shutdown) when the view goes away.
pub struct HistoryController {
    inner: Arc<Inner>,
}

impl HistoryController {
    pub fn new(backend: Arc<dyn HistoryBackend>, config: &ChatdeskConfig) -> Self {
        let state = ViewState {
            next_cycle: 0,
            filters: FilterState::default(),
            pager: PaginationOrchestrator::new(config.view.page_size, config.view.client_fetch_cap),
            messages: SourceSlot::idle(),
            contacts: SourceSlot::idle(),
            sessions: SourceSlot::idle(),
            contact_lists: ContactLists::default(),
            roster: GuestRoster::default(),
        };
        Self {
            inner: Arc::new(Inner {
                backend,
                dispatcher: BoundedDispatcher::new(config.fetch.max_concurrency),
                cache: ExpiringCache::new(config.cache.ttl()),
                retry: RetryPolicy::new(
                    config.fetch.retry_attempts,
                    config.fetch.retry_base_delay(),
                ),
                debouncer: Debouncer::new(config.view.search_debounce()),
                session_fetch_cap: config.view.client_fetch_cap,
                state: Mutex::new(state),
            }),
        }
    }

    /// Run a full cycle: messages, contacts and sessions.
    pub async fn refresh(&self) {
        self.inner.refresh(Restart::KeepPage).await;
    }

    /// Switch the single-select contact filter and go back to page 1.
    pub async fn select_filter(&self, filter: ContactFilter) {
        {
            let mut state = self.inner.state.lock().await;
            state.filters.select(filter);
        }
        self.inner.refresh(Restart::FirstPage).await;
    }

    pub async fn set_include_guests(&self, include: bool) {
        {
            let mut state = self.inner.state.lock().await;
            state.filters.set_include_guests(include);
        }
        self.inner.refresh(Restart::FirstPage).await;
    }

    /// Set or clear the date filter. A reversed range is rejected before
    /// anything is fetched and leaves the current filters untouched.
    pub async fn set_date_filter(&self, date: Option<DateFilter>) -> Result<()> {
        if let Some(filter) = &date {
            filter.validate()?;
        }
        {
            let mut state = self.inner.state.lock().await;
            state.filters.set_date(date);
        }
        self.inner.refresh(Restart::FirstPage).await;
        Ok(())
    }

    /// Replace every filter at once (e.g. restoring a saved view) and run
    /// one cycle from page 1.
    pub async fn replace_filters(&self, filters: FilterState) -> Result<()> {
        if let Some(filter) = filters.date() {
            filter.validate()?;
        }
        {
            let mut state = self.inner.state.lock().await;
            state.filters = filters;
        }
        self.inner.refresh(Restart::FirstPage).await;
        Ok(())
    }

    /// Update the search text. The refetch runs once typing pauses.
    pub async fn set_search(&self, text: impl Into<String>) {
        {
            let mut state = self.inner.state.lock().await;
            state.filters.set_search(text);
        }
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.debouncer.trigger(move || async move {
            if let Some(inner) = weak.upgrade() {
                inner.refresh(Restart::FirstPage).await;
            }
        });
    }

    /// Client-paged views re-slice locally; server-paged views fetch the page.
    pub async fn go_to_page(&self, page: u32) {
        let (token, fetch) = {
            let mut state = self.inner.state.lock().await;
            match state.pager.go_to(page) {
                PageRequest::Local => return,
                PageRequest::Remote(fetch) => {
                    (state.start_cycle(&[DataSource::Messages]), fetch)
                }
            }
        };
        self.inner.load_messages(token, fetch).await;
    }

    /// Manual retry after an error: drop cached reference data and reload
    /// all three sources.
    pub async fn retry(&self) {
        self.inner.cache.clear();
        self.inner.refresh(Restart::KeepPage).await;
    }

    pub async fn filters(&self) -> FilterState {
        self.inner.state.lock().await.filters.clone()
    }

    pub async fn snapshot(&self) -> HistoryView {
        let state = self.inner.state.lock().await;
        let messages = state
            .pager
            .current_page()
            .iter()
            .map(|message| AnnotatedMessage {
                guest_name: message
                    .session_id
                    .as_deref()
                    .and_then(|sid| state.roster.identity_for(sid))
                    .filter(|_| message.is_guest())
                    .map(|identity| identity.display_name.clone()),
                message: message.clone(),
            })
            .collect();
        HistoryView {
            messages,
            window: state.pager.window(),
            mode: state.pager.displayed_mode(),
            messages_state: state.messages.state.clone(),
            contacts_state: state.contacts.state.clone(),
            sessions_state: state.sessions.state.clone(),
            contacts: state.contact_lists.clone(),
            guests: state.roster.guests().cloned().collect(),
        }
    }

    /// Download a conversation transcript as PDF bytes.
    pub async fn export_pdf(&self, kind: IdentifierKind, identifier: &str) -> Result<Vec<u8>> {
        let backend = &self.inner.backend;
        self.inner
            .retry
            .execute("chat-pdf", move || backend.chat_pdf(kind, identifier))
            .await
    }

    /// Tear the view down: supersede in-flight cycles, clear the cache and
    /// stop the dispatcher. Pending debounced searches are cancelled when the
    /// controller is dropped.
    pub async fn shutdown(self) {
        self.inner.state.lock().await.invalidate();
        self.inner.cache.clear();
        self.inner.dispatcher.close();
        tracing::debug!(backend = self.inner.backend.name(), "History view shut down");
    }
}

impl Inner {
    async fn refresh(&self, restart: Restart) {
        let (token, fetch) = {
            let mut state = self.state.lock().await;
            let plan = state.filters.plan();
            let page = match restart {
                Restart::KeepPage => state.pager.requested_page(),
                Restart::FirstPage => 1,
            };
            let fetch = state.pager.begin_cycle(plan, page);
            (state.start_cycle(&DataSource::ALL), fetch)
        };
        tracing::debug!(
            cycle = token,
            page = fetch.page,
            page_size = fetch.query.page_size,
            "Starting fetch cycle"
        );

        tokio::join!(
            self.load_messages(token, fetch),
            self.load_contacts(token),
            self.load_sessions(token),
        );
    }

    /// The page number is committed only if the fetch succeeds.
    async fn load_messages(&self, token: u64, fetch: PageFetch) {
        let query = &fetch.query;
        let backend = &self.backend;
        let result = self
            .retry
            .execute("messages", move || backend.messages(query))
            .await;

        let mut state = self.state.lock().await;
        if !state.accepts(DataSource::Messages, token) {
            return;
        }
        match result {
            Ok(page) => {
                tracing::debug!(
                    cycle = token,
                    rows = page.messages.len(),
                    total_pages = page.total_pages,
                    "Messages loaded"
                );
                state.pager.apply_fetch(page.messages, page.total_pages, fetch.page);
                state.messages.state = FetchState::Succeeded;
            }
            Err(e) => {
                tracing::warn!(cycle = token, "Message fetch failed: {e}");
                state.messages.state = FetchState::Failed(e.to_string());
            }
        }
    }

    async fn load_contacts(&self, token: u64) {
        let result = match self.cache.get(&ReferenceKey::Contacts) {
            Some(ReferenceData::Contacts(lists)) => {
                tracing::debug!("Contacts served from cache");
                Ok(lists)
            }
            _ => {
                let backend = &self.backend;
                let fetched = self
                    .retry
                    .execute("unique-contacts", move || backend.unique_contacts())
                    .await;
                if let Ok(lists) = &fetched {
                    self.cache
                        .set(ReferenceKey::Contacts, ReferenceData::Contacts(lists.clone()));
                }
                fetched
            }
        };

        let mut state = self.state.lock().await;
        if !state.accepts(DataSource::Contacts, token) {
            return;
        }
        match result {
            Ok(lists) => {
                state.contact_lists = lists;
                state.contacts.state = FetchState::Succeeded;
            }
            Err(e) => {
                tracing::warn!(cycle = token, "Contact list fetch failed: {e}");
                state.contacts.state = FetchState::Failed(e.to_string());
            }
        }
    }

    async fn load_sessions(&self, token: u64) {
        let result = match self.cache.get(&ReferenceKey::Sessions) {
            Some(ReferenceData::Sessions(sessions)) => {
                tracing::debug!("Sessions served from cache");
                Ok(sessions)
            }
            _ => self.fetch_sessions().await,
        };

        let result = result.map(|sessions| resolve_guests(sessions, Utc::now()));

        let mut state = self.state.lock().await;
        if !state.accepts(DataSource::Sessions, token) {
            return;
        }
        match result {
            Ok(roster) => {
                state.roster = roster;
                state.sessions.state = FetchState::Succeeded;
            }
            Err(e) => {
                tracing::warn!(cycle = token, "Session fetch failed: {e}");
                state.sessions.state = FetchState::Failed(e.to_string());
            }
        }
    }

    /// Fetch the session list and fill in transcripts the backend left out.
    /// A session whose transcript cannot be fetched is left out of this
    /// cycle, and the partial list is not cached.
    async fn fetch_sessions(&self) -> Result<Vec<Session>> {
        let backend = &self.backend;
        let records = self
            .retry
            .execute("sessions", move || backend.sessions())
            .await?;
        let listed = records.len();

        let resolved = join_all(records.into_iter().map(|record| self.resolve_session(record)))
            .await
            .into_iter()
            .filter_map(|result| match result {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!("Dropping session from this cycle: {e}");
                    None
                }
            })
            .collect::<Vec<_>>();

        if resolved.len() == listed {
            self.cache
                .set(ReferenceKey::Sessions, ReferenceData::Sessions(resolved.clone()));
        }
        Ok(resolved)
    }

    async fn resolve_session(&self, record: SessionRecord) -> Result<Session> {
        let SessionRecord {
            session_id,
            messages,
        } = record;
        if let Some(messages) = messages {
            return Ok(Session::new(session_id, messages));
        }

        let query = ServerQuery::for_session(&session_id, self.session_fetch_cap);
        let query = &query;
        let backend = &self.backend;
        let retry = &self.retry;
        let page = self
            .dispatcher
            .submit(move || {
                retry.execute("session-messages", move || backend.session_messages(query))
            })
            .await?;
        Ok(Session::new(session_id, page.messages))
    }
}
