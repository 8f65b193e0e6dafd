use super::filter::{ClientPredicate, FilterPlan, ServerFilters, ServerQuery};
use super::types::Message;
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Upper bound on rows pulled for client-side filtering. Anything beyond it
/// is never seen by search or date filters.
pub const DEFAULT_CLIENT_FETCH_CAP: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PagingMode {
    /// The backend filters and pages.
    ServerPaged,
    /// Fetch once (capped), filter and slice locally.
    ClientPaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page_number: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// `ceil(count / page_size)`, never below 1.
pub fn total_pages(count: usize, page_size: u32) -> u32 {
    let size = usize::try_from(page_size.max(1)).unwrap_or(usize::MAX);
    u32::try_from(count.div_ceil(size)).unwrap_or(u32::MAX).max(1)
}

/// A fetch for one page of the current filters. `page` becomes the
/// displayed page only once the fetch succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFetch {
    pub query: ServerQuery,
    pub page: u32,
}

/// What a page change needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// Already-fetched rows were re-sliced; nothing to fetch.
    Local,
    Remote(PageFetch),
}

/// Filters a client-paged result set was fetched and filtered with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RowSource {
    server: ServerFilters,
    predicate: Option<ClientPredicate>,
}

/// Rows from the last successful fetch.
#[derive(Debug, Clone)]
enum Rows {
    Server {
        page: Vec<Message>,
        total_pages: u32,
    },
    Client {
        filtered: Vec<Message>,
        source: RowSource,
    },
}

/// Decides between server-driven and client-driven paging and holds the
/// rows currently on display.
///
/// Mode follows the latest [`FilterPlan`]. Displayed rows, the page number
/// and the page window only change when a fetch succeeds, so a failed fetch
/// leaves the previous page visible and correctly labelled.
#[derive(Debug, Clone)]
pub struct PaginationOrchestrator {
    mode: PagingMode,
    page: u32,
    requested: u32,
    page_size: u32,
    client_cap: u32,
    server_filters: ServerFilters,
    predicate: Option<ClientPredicate>,
    rows: Rows,
}

impl PaginationOrchestrator {
    pub fn new(page_size: u32, client_cap: u32) -> Self {
        let page_size = page_size.max(1);
        Self {
            mode: PagingMode::ServerPaged,
            page: 1,
            requested: 1,
            page_size,
            client_cap: client_cap.max(page_size),
            server_filters: ServerFilters::default(),
            predicate: None,
            rows: Rows::Server {
                page: Vec::new(),
                total_pages: 1,
            },
        }
    }

    /// Mode the next fetch will use.
    pub fn mode(&self) -> PagingMode {
        self.mode
    }

    /// Mode the rows on display were paged with.
    pub fn displayed_mode(&self) -> PagingMode {
        match self.rows {
            Rows::Server { .. } => PagingMode::ServerPaged,
            Rows::Client { .. } => PagingMode::ClientPaged,
        }
    }

    /// Page on display.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Page the latest fetch or page change asked for. Equals [`page`](Self::page)
    /// once that fetch lands.
    pub fn requested_page(&self) -> u32 {
        self.requested
    }

    /// Adopt a new filter plan and return the fetch that loads `page` of it.
    pub fn begin_cycle(&mut self, plan: FilterPlan, page: u32) -> PageFetch {
        let mode = if plan.requires_client_paging() {
            PagingMode::ClientPaged
        } else {
            PagingMode::ServerPaged
        };
        if mode != self.mode {
            tracing::debug!(from = ?self.mode, to = ?mode, "Paging mode changed");
        }
        self.mode = mode;
        self.server_filters = plan.server;
        self.predicate = plan.client;
        self.requested = page.max(1);
        self.fetch(self.requested)
    }

    fn fetch(&self, page: u32) -> PageFetch {
        let page = page.max(1);
        let query = match self.mode {
            PagingMode::ServerPaged => {
                ServerQuery::new(self.server_filters.clone(), page, self.page_size)
            }
            PagingMode::ClientPaged => {
                ServerQuery::new(self.server_filters.clone(), 1, self.client_cap)
            }
        };
        PageFetch { query, page }
    }

    fn current_source(&self) -> RowSource {
        RowSource {
            server: self.server_filters.clone(),
            predicate: self.predicate.clone(),
        }
    }

    /// Move to `page` (clamped to the known range). Re-slices locally only
    /// when the displayed rows were filtered with the current filters.
    pub fn go_to(&mut self, page: u32) -> PageRequest {
        let target = page.clamp(1, self.window().total_pages);
        self.requested = target;
        if self.mode == PagingMode::ClientPaged
            && let Rows::Client { source, .. } = &self.rows
            && *source == self.current_source()
        {
            self.page = target;
            return PageRequest::Local;
        }
        PageRequest::Remote(self.fetch(target))
    }

    /// Commit a successful fetch of `page`. In client mode `messages` is
    /// the oversized result set and is filtered here.
    pub fn apply_fetch(&mut self, messages: Vec<Message>, server_total_pages: u32, page: u32) {
        match self.mode {
            PagingMode::ServerPaged => {
                self.rows = Rows::Server {
                    page: messages,
                    total_pages: server_total_pages.max(1),
                };
            }
            PagingMode::ClientPaged => {
                let fetched = messages.len();
                let filtered: Vec<Message> = match &self.predicate {
                    Some(predicate) => messages
                        .into_iter()
                        .filter(|m| predicate.matches(m))
                        .collect(),
                    None => messages,
                };
                if u32::try_from(fetched).is_ok_and(|n| n >= self.client_cap) {
                    tracing::warn!(
                        cap = self.client_cap,
                        "Client-side filter hit the fetch cap; older messages are not searched"
                    );
                }
                self.rows = Rows::Client {
                    filtered,
                    source: self.current_source(),
                };
            }
        }
        self.page = page.clamp(1, self.window().total_pages);
    }

    /// Rows on the current page.
    pub fn current_page(&self) -> &[Message] {
        match &self.rows {
            Rows::Server { page, .. } => page,
            Rows::Client { filtered, .. } => {
                let size = usize::try_from(self.page_size).unwrap_or(usize::MAX);
                let index = usize::try_from(self.page.saturating_sub(1)).unwrap_or(0);
                let start = index.saturating_mul(size).min(filtered.len());
                let end = start.saturating_add(size).min(filtered.len());
                &filtered[start..end]
            }
        }
    }

    /// Size of the client-filtered set, if the displayed rows are client-paged.
    pub fn filtered_count(&self) -> Option<usize> {
        match &self.rows {
            Rows::Client { filtered, .. } => Some(filtered.len()),
            Rows::Server { .. } => None,
        }
    }

    pub fn window(&self) -> PageWindow {
        let pages = match &self.rows {
            Rows::Server { total_pages, .. } => *total_pages,
            Rows::Client { filtered, .. } => total_pages(filtered.len(), self.page_size),
        };
        PageWindow {
            page_number: self.page,
            page_size: self.page_size,
            total_pages: pages,
        }
    }
}

impl Default for PaginationOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_CLIENT_FETCH_CAP)
    }
}
