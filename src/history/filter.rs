//! Filter composition and the server/client split.
//!
//! The backend can filter by contact email, contact phone, guest flag and
//! session id. Free-text search and date filters only exist client-side;
//! when either is active the caller must fetch a capped oversized page and
//! filter and paginate locally.

use super::types::Message;
use crate::error::FilterError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Single-select contact filter. Picking one replaces the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContactFilter {
    #[default]
    All,
    Email(String),
    Phone(String),
    /// Every guest conversation.
    Guests,
    /// One guest conversation, by session id.
    Guest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    Day(NaiveDate),
    /// Inclusive on both ends; `end` covers its whole day.
    Range { start: NaiveDate, end: NaiveDate },
}

impl DateFilter {
    pub fn range(start: NaiveDate, end: NaiveDate) -> Result<Self, FilterError> {
        let filter = Self::Range { start, end };
        filter.validate()?;
        Ok(filter)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        match *self {
            Self::Range { start, end } if start > end => Err(FilterError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn parse_day(raw: &str) -> Result<NaiveDate, FilterError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| FilterError::InvalidDate(raw.to_string()))
    }

    /// First and last instant (UTC) the filter admits.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let (start, end) = match *self {
            Self::Day(day) => (day, day),
            Self::Range { start, end } => (start, end),
        };
        let last_instant =
            NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
        (
            start.and_time(NaiveTime::MIN).and_utc(),
            end.and_time(last_instant).and_utc(),
        )
    }

    pub fn admits(&self, timestamp: DateTime<Utc>) -> bool {
        let (from, to) = self.bounds();
        from <= timestamp && timestamp <= to
    }
}

/// Everything the user can narrow the history view by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    contact: ContactFilter,
    search: String,
    date: Option<DateFilter>,
    include_guests: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            contact: ContactFilter::All,
            search: String::new(),
            date: None,
            include_guests: true,
        }
    }
}

impl FilterState {
    pub fn contact(&self) -> &ContactFilter {
        &self.contact
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn date(&self) -> Option<DateFilter> {
        self.date
    }

    pub fn include_guests(&self) -> bool {
        self.include_guests
    }

    pub fn select(&mut self, contact: ContactFilter) {
        self.contact = contact;
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }

    pub fn set_date(&mut self, date: Option<DateFilter>) {
        self.date = date;
    }

    pub fn set_include_guests(&mut self, include: bool) {
        self.include_guests = include;
    }

    /// Split the active filters into what the backend applies and what
    /// has to run locally.
    pub fn plan(&self) -> FilterPlan {
        let mut server = ServerFilters::default();
        match &self.contact {
            ContactFilter::All => {
                if !self.include_guests {
                    server.is_guest = Some(false);
                }
            }
            ContactFilter::Email(email) => server.email = Some(email.clone()),
            ContactFilter::Phone(phone) => server.phone = Some(phone.clone()),
            ContactFilter::Guests => server.is_guest = Some(true),
            ContactFilter::Guest(session_id) => server.session_id = Some(session_id.clone()),
        }

        let needle = self.search.trim();
        let client = ClientPredicate {
            needle: (!needle.is_empty()).then(|| needle.to_lowercase()),
            date: self.date,
        };

        FilterPlan {
            server,
            client: (!client.is_empty()).then_some(client),
        }
    }
}

/// Filters the messages endpoint understands natively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerFilters {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_guest: Option<bool>,
    pub session_id: Option<String>,
}

/// A fully-specified request to the messages endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerQuery {
    pub filters: ServerFilters,
    pub page: u32,
    pub page_size: u32,
}

impl ServerQuery {
    pub fn new(filters: ServerFilters, page: u32, page_size: u32) -> Self {
        Self {
            filters,
            page: page.max(1),
            page_size,
        }
    }

    /// All messages of one session in a single request.
    pub fn for_session(session_id: &str, cap: u32) -> Self {
        Self::new(
            ServerFilters {
                session_id: Some(session_id.to_string()),
                ..ServerFilters::default()
            },
            1,
            cap,
        )
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.page_size.to_string()),
        ];
        if let Some(email) = &self.filters.email {
            pairs.push(("email", email.clone()));
        }
        if let Some(phone) = &self.filters.phone {
            pairs.push(("phone", phone.clone()));
        }
        if let Some(is_guest) = self.filters.is_guest {
            pairs.push(("isGuest", is_guest.to_string()));
        }
        if let Some(session_id) = &self.filters.session_id {
            pairs.push(("sessionId", session_id.clone()));
        }
        pairs
    }
}

/// Filters evaluated on already-fetched messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientPredicate {
    needle: Option<String>,
    date: Option<DateFilter>,
}

impl ClientPredicate {
    pub fn is_empty(&self) -> bool {
        self.needle.is_none() && self.date.is_none()
    }

    pub fn matches(&self, message: &Message) -> bool {
        let text_ok = self
            .needle
            .as_ref()
            .is_none_or(|needle| message.content.to_lowercase().contains(needle.as_str()));
        let date_ok = self.date.is_none_or(|date| date.admits(message.timestamp));
        text_ok && date_ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPlan {
    pub server: ServerFilters,
    pub client: Option<ClientPredicate>,
}

impl FilterPlan {
    /// Search or date filtering forces fetch-all-then-slice paging.
    pub fn requires_client_paging(&self) -> bool {
        self.client.is_some()
    }
}
