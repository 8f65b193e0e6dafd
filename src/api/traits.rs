use super::types::{IdentifierKind, MessagePage, SessionRecord};
use crate::error::Result;
use crate::history::filter::ServerQuery;
use crate::history::types::ContactLists;
use std::future::Future;
use std::pin::Pin;

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// The dashboard REST backend, as far as history browsing needs it.
///
/// Implementations return `Ok` with empty data for responses whose shape
/// cannot be understood; `Err` is reserved for transport and HTTP failures,
/// which callers retry.
pub trait HistoryBackend: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn messages<'a>(&'a self, query: &'a ServerQuery) -> BackendFuture<'a, MessagePage>;

    /// Every message of one guest session. Same endpoint as
    /// [`messages`](Self::messages) unless an implementation says otherwise.
    fn session_messages<'a>(&'a self, query: &'a ServerQuery) -> BackendFuture<'a, MessagePage> {
        self.messages(query)
    }

    fn unique_contacts(&self) -> BackendFuture<'_, ContactLists>;

    fn sessions(&self) -> BackendFuture<'_, Vec<SessionRecord>>;

    /// Conversation transcript as PDF bytes, passed through untouched.
    fn chat_pdf<'a>(&'a self, kind: IdentifierKind, identifier: &'a str)
    -> BackendFuture<'a, Vec<u8>>;
}

/// Supplies the bearer credential attached to every request.
///
/// Owned by the authentication layer; the backend never inspects or
/// refreshes the token itself.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A token fixed at construction, e.g. read from config.
#[derive(Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.is_empty()))
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = if self.0.is_some() { "***" } else { "<none>" };
        f.debug_tuple("StaticToken").field(&shown).finish()
    }
}

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}
