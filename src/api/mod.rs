pub mod client;
pub mod traits;
pub mod types;

pub use client::HttpHistoryBackend;
pub use traits::{BackendFuture, HistoryBackend, StaticToken, TokenSource};
pub use types::{IdentifierKind, MessagePage, SessionRecord};
