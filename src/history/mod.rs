pub mod controller;
pub mod filter;
pub mod guests;
pub mod pagination;
pub mod types;

pub use controller::{AnnotatedMessage, DataSource, FetchState, HistoryController, HistoryView};
pub use filter::{ContactFilter, DateFilter, FilterState};
pub use guests::{GuestRoster, resolve_guests};
pub use pagination::{PageWindow, PagingMode};
pub use types::{ContactLists, GuestIdentity, Message, Session};
