mod env_overrides;
mod loader;
pub mod schema;

pub use schema::{CacheConfig, ChatdeskConfig, FetchConfig, ViewConfig};
