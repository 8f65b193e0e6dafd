//! Concurrency and resilience primitives shared by the fetch layer.

pub mod cache;
pub mod debounce;
pub mod dispatcher;
pub mod retry;

pub use cache::ExpiringCache;
pub use debounce::Debouncer;
pub use dispatcher::BoundedDispatcher;
pub use retry::RetryPolicy;
