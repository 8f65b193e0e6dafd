use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `chatdesk`.
///
/// Each subsystem defines its own error variant. The view-controller turns
/// these into per-source failure states; the binary reports them through
/// `anyhow` context chains.
#[derive(Debug, Error)]
pub enum ChatdeskError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Backend API ─────────────────────────────────────────────────────
    #[error("api: {0}")]
    Api(#[from] ApiError),

    // ── Client-side filter validation ───────────────────────────────────
    #[error("filter: {0}")]
    Filter(#[from] FilterError),

    // ── Dispatcher ──────────────────────────────────────────────────────
    #[error("dispatcher closed; task was not started")]
    DispatcherClosed,

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Backend API errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{endpoint} request failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
}

// ─── Filter validation errors ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("date range start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("invalid date {0:?}; expected YYYY-MM-DD")]
    InvalidDate(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, ChatdeskError>;
