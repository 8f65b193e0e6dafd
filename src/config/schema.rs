use crate::error::{ChatdeskError, ConfigError, Result};
use crate::history::pagination::{DEFAULT_CLIENT_FETCH_CAP, DEFAULT_PAGE_SIZE};
use crate::runtime::dispatcher::DEFAULT_MAX_CONCURRENCY;
use crate::runtime::retry::DEFAULT_ATTEMPTS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatdeskConfig {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token handed over by the login flow.
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub view: ViewConfig,
}

fn default_api_url() -> String {
    "http://localhost:3000/api".into()
}

impl Default for ChatdeskConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            api_url: default_api_url(),
            api_token: None,
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_retry_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl FetchConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Rows pulled when search or date filters force client-side paging.
    #[serde(default = "default_client_fetch_cap")]
    pub client_fetch_cap: u32,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_client_fetch_cap() -> u32 {
    DEFAULT_CLIENT_FETCH_CAP
}

fn default_search_debounce_ms() -> u64 {
    300
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            client_fetch_cap: default_client_fetch_cap(),
            search_debounce_ms: default_search_debounce_ms(),
        }
    }
}

impl ViewConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

fn invalid(reason: impl Into<String>) -> ChatdeskError {
    ConfigError::Validation(reason.into()).into()
}

impl ChatdeskConfig {
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_url)
            .map_err(|e| invalid(format!("api_url {:?}: {e}", self.api_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "api_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.fetch.max_concurrency == 0 {
            return Err(invalid(
                String::from("fetch.max_concurrency must be at least 1"),
            ));
        }
        if self.fetch.retry_attempts == 0 {
            return Err(invalid(
                String::from("fetch.retry_attempts must be at least 1"),
            ));
        }
        if self.view.page_size == 0 {
            return Err(invalid(
                String::from("view.page_size must be at least 1"),
            ));
        }
        if self.view.client_fetch_cap < self.view.page_size {
            return Err(invalid(format!(
                "view.client_fetch_cap ({}) must be >= view.page_size ({})",
                self.view.client_fetch_cap, self.view.page_size
            )));
        }
        Ok(())
    }
}
