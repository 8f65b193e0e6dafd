use super::traits::{BackendFuture, HistoryBackend, TokenSource};
use super::types::{
    IdentifierKind, MessagePage, SessionRecord, decode_contacts, decode_message_page,
    decode_sessions,
};
use crate::error::{ApiError, Result};
use crate::history::filter::ServerQuery;
use crate::history::types::ContactLists;
use reqwest::{Client, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

fn build_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(8)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// [`HistoryBackend`] over the dashboard's REST API.
pub struct HttpHistoryBackend {
    /// Pre-computed endpoint URLs (avoids `format!` per request).
    messages_url: String,
    contacts_url: String,
    sessions_url: String,
    pdf_url: String,
    tokens: Arc<dyn TokenSource>,
    client: Client,
}

impl HttpHistoryBackend {
    pub fn new(api_url: &str, tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_timeout(api_url, tokens, DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    pub fn with_timeout(api_url: &str, tokens: Arc<dyn TokenSource>, timeout_secs: u64) -> Self {
        let base = api_url.trim_end_matches('/');
        Self {
            messages_url: format!("{base}/messages"),
            contacts_url: format!("{base}/messages/unique-contacts"),
            sessions_url: format!("{base}/messages/sessions"),
            pdf_url: format!("{base}/messages/pdf"),
            tokens,
            client: build_client(timeout_secs),
        }
    }

    async fn get(
        &self,
        endpoint: &'static str,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<Response> {
        let mut request = self.client.get(url).query(query);
        if let Some(token) = self.tokens.bearer_token() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| ApiError::Request {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        Ok(response)
    }

    /// GET and parse as JSON. A body that is not JSON decodes as `Null`.
    async fn get_json(
        &self,
        endpoint: &'static str,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<Value> {
        let body = self
            .get(endpoint, url, query)
            .await?
            .text()
            .await
            .map_err(|e| ApiError::Request {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;
        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            tracing::warn!(endpoint, "Response is not JSON ({e}); treating as empty");
            Value::Null
        }))
    }
}

impl HistoryBackend for HttpHistoryBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn messages<'a>(&'a self, query: &'a ServerQuery) -> BackendFuture<'a, MessagePage> {
        Box::pin(async move {
            let body = self
                .get_json("messages", &self.messages_url, &query.query_pairs())
                .await?;
            Ok(decode_message_page(&body))
        })
    }

    fn unique_contacts(&self) -> BackendFuture<'_, ContactLists> {
        Box::pin(async move {
            let body = self
                .get_json("unique-contacts", &self.contacts_url, &[])
                .await?;
            Ok(decode_contacts(&body))
        })
    }

    fn sessions(&self) -> BackendFuture<'_, Vec<SessionRecord>> {
        Box::pin(async move {
            let body = self.get_json("sessions", &self.sessions_url, &[]).await?;
            Ok(decode_sessions(&body))
        })
    }

    fn chat_pdf<'a>(
        &'a self,
        kind: IdentifierKind,
        identifier: &'a str,
    ) -> BackendFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let query = [("type", kind.to_string()), ("value", identifier.to_string())];
            let bytes = self
                .get("chat-pdf", &self.pdf_url, &query)
                .await?
                .bytes()
                .await
                .map_err(|e| ApiError::Request {
                    endpoint: "chat-pdf".to_string(),
                    message: e.to_string(),
                })?;
            Ok(bytes.to_vec())
        })
    }
}
