use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatdesk::api::{HistoryBackend, HttpHistoryBackend, IdentifierKind, StaticToken};
use chatdesk::error::ApiError;
use chatdesk::history::filter::{ServerFilters, ServerQuery};
use chatdesk::history::FetchState;
use chatdesk::{ChatdeskConfig, ChatdeskError, HistoryController};

fn backend(server: &MockServer, token: Option<&str>) -> HttpHistoryBackend {
    HttpHistoryBackend::new(
        &format!("{}/api", server.uri()),
        Arc::new(StaticToken::new(token.map(ToString::to_string))),
    )
}

fn message(id: &str, session: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "sender": "user",
        "content": "Where is my refund?",
        "timestamp": "2024-03-10T10:00:00Z",
        "contactEmail": "ana@example.com",
        "sessionId": session
    })
}

#[tokio::test]
async fn messages_request_sends_bearer_and_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/messages"))
        .and(header("authorization", "Bearer t0k"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "20"))
        .and(query_param("email", "ana@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [message("m1", "s1"), message("m2", "s1")],
            "totalPages": 4
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ServerQuery::new(
        ServerFilters {
            email: Some("ana@example.com".into()),
            ..ServerFilters::default()
        },
        2,
        20,
    );
    let page = backend(&server, Some("t0k")).messages(&query).await.unwrap();

    assert_eq!(page.total_pages, 4);
    assert_eq!(page.messages.len(), 2);
    assert_eq!(page.messages[0].id, "m1");
    assert_eq!(
        page.messages[0].contact_email.as_deref(),
        Some("ana@example.com")
    );
    server.verify().await;
}

#[tokio::test]
async fn missing_token_sends_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/messages/unique-contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "emails": ["ana@example.com", ""],
            "phoneNumbers": ["+15550100"]
        })))
        .mount(&server)
        .await;

    let contacts = backend(&server, None).unique_contacts().await.unwrap();
    assert_eq!(contacts.emails, ["ana@example.com"]);
    assert_eq!(contacts.phone_numbers, ["+15550100"]);

    let received = server
        .received_requests()
        .await
        .expect("mock server should record received requests");
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn non_json_body_decodes_as_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let query = ServerQuery::new(ServerFilters::default(), 1, 20);
    let page = backend(&server, None).messages(&query).await.unwrap();
    assert!(page.messages.is_empty());
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn error_status_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/messages/sessions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = backend(&server, Some("t0k")).sessions().await.unwrap_err();
    match err {
        ChatdeskError::Api(ApiError::Status { endpoint, status }) => {
            assert_eq!(endpoint, "sessions");
            assert_eq!(status, 503);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn sessions_keep_missing_transcripts_distinct_from_empty_ones() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/messages/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [
                { "sessionId": "s1", "messages": null },
                { "sessionId": "s2", "messages": [message("m1", "s2"), { "_id": "broken" }] },
                { "messages": [] }
            ]
        })))
        .mount(&server)
        .await;

    let sessions = backend(&server, None).sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].session_id, "s1");
    assert!(sessions[0].messages.is_none());
    assert_eq!(sessions[1].messages.as_ref().map(Vec::len), Some(1));
}

#[tokio::test]
async fn pdf_bytes_pass_through_untouched() {
    let server = MockServer::start().await;
    let pdf = b"%PDF-1.7\n\x00\xff binary".to_vec();
    Mock::given(method("GET"))
        .and(path("/api/messages/pdf"))
        .and(query_param("type", "session"))
        .and(query_param("value", "s-42"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(pdf.clone()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let bytes = backend(&server, Some("t0k"))
        .chat_pdf(IdentifierKind::Session, "s-42")
        .await
        .unwrap();
    assert_eq!(bytes, pdf);
    server.verify().await;
}

#[tokio::test]
async fn controller_recovers_from_transient_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/messages"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [message("m1", "s1")],
            "totalPages": 1
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/messages/unique-contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "emails": ["ana@example.com"],
            "phoneNumbers": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/messages/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [{ "sessionId": "s1", "messages": [message("m1", "s1")] }]
        })))
        .mount(&server)
        .await;

    let mut config = ChatdeskConfig::default();
    config.api_url = format!("{}/api", server.uri());
    config.fetch.retry_base_delay_ms = 10;
    let controller = HistoryController::new(Arc::new(backend(&server, Some("t0k"))), &config);
    controller.refresh().await;

    let view = controller.snapshot().await;
    assert_eq!(view.messages_state, FetchState::Succeeded);
    assert_eq!(view.contacts_state, FetchState::Succeeded);
    assert_eq!(view.sessions_state, FetchState::Succeeded);
    assert_eq!(view.messages.len(), 1);
    assert!(view.guests.is_empty());
    controller.shutdown().await;
}
