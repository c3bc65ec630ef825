use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::stream;
use httpmock::prelude::*;
use medisync_client::{
    read_event_stream, BackendClient, BackendConfig, CooperativeCancellationToken,
    HttpQueryTransport, QueryRequest, QueryTransport, StreamEventHandler, StreamSummary,
    TransportError,
};
use medisync_core::{MemoryKeyValueStore, AUTH_TOKEN_KEY};
use medisync_session::{ChatMessage, ChatSession, ChatSessionConfig, MessageRole};
use serde_json::json;

const REVENUE_STREAM: &str = concat!(
    "data: {\"type\":\"thinking\",\"message\":\"Analyzing your question...\"}\n\n",
    "data: {\"type\":\"sql_preview\",\"sql\":\"SELECT month, SUM(amount) FROM revenue GROUP BY month\"}\n\n",
    "data: {\"type\":\"result\",\"message\":\"Revenue grew 12% this quarter\",\"chart_type\":\"line\",\"data\":{\"labels\":[\"Jan\",\"Feb\"],\"values\":[10,12]},\"confidence\":0.87}\n\n",
    "data: [DONE]\n\n"
);

/// Replays a fixed body split at the given byte offsets.
struct ChunkedTransport {
    body: &'static [u8],
    splits: Vec<usize>,
}

#[async_trait]
impl QueryTransport for ChunkedTransport {
    async fn stream_query(
        &self,
        _request: QueryRequest,
        cancellation: CooperativeCancellationToken,
        on_event: StreamEventHandler,
    ) -> Result<Option<StreamSummary>, TransportError> {
        let mut chunks: Vec<Result<Vec<u8>, TransportError>> = Vec::new();
        let mut start = 0;
        for split in &self.splits {
            chunks.push(Ok(self.body[start..*split].to_vec()));
            start = *split;
        }
        chunks.push(Ok(self.body[start..].to_vec()));
        let outcome = read_event_stream(stream::iter(chunks), &cancellation, &on_event).await?;
        Ok(outcome.summary)
    }
}

fn backend_for(server: &MockServer) -> BackendClient {
    BackendClient::new(
        BackendConfig {
            api_base: format!("{}/api/v1", server.base_url()),
            request_timeout_ms: 5_000,
            connect_timeout_ms: 1_000,
        },
        Arc::new(MemoryKeyValueStore::with_entries([(AUTH_TOKEN_KEY, "integration")])),
    )
    .expect("backend client")
}

fn settled_answer(session: &ChatSession) -> ChatMessage {
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    messages[1].clone()
}

fn comparable(message: &ChatMessage) -> (String, String, Option<String>, Option<f64>, bool) {
    (
        message.content.clone(),
        message.partial_content.clone(),
        message.chart.as_ref().map(|chart| chart.kind.clone()),
        message.confidence,
        message.streaming,
    )
}

#[tokio::test]
async fn integration_chunk_boundaries_do_not_change_settled_message() {
    let body = REVENUE_STREAM.as_bytes();
    let split_sets: Vec<Vec<usize>> = vec![
        vec![],
        vec![body.len() / 2],
        vec![1, 70, 71],
        vec![13, 64, 150, 151],
        vec![2, 40, 90, 200, body.len() - 3],
        vec![9, 18, 27, 36, 45, 54],
    ];

    let mut settled = Vec::new();
    for splits in split_sets {
        let session = ChatSession::new(
            Arc::new(ChunkedTransport { body, splits }),
            Arc::new(MemoryKeyValueStore::new()),
            ChatSessionConfig::default(),
        );
        session.send_message("Show me revenue").await;
        assert!(session.error().is_none());
        settled.push(comparable(&settled_answer(&session)));
    }

    let expected = (
        "Revenue grew 12% this quarter".to_string(),
        "SELECT month, SUM(amount) FROM revenue GROUP BY month".to_string(),
        Some("line".to_string()),
        Some(0.87),
        false,
    );
    for answer in settled {
        assert_eq!(answer, expected);
    }
}

#[tokio::test]
async fn integration_show_me_revenue_over_http() {
    let server = MockServer::start();
    let chat = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/chat")
            .header("authorization", "Bearer integration")
            .json_body_includes(json!({"query": "Show me revenue", "locale": "en"}).to_string());
        then.status(200)
            .header("content-type", "text/event-stream")
            .body(REVENUE_STREAM);
    });

    let session = ChatSession::new(
        Arc::new(HttpQueryTransport::new(backend_for(&server))),
        Arc::new(MemoryKeyValueStore::new()),
        ChatSessionConfig::default(),
    );
    session.send_message("Show me revenue").await;

    chat.assert();
    let snapshot = session.snapshot();
    assert!(!snapshot.loading);
    assert!(snapshot.error.is_none());
    let answer = settled_answer(&session);
    assert_eq!(answer.content, "Revenue grew 12% this quarter");
    assert_eq!(
        answer.chart.as_ref().map(|chart| chart.payload.clone()),
        Some(json!({"labels": ["Jan", "Feb"], "values": [10, 12]}))
    );
}

#[tokio::test]
async fn integration_structured_500_sets_session_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/chat");
        then.status(500)
            .json_body(json!({"message": "Server error occurred"}));
    });

    let session = ChatSession::new(
        Arc::new(HttpQueryTransport::new(backend_for(&server))),
        Arc::new(MemoryKeyValueStore::new()),
        ChatSessionConfig::default(),
    );
    session.send_message("Show me revenue").await;

    let snapshot = session.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.error.as_deref(), Some("Server error occurred"));
    assert_eq!(snapshot.messages[1].content, "Server error occurred");
}

#[tokio::test]
async fn integration_abort_before_headers_is_silent() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/chat");
        then.status(200)
            .header("content-type", "text/event-stream")
            .delay(Duration::from_secs(5))
            .body(REVENUE_STREAM);
    });

    let session = ChatSession::new(
        Arc::new(HttpQueryTransport::new(backend_for(&server))),
        Arc::new(MemoryKeyValueStore::new()),
        ChatSessionConfig::default(),
    );
    let sender = session.clone();
    let handle = tokio::spawn(async move { sender.send_message("slow").await });

    for _ in 0..200 {
        if session.is_loading() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    session.abort();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("abort should end the exchange promptly")
        .expect("send task");

    let snapshot = session.snapshot();
    assert!(!snapshot.loading);
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.messages.len(), 2);
    assert!(snapshot.messages[1].content.is_empty());
    assert!(!snapshot.messages[1].streaming);
}

#[tokio::test]
async fn integration_empty_query_sends_nothing() {
    let server = MockServer::start();
    let chat = server.mock(|when, then| {
        when.method(POST).path("/api/v1/chat");
        then.status(200).body("data: [DONE]\n");
    });

    let session = ChatSession::new(
        Arc::new(HttpQueryTransport::new(backend_for(&server))),
        Arc::new(MemoryKeyValueStore::new()),
        ChatSessionConfig::default(),
    );
    session.send_message("   ").await;

    chat.assert_hits(0);
    assert!(session.messages().is_empty());
}
