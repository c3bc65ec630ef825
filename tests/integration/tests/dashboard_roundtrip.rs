use std::sync::Arc;

use httpmock::prelude::*;
use medisync_client::{BackendClient, BackendConfig, HttpQueryTransport};
use medisync_collections::{chart_store, ChartPosition, PinnedChartDraft};
use medisync_core::{KeyValueStore, MemoryKeyValueStore, AUTH_TOKEN_KEY};
use medisync_session::{ChatSession, ChatSessionConfig};
use serde_json::{json, Value};

const LINE_ANSWER: &str = concat!(
    "data: {\"type\":\"sql_preview\",\"sql\":\"SELECT month, SUM(amount) FROM revenue GROUP BY month\"}\n\n",
    "data: {\"type\":\"result\",\"message\":\"Revenue grew 12%\",\"chart_type\":\"line\",\"data\":{\"labels\":[\"Jan\",\"Feb\"],\"values\":[10,12]}}\n\n",
    "data: [DONE]\n\n"
);

fn chart_json(id: &str, title: &str, row: u32, col: u32) -> Value {
    json!({
        "id": id,
        "userId": "user-1",
        "title": title,
        "naturalLanguageQuery": "Show me revenue",
        "sqlQuery": "SELECT 1",
        "chartSpec": {},
        "chartType": "line",
        "refreshInterval": 0,
        "locale": "en",
        "position": {"row": row, "col": col, "size": 1},
        "isActive": true,
        "createdAt": "2025-01-01T00:00:00Z",
        "updatedAt": "2025-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn integration_answer_chart_is_pinned_and_moved_to_the_front() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/chat");
        then.status(200)
            .header("content-type", "text/event-stream")
            .body(LINE_ANSWER);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/dashboard/charts")
            .header("authorization", "Bearer shared-token");
        then.status(200).json_body(json!([
            chart_json("a", "Patients", 0, 0),
            chart_json("b", "Inventory", 0, 1)
        ]));
    });
    let pin = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/dashboard/charts")
            .header("authorization", "Bearer shared-token")
            .json_body_includes(
                json!({
                    "chartType": "line",
                    "naturalLanguageQuery": "Show me revenue",
                    "chartSpec": {"labels": ["Jan", "Feb"], "values": [10, 12]}
                })
                .to_string(),
            );
        then.status(201)
            .json_body(chart_json("new", "Revenue grew 12%", 0, 2));
    });
    let reorder = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/dashboard/charts/reorder")
            .json_body(json!({
                "positions": [
                    {"id": "new", "position": {"row": 0, "col": 0, "size": 1}},
                    {"id": "a", "position": {"row": 0, "col": 1, "size": 1}},
                    {"id": "b", "position": {"row": 0, "col": 2, "size": 1}}
                ]
            }));
        then.status(204);
    });

    let credentials: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    credentials
        .set(AUTH_TOKEN_KEY, "shared-token")
        .expect("store token");
    let backend = BackendClient::new(
        BackendConfig {
            api_base: format!("{}/api/v1", server.base_url()),
            request_timeout_ms: 5_000,
            connect_timeout_ms: 1_000,
        },
        credentials.clone(),
    )
    .expect("backend client");

    let session = ChatSession::new(
        Arc::new(HttpQueryTransport::new(backend.clone())),
        credentials,
        ChatSessionConfig::default(),
    );
    session.send_message("Show me revenue").await;
    let answer = session.messages()[1].clone();
    let chart = answer.chart.clone().expect("answer chart");

    let charts = chart_store(backend);
    charts.refresh().await.expect("list charts");
    let pinned = charts
        .create(&PinnedChartDraft {
            title: answer.content.clone(),
            query_id: None,
            natural_language_query: "Show me revenue".to_string(),
            sql_query: answer.partial_content.clone(),
            chart_spec: chart.payload,
            chart_type: chart.kind,
            refresh_interval: 0,
            position: ChartPosition::default(),
        })
        .await
        .expect("pin chart");
    charts
        .reorder(&[pinned.id.clone(), "a".to_string()])
        .await
        .expect("reorder");

    pin.assert();
    reorder.assert();
    let order: Vec<String> = charts.items().into_iter().map(|chart| chart.id).collect();
    assert_eq!(order, vec!["new", "a", "b"]);
    assert!(charts.error().is_none());
}
