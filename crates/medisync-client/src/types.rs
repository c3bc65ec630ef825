use std::sync::Arc;

use async_trait::async_trait;
use medisync_core::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cancellation::CooperativeCancellationToken;

/// Chart recommendation attached to a settled answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSpec {
    pub kind: String,
    pub payload: Value,
}

/// Body of a streaming query request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
    pub session_id: String,
    pub locale: String,
}

/// Enumerates the typed events carried by `data:` frames.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Thinking {
        message: String,
    },
    SqlPreview {
        sql: String,
    },
    Result {
        message: String,
        chart_kind: Option<String>,
        data: Option<Value>,
        confidence: Option<f64>,
    },
    Error {
        message: String,
    },
    Clarification {
        message: String,
        options: Vec<String>,
    },
}

impl StreamEvent {
    /// Parses one frame payload. Unknown event kinds are rejected.
    pub fn from_json(payload: &str) -> Result<Self, TransportError> {
        let raw: RawStreamFrame = serde_json::from_str(payload)
            .map_err(|error| TransportError::InvalidFrame(error.to_string()))?;
        raw.into_event()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Thinking { .. } => "thinking",
            StreamEvent::SqlPreview { .. } => "sql_preview",
            StreamEvent::Result { .. } => "result",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Clarification { .. } => "clarification",
        }
    }

    /// Returns the chart specification of a `result` event when both the kind
    /// and the payload are present.
    pub fn chart(&self) -> Option<ChartSpec> {
        match self {
            StreamEvent::Result {
                chart_kind: Some(kind),
                data: Some(payload),
                ..
            } => Some(ChartSpec {
                kind: kind.clone(),
                payload: payload.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawStreamFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    sql: Option<String>,
    #[serde(default, alias = "chartType")]
    chart_type: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    options: Option<Vec<String>>,
}

impl RawStreamFrame {
    fn into_event(self) -> Result<StreamEvent, TransportError> {
        let message = self.message.unwrap_or_default();
        let event = match self.kind.as_str() {
            "thinking" => StreamEvent::Thinking { message },
            "sql_preview" => StreamEvent::SqlPreview {
                sql: self.sql.unwrap_or(message),
            },
            "result" => StreamEvent::Result {
                message,
                chart_kind: self.chart_type.filter(|kind| !kind.trim().is_empty()),
                data: self.data,
                confidence: self.confidence,
            },
            "error" => StreamEvent::Error { message },
            "clarification" => StreamEvent::Clarification {
                message,
                options: self.options.unwrap_or_default(),
            },
            other => {
                return Err(TransportError::InvalidFrame(format!(
                    "unsupported event type '{other}'"
                )))
            }
        };
        Ok(event)
    }
}

/// Best-effort terminal summary of one exchange.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamSummary {
    pub message: String,
    pub chart: Option<ChartSpec>,
    pub confidence: Option<f64>,
}

impl StreamSummary {
    /// Builds a summary from a `result` event; other kinds yield `None`.
    pub fn from_result(event: &StreamEvent) -> Option<Self> {
        match event {
            StreamEvent::Result {
                message,
                confidence,
                ..
            } => Some(Self {
                message: message.clone(),
                chart: event.chart(),
                confidence: *confidence,
            }),
            _ => None,
        }
    }

    /// Parses the single JSON document returned by non-streaming exchanges.
    pub fn from_document(raw: &str) -> Result<Self, TransportError> {
        let document: RawSummaryDocument = serde_json::from_str(raw)
            .map_err(|error| TransportError::InvalidResponse(error.to_string()))?;
        let chart = match (
            document.chart_type.filter(|kind| !kind.trim().is_empty()),
            document.data,
        ) {
            (Some(kind), Some(payload)) => Some(ChartSpec { kind, payload }),
            _ => None,
        };
        Ok(Self {
            message: document.message.unwrap_or_default(),
            chart,
            confidence: document.confidence,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawSummaryDocument {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "chartType")]
    chart_type: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Error)]
/// Enumerates supported `TransportError` values.
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("No response body")]
    NoBody,
    #[error("stream cancelled")]
    Cancelled,
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Returns the human-readable message a caller may surface, if the failure
    /// carries one. Opaque network failures and cancellation return `None`.
    pub fn user_message(&self) -> Option<String> {
        match self {
            TransportError::Api(error) if error.has_message() => Some(error.message.clone()),
            TransportError::NoBody => Some(self.to_string()),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}

pub type StreamEventHandler = Arc<dyn Fn(StreamEvent) + Send + Sync>;

#[async_trait]
/// Trait contract for `QueryTransport` behavior.
///
/// Implementations call `on_event` once per decoded event, in arrival order,
/// and resolve to the summary built from the last `result` event (if any).
pub trait QueryTransport: Send + Sync {
    async fn stream_query(
        &self,
        request: QueryRequest,
        cancellation: CooperativeCancellationToken,
        on_event: StreamEventHandler,
    ) -> Result<Option<StreamSummary>, TransportError>;
}
