use chrono::{DateTime, Utc};
use medisync_client::{ChartSpec, StreamEvent, StreamSummary};
use serde::{Deserialize, Serialize};

use crate::identity::generate_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Enumerates supported `MessageRole` values.
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One entry of a chat transcript.
///
/// `partial_content` is display-only progress text; `content` holds the
/// settled answer. Only assistant messages ever stream.
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub partial_content: String,
    pub chart: Option<ChartSpec>,
    pub confidence: Option<f64>,
    pub follow_ups: Vec<String>,
    pub streaming: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn new(session_id: &str, role: MessageRole, content: String, streaming: bool) -> Self {
        Self {
            id: generate_id(),
            session_id: session_id.to_string(),
            role,
            content,
            partial_content: String::new(),
            chart: None,
            confidence: None,
            follow_ups: Vec::new(),
            streaming,
            created_at: Utc::now(),
        }
    }

    pub fn user(session_id: &str, content: impl Into<String>) -> Self {
        Self::new(session_id, MessageRole::User, content.into(), false)
    }

    /// Empty assistant message awaiting streamed events.
    pub fn assistant_placeholder(session_id: &str) -> Self {
        Self::new(session_id, MessageRole::Assistant, String::new(), true)
    }

    /// Applies one streamed event. Progress events only touch
    /// `partial_content`; terminal events settle the message.
    pub fn apply_event(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Thinking { message } => {
                self.partial_content = message.clone();
            }
            StreamEvent::SqlPreview { sql } => {
                self.partial_content = sql.clone();
            }
            StreamEvent::Result {
                message,
                confidence,
                ..
            } => {
                self.content = message.clone();
                self.chart = event.chart();
                if confidence.is_some() {
                    self.confidence = *confidence;
                }
                self.streaming = false;
            }
            StreamEvent::Error { message } => {
                self.content = message.clone();
                self.streaming = false;
            }
            StreamEvent::Clarification { message, options } => {
                self.content = message.clone();
                self.follow_ups = options.clone();
                self.streaming = false;
            }
        }
    }

    pub fn settle_from_summary(&mut self, summary: &StreamSummary) {
        self.content = summary.message.clone();
        self.chart = summary.chart.clone();
        if summary.confidence.is_some() {
            self.confidence = summary.confidence;
        }
        self.streaming = false;
    }

    pub fn settle_with_error(&mut self, message: &str) {
        self.content = message.to_string();
        self.streaming = false;
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}
