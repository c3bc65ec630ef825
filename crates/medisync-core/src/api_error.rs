use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structured failure returned by backend endpoints.
///
/// `message` is the human-readable text surfaced to callers; `detail` keeps
/// whatever structured payload the server attached (error code, retry hints).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub status_text: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ApiError {
    pub fn new(status: u16, status_text: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Decodes a failed response body into an [`ApiError`].
    ///
    /// Accepts `{"message": ..}`, `{"error": ".."}` and `{"error": {"message": ..}}`
    /// shapes; anything else falls back to the status text.
    pub fn from_body(status: u16, status_text: &str, body: &str) -> Self {
        let fallback_message = if status_text.trim().is_empty() {
            format!("request failed with status {status}")
        } else {
            status_text.trim().to_string()
        };

        let Ok(parsed) = serde_json::from_str::<Value>(body) else {
            let trimmed = body.trim();
            let message = if trimmed.is_empty() || trimmed.len() > 512 {
                fallback_message
            } else {
                trimmed.to_string()
            };
            return Self::new(status, status_text, message);
        };

        let message = extract_message(&parsed).unwrap_or(fallback_message);
        let detail = parsed
            .get("detail")
            .or_else(|| parsed.get("details"))
            .cloned()
            .or_else(|| parsed.get("code").cloned())
            .or_else(|| parsed.get("error").and_then(|inner| inner.get("code")).cloned());
        Self {
            status,
            status_text: status_text.to_string(),
            message,
            detail,
        }
    }

    /// Returns true when the failure carries a usable human-readable message.
    pub fn has_message(&self) -> bool {
        !self.message.trim().is_empty()
    }
}

fn extract_message(value: &Value) -> Option<String> {
    let candidate = match value.get("message") {
        Some(Value::String(message)) => Some(message.clone()),
        _ => match value.get("error") {
            Some(Value::String(message)) => Some(message.clone()),
            Some(Value::Object(inner)) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        },
    }?;
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
