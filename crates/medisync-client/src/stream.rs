use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Method, StatusCode,
};

use crate::{
    cancellation::CooperativeCancellationToken,
    frames::{Frame, FrameDecoder},
    http::{ensure_success, BackendClient},
    types::{QueryRequest, QueryTransport, StreamEventHandler, StreamSummary, TransportError},
};

pub const CHAT_STREAM_PATH: &str = "/chat";
const EVENT_STREAM_MIME: &str = "text/event-stream";

#[derive(Debug, Clone, Default, PartialEq)]
/// Bookkeeping for one read of an event-stream body.
pub struct StreamOutcome {
    pub summary: Option<StreamSummary>,
    pub bytes_read: usize,
    pub dispatched: usize,
    pub discarded: usize,
    pub cancelled: bool,
    pub terminated: bool,
}

/// Reads an event-stream body, dispatching each decoded event in order.
///
/// Cancellation stops consumption between chunks and between frames; events
/// already dispatched stay dispatched and the outcome is returned normally.
pub async fn read_event_stream<S, B, E>(
    stream: S,
    cancellation: &CooperativeCancellationToken,
    on_event: &StreamEventHandler,
) -> Result<StreamOutcome, TransportError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<TransportError>,
{
    tokio::pin!(stream);
    let mut decoder = FrameDecoder::new();
    let mut outcome = StreamOutcome::default();

    'read: loop {
        if cancellation.is_cancelled() {
            outcome.cancelled = true;
            break;
        }
        let next = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                outcome.cancelled = true;
                break 'read;
            }
            next = stream.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|error| -> TransportError { error.into() })?;
        let bytes = chunk.as_ref();
        outcome.bytes_read = outcome.bytes_read.saturating_add(bytes.len());
        for frame in decoder.push(bytes) {
            if cancellation.is_cancelled() {
                outcome.cancelled = true;
                break 'read;
            }
            if !apply_frame(frame, on_event, &mut outcome) {
                outcome.terminated = true;
                break 'read;
            }
        }
    }

    if !outcome.cancelled && !outcome.terminated {
        if let Some(frame) = decoder.finish() {
            if !apply_frame(frame, on_event, &mut outcome) {
                outcome.terminated = true;
            }
        }
    }
    Ok(outcome)
}

/// Returns false once the terminator has been seen.
fn apply_frame(frame: Frame, on_event: &StreamEventHandler, outcome: &mut StreamOutcome) -> bool {
    match frame {
        Frame::Done => false,
        Frame::Invalid(reason) => {
            outcome.discarded = outcome.discarded.saturating_add(1);
            tracing::debug!(reason = %reason, "discarding unparseable stream frame");
            true
        }
        Frame::Event(event) => {
            if let Some(summary) = StreamSummary::from_result(&event) {
                outcome.summary = Some(summary);
            }
            outcome.dispatched = outcome.dispatched.saturating_add(1);
            on_event(event);
            true
        }
    }
}

#[derive(Debug, Clone)]
/// Streaming query transport backed by the chat endpoint.
pub struct HttpQueryTransport {
    backend: BackendClient,
    path: String,
}

impl HttpQueryTransport {
    pub fn new(backend: BackendClient) -> Self {
        Self::with_path(backend, CHAT_STREAM_PATH)
    }

    pub fn with_path(backend: BackendClient, path: impl Into<String>) -> Self {
        Self {
            backend,
            path: path.into(),
        }
    }
}

#[async_trait]
impl QueryTransport for HttpQueryTransport {
    async fn stream_query(
        &self,
        request: QueryRequest,
        cancellation: CooperativeCancellationToken,
        on_event: StreamEventHandler,
    ) -> Result<Option<StreamSummary>, TransportError> {
        if cancellation.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        let session_id = request.session_id.clone();
        tracing::debug!(session_id = %session_id, locale = %request.locale, "opening query stream");

        let builder = self
            .backend
            .request(Method::POST, &self.path)
            .header(ACCEPT, EVENT_STREAM_MIME)
            .json(&request);
        let response = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(TransportError::Cancelled),
            response = builder.send() => response?,
        };
        let response = ensure_success(response).await?;

        if response.status() == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Err(TransportError::NoBody);
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().contains(EVENT_STREAM_MIME))
            .unwrap_or(false);

        if !is_event_stream {
            let body = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(TransportError::Cancelled),
                body = response.text() => body?,
            };
            if body.trim().is_empty() {
                return Err(TransportError::NoBody);
            }
            tracing::debug!(session_id = %session_id, "query answered with a single document");
            return StreamSummary::from_document(&body).map(Some);
        }

        let outcome = read_event_stream(response.bytes_stream(), &cancellation, &on_event).await?;
        if outcome.bytes_read == 0 && !outcome.cancelled {
            return Err(TransportError::NoBody);
        }
        tracing::debug!(
            session_id = %session_id,
            dispatched = outcome.dispatched,
            discarded = outcome.discarded,
            cancelled = outcome.cancelled,
            terminated = outcome.terminated,
            "query stream closed"
        );
        Ok(outcome.summary)
    }
}
