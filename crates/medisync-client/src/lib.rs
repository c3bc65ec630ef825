//! HTTP plumbing and the streaming query transport for MediSync clients.
mod cancellation;
mod frames;
mod http;
mod stream;
mod types;

pub use cancellation::CooperativeCancellationToken;
pub use frames::{parse_frame_line, Frame, FrameDecoder};
pub use http::{
    ensure_success, new_request_id, BackendClient, BackendConfig, DEFAULT_API_BASE,
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS, REQUEST_ID_HEADER,
};
pub use stream::{read_event_stream, HttpQueryTransport, StreamOutcome, CHAT_STREAM_PATH};
pub use types::{
    ChartSpec, QueryRequest, QueryTransport, StreamEvent, StreamEventHandler, StreamSummary,
    TransportError,
};
