use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard,
};
use std::time::Duration;

use medisync_client::{
    CooperativeCancellationToken, QueryRequest, QueryTransport, StreamEvent, StreamEventHandler,
    StreamSummary, TransportError,
};
use medisync_core::{
    current_unix_timestamp_ms, elapsed_since_ms, lock_or_recover, KeyValueStore,
};

use crate::{
    controller::CancellationController,
    identity::SessionIdentity,
    message::ChatMessage,
};

pub const DEFAULT_LOCALE: &str = "en";
pub const SEND_FAILURE_MESSAGE: &str = "Failed to send message. Please try again.";

pub type MessageHandler = Arc<dyn Fn(&ChatMessage) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `ChatSessionConfig` used across MediSync sessions.
pub struct ChatSessionConfig {
    pub locale: String,
    /// Cancels the exchange when no frame arrives within this window.
    pub stream_idle_timeout_ms: Option<u64>,
}

impl Default for ChatSessionConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            stream_idle_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Point-in-time copy of a chat session's observable state.
pub struct ChatSnapshot {
    pub session_id: String,
    pub locale: String,
    pub messages: Vec<ChatMessage>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
struct ChatState {
    identity: SessionIdentity,
    locale: String,
    messages: Vec<ChatMessage>,
    loading: bool,
    error: Option<String>,
}

impl ChatState {
    fn message_mut(&mut self, id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|message| message.id == id)
    }
}

struct ChatInner {
    transport: Arc<dyn QueryTransport>,
    store: Arc<dyn KeyValueStore>,
    stream_idle_timeout_ms: Option<u64>,
    controller: CancellationController,
    state: Mutex<ChatState>,
    handlers: Mutex<Vec<MessageHandler>>,
}

impl ChatInner {
    fn state(&self) -> MutexGuard<'_, ChatState> {
        lock_or_recover(&self.state)
    }

    fn emit(&self, message: &ChatMessage) {
        let handlers = lock_or_recover(&self.handlers).clone();
        for handler in &handlers {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(message)));
        }
    }

    fn apply_event(&self, message_id: &str, event: &StreamEvent) {
        let updated = {
            let mut state = self.state();
            let Some(message) = state.message_mut(message_id) else {
                tracing::debug!(message_id, kind = event.kind(), "dropping event for removed message");
                return;
            };
            message.apply_event(event);
            message.clone()
        };
        self.emit(&updated);
    }

    /// Clears loading and the streaming flag of the in-flight message.
    fn settle_aborted(&self) {
        let stopped: Vec<ChatMessage> = {
            let mut state = self.state();
            state.loading = false;
            state
                .messages
                .iter_mut()
                .filter(|message| message.streaming)
                .map(|message| {
                    message.streaming = false;
                    message.clone()
                })
                .collect()
        };
        for message in &stopped {
            self.emit(message);
        }
    }
}

/// Conversation state machine for one chat session.
///
/// Appends the user turn plus an assistant placeholder, streams the answer
/// into the placeholder, and settles it. At most one exchange runs at a time.
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<ChatInner>,
}

impl ChatSession {
    pub fn new(
        transport: Arc<dyn QueryTransport>,
        store: Arc<dyn KeyValueStore>,
        config: ChatSessionConfig,
    ) -> Self {
        let identity = SessionIdentity::load_or_create(store.as_ref());
        let locale = if config.locale.trim().is_empty() {
            DEFAULT_LOCALE.to_string()
        } else {
            config.locale.trim().to_string()
        };
        Self {
            inner: Arc::new(ChatInner {
                transport,
                store,
                stream_idle_timeout_ms: config.stream_idle_timeout_ms.filter(|ms| *ms > 0),
                controller: CancellationController::new(),
                state: Mutex::new(ChatState {
                    identity,
                    locale,
                    messages: Vec::new(),
                    loading: false,
                    error: None,
                }),
                handlers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Adds a subscriber invoked with every appended or mutated message.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        lock_or_recover(&self.inner.handlers).push(Arc::new(handler));
    }

    pub fn session_id(&self) -> String {
        self.inner.state().identity.id().to_string()
    }

    pub fn locale(&self) -> String {
        self.inner.state().locale.clone()
    }

    pub fn set_locale(&self, locale: &str) {
        let locale = locale.trim();
        if locale.is_empty() {
            return;
        }
        self.inner.state().locale = locale.to_string();
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.state().messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state().error.clone()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let state = self.inner.state();
        ChatSnapshot {
            session_id: state.identity.id().to_string(),
            locale: state.locale.clone(),
            messages: state.messages.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    /// Sends one query and streams the answer into a new assistant message.
    ///
    /// Never fails: transport problems land in [`ChatSession::error`] and
    /// cancellation is silent.
    pub async fn send_message(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let Some(token) = self.inner.controller.begin() else {
            tracing::warn!("ignoring query while another exchange is in flight");
            return;
        };

        let (request, user_message, placeholder) = {
            let mut state = self.inner.state();
            let session_id = state.identity.id().to_string();
            let user_message = ChatMessage::user(&session_id, query);
            let placeholder = ChatMessage::assistant_placeholder(&session_id);
            state.messages.push(user_message.clone());
            state.messages.push(placeholder.clone());
            state.loading = true;
            state.error = None;
            let request = QueryRequest {
                query: query.to_string(),
                session_id,
                locale: state.locale.clone(),
            };
            (request, user_message, placeholder)
        };
        self.inner.emit(&user_message);
        self.inner.emit(&placeholder);

        let dispatched = Arc::new(AtomicUsize::new(0));
        let last_progress_ms = Arc::new(AtomicU64::new(current_unix_timestamp_ms()));
        let handler: StreamEventHandler = {
            let inner = self.inner.clone();
            let message_id = placeholder.id.clone();
            let dispatched = dispatched.clone();
            let last_progress_ms = last_progress_ms.clone();
            Arc::new(move |event: StreamEvent| {
                dispatched.fetch_add(1, Ordering::SeqCst);
                last_progress_ms.store(current_unix_timestamp_ms(), Ordering::SeqCst);
                inner.apply_event(&message_id, &event);
            })
        };

        tracing::debug!(
            session_id = %request.session_id,
            message_id = %placeholder.id,
            "sending chat query"
        );
        let result = self
            .run_exchange(request, token.clone(), handler, last_progress_ms)
            .await;
        self.finish_exchange(
            &token,
            &placeholder.id,
            result,
            dispatched.load(Ordering::SeqCst),
        );
    }

    /// Cancels the in-flight exchange, if any. Events already applied stay.
    pub fn abort(&self) {
        if self.inner.controller.abort() {
            tracing::debug!("chat exchange aborted");
            self.inner.settle_aborted();
        }
    }

    /// Empties the transcript and clears the error; the session id is kept.
    pub fn clear_messages(&self) {
        let mut state = self.inner.state();
        state.messages.clear();
        state.error = None;
    }

    /// Starts a new conversation: fresh persisted id, empty transcript, no
    /// error. An in-flight exchange is aborted first.
    pub fn new_session(&self) -> String {
        self.abort();
        let identity = SessionIdentity::create(self.inner.store.as_ref());
        let id = identity.id().to_string();
        let mut state = self.inner.state();
        state.identity = identity;
        state.messages.clear();
        state.error = None;
        tracing::debug!(session_id = %id, "started new chat session");
        id
    }

    async fn run_exchange(
        &self,
        request: QueryRequest,
        token: CooperativeCancellationToken,
        handler: StreamEventHandler,
        last_progress_ms: Arc<AtomicU64>,
    ) -> Result<Option<StreamSummary>, TransportError> {
        let exchange = self
            .inner
            .transport
            .stream_query(request, token.clone(), handler);
        let Some(idle_timeout_ms) = self.inner.stream_idle_timeout_ms else {
            return exchange.await;
        };

        tokio::pin!(exchange);
        loop {
            let idle_ms = elapsed_since_ms(
                last_progress_ms.load(Ordering::SeqCst),
                current_unix_timestamp_ms(),
            );
            let remaining_ms = idle_timeout_ms.saturating_sub(idle_ms).max(1);
            tokio::select! {
                result = &mut exchange => return result,
                _ = tokio::time::sleep(Duration::from_millis(remaining_ms)) => {
                    let idle_ms = elapsed_since_ms(
                        last_progress_ms.load(Ordering::SeqCst),
                        current_unix_timestamp_ms(),
                    );
                    if idle_ms < idle_timeout_ms {
                        continue;
                    }
                    tracing::warn!(idle_ms, idle_timeout_ms, "query stream idle; cancelling");
                    if self.inner.controller.abort_if_current(&token) {
                        self.inner.settle_aborted();
                    } else {
                        token.cancel();
                    }
                    return exchange.await;
                }
            }
        }
    }

    fn finish_exchange(
        &self,
        token: &CooperativeCancellationToken,
        message_id: &str,
        result: Result<Option<StreamSummary>, TransportError>,
        dispatched: usize,
    ) {
        let owned_slot = self.inner.controller.release(token);
        let cancelled = token.is_cancelled();
        let updated = {
            let mut state = self.inner.state();
            match result {
                Ok(Some(summary)) if dispatched == 0 && !cancelled => {
                    if let Some(message) = state.message_mut(message_id) {
                        message.settle_from_summary(&summary);
                    }
                }
                Ok(_) => {}
                Err(error) if cancelled || error.is_cancelled() => {
                    tracing::debug!(error = %error, "exchange ended by cancellation");
                }
                Err(error) => match error.user_message() {
                    Some(message) => {
                        tracing::warn!(error = %error, "chat exchange failed");
                        if let Some(in_flight) = state.message_mut(message_id) {
                            in_flight.settle_with_error(&message);
                        }
                        state.error = Some(message);
                    }
                    None => {
                        tracing::warn!(error = %error, "chat exchange failed without a usable message");
                        state.error = Some(SEND_FAILURE_MESSAGE.to_string());
                    }
                },
            }

            if owned_slot {
                state.loading = false;
            }
            state.message_mut(message_id).map(|message| {
                message.streaming = false;
                message.clone()
            })
        };
        if let Some(message) = updated {
            self.inner.emit(&message);
        }
    }
}
