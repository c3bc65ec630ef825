//! Chat session engine: identity, transcript, streaming state machine and
//! cancellation for one conversation.
mod chat;
mod controller;
mod identity;
mod message;

pub use chat::{
    ChatSession, ChatSessionConfig, ChatSnapshot, MessageHandler, DEFAULT_LOCALE,
    SEND_FAILURE_MESSAGE,
};
pub use controller::CancellationController;
pub use identity::SessionIdentity;
pub use message::{ChatMessage, MessageRole};
