//! Foundational low-level utilities shared across MediSync client crates.
//!
//! Provides persisted key-value storage, atomic file-write helpers, time
//! utilities, and the structured [`ApiError`] value returned by backend calls.

pub mod api_error;
pub mod atomic_io;
pub mod kv_store;
pub mod sync_utils;
pub mod time_utils;

pub use api_error::ApiError;
pub use atomic_io::write_text_atomic;
pub use kv_store::{
    read_non_empty, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, AUTH_TOKEN_KEY,
    SESSION_ID_KEY,
};
pub use sync_utils::lock_or_recover;
pub use time_utils::{current_unix_timestamp_ms, elapsed_since_ms};
