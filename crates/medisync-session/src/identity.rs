use medisync_core::{read_non_empty, KeyValueStore, SESSION_ID_KEY};
use uuid::Uuid;

/// Stable identifier of one conversation, persisted across restarts until an
/// explicit reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    id: String,
}

impl SessionIdentity {
    /// Loads the persisted identifier, generating and writing back a fresh one
    /// when none is stored.
    pub fn load_or_create(store: &dyn KeyValueStore) -> Self {
        if let Some(id) = read_non_empty(store, SESSION_ID_KEY) {
            tracing::debug!(session_id = %id, "restored chat session identity");
            return Self { id };
        }
        Self::create(store)
    }

    /// Replaces the persisted identifier with a freshly generated one.
    pub fn create(store: &dyn KeyValueStore) -> Self {
        let identity = Self {
            id: generate_id(),
        };
        if let Err(error) = store.set(SESSION_ID_KEY, &identity.id) {
            tracing::warn!(
                session_id = %identity.id,
                error = %error,
                "failed to persist chat session identity"
            );
        }
        identity
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
