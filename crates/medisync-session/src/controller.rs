use std::sync::{Arc, Mutex};

use medisync_client::CooperativeCancellationToken;
use medisync_core::lock_or_recover;

/// Holds the single active cancellation token of a chat session.
#[derive(Debug, Clone, Default)]
pub struct CancellationController {
    active: Arc<Mutex<Option<CooperativeCancellationToken>>>,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh token, or returns `None` while another exchange
    /// still owns the slot.
    pub fn begin(&self) -> Option<CooperativeCancellationToken> {
        let mut active = lock_or_recover(&self.active);
        if active.is_some() {
            return None;
        }
        let token = CooperativeCancellationToken::new();
        *active = Some(token.clone());
        Some(token)
    }

    /// Signals and releases the active token. Returns false when idle.
    pub fn abort(&self) -> bool {
        let taken = lock_or_recover(&self.active).take();
        match taken {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels `token` only while it is still the active one.
    pub fn abort_if_current(&self, token: &CooperativeCancellationToken) -> bool {
        let mut active = lock_or_recover(&self.active);
        let is_current = active
            .as_ref()
            .map(|current| current.same_as(token))
            .unwrap_or(false);
        if is_current {
            *active = None;
            token.cancel();
        }
        is_current
    }

    /// Clears the slot if `token` still owns it. Returns whether it did.
    pub fn release(&self, token: &CooperativeCancellationToken) -> bool {
        let mut active = lock_or_recover(&self.active);
        let is_current = active
            .as_ref()
            .map(|current| current.same_as(token))
            .unwrap_or(false);
        if is_current {
            *active = None;
        }
        is_current
    }

    pub fn is_active(&self) -> bool {
        lock_or_recover(&self.active).is_some()
    }
}
