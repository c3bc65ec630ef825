use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use medisync_core::{lock_or_recover, ApiError};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::{item::CollectionItem, remote::CollectionRemote};

#[derive(Debug, Clone, PartialEq)]
/// Point-in-time copy of a collection's observable state.
pub struct CollectionSnapshot<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for CollectionSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

/// Client-side copy of a server collection with optimistic mutations.
///
/// Every mutation applies locally first, then calls the remote. On success
/// the local item is replaced by the server representation; on failure the
/// collection error is set, the local state is repaired (re-fetch for
/// updates and reorders, snapshot restore for deletes) and the original
/// failure is returned.
pub struct OptimisticStore<T, R> {
    remote: Arc<R>,
    state: Arc<Mutex<CollectionSnapshot<T>>>,
    sequential: Option<Arc<AsyncMutex<()>>>,
}

impl<T, R> Clone for OptimisticStore<T, R> {
    fn clone(&self) -> Self {
        Self {
            remote: self.remote.clone(),
            state: self.state.clone(),
            sequential: self.sequential.clone(),
        }
    }
}

impl<T, R> OptimisticStore<T, R>
where
    T: CollectionItem,
    R: CollectionRemote<T>,
{
    pub fn new(remote: R) -> Self {
        Self::from_arc(Arc::new(remote))
    }

    pub fn from_arc(remote: Arc<R>) -> Self {
        Self {
            remote,
            state: Arc::new(Mutex::new(CollectionSnapshot::default())),
            sequential: None,
        }
    }

    /// Runs mutations one at a time, in arrival order.
    pub fn with_sequential_mutations(mut self) -> Self {
        self.sequential = Some(Arc::new(AsyncMutex::new(())));
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn items(&self) -> Vec<T> {
        self.state().items.clone()
    }

    pub fn item(&self, id: &str) -> Option<T> {
        self.state()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn snapshot(&self) -> CollectionSnapshot<T> {
        self.state().clone()
    }

    /// Replaces local items with the server list.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        {
            let mut state = self.state();
            state.loading = true;
            state.error = None;
        }
        let result = self.remote.list().await;
        let mut state = self.state();
        state.loading = false;
        match result {
            Ok(items) => {
                state.items = items;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(status = error.status, error = %error, "collection refresh failed");
                state.error = Some(error.message.clone());
                Err(error)
            }
        }
    }

    /// Creates an item. Nothing is inserted until the server answers.
    pub async fn create(&self, draft: &T::Draft) -> Result<T, ApiError> {
        let _permit = self.mutation_permit().await;
        self.clear_error();
        match self.remote.create(draft).await {
            Ok(created) => {
                self.state().items.push(created.clone());
                Ok(created)
            }
            Err(error) => {
                self.record_failure("create", &error);
                Err(error)
            }
        }
    }

    /// Merges `patch` locally, then persists it.
    pub async fn update(&self, id: &str, patch: &T::Patch) -> Result<T, ApiError> {
        let _permit = self.mutation_permit().await;
        self.modify_local(id, |item| item.apply_patch(patch));
        match self.remote.update(id, patch).await {
            Ok(updated) => {
                self.replace_item(id, updated.clone());
                Ok(updated)
            }
            Err(error) => {
                self.record_failure("update", &error);
                self.refetch_quietly().await;
                Err(error)
            }
        }
    }

    /// Removes the item locally, then on the server; restores the previous
    /// items if the server refuses.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let _permit = self.mutation_permit().await;
        let snapshot = {
            let mut state = self.state();
            state.error = None;
            let snapshot = state.items.clone();
            state.items.retain(|item| item.id() != id);
            snapshot
        };
        match self.remote.delete(id).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.record_failure("delete", &error);
                tracing::debug!(id, "restoring collection snapshot after failed delete");
                self.state().items = snapshot;
                Err(error)
            }
        }
    }

    pub(crate) async fn mutation_permit(&self) -> Option<AsyncMutexGuard<'_, ()>> {
        match &self.sequential {
            Some(gate) => Some(gate.lock().await),
            None => None,
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, CollectionSnapshot<T>> {
        lock_or_recover(&self.state)
    }

    pub(crate) fn clear_error(&self) {
        self.state().error = None;
    }

    pub(crate) fn record_failure(&self, operation: &str, error: &ApiError) {
        tracing::warn!(
            operation,
            status = error.status,
            error = %error,
            "collection mutation failed"
        );
        self.state().error = Some(error.message.clone());
    }

    /// Clears the error and applies `change` to the local item, stamping its
    /// modification time. Unknown ids leave the items untouched.
    pub(crate) fn modify_local(&self, id: &str, change: impl FnOnce(&mut T)) {
        let mut state = self.state();
        state.error = None;
        if let Some(item) = state.items.iter_mut().find(|item| item.id() == id) {
            change(item);
            item.touch(Utc::now());
        }
    }

    pub(crate) fn replace_item(&self, id: &str, replacement: T) {
        let mut state = self.state();
        if let Some(item) = state.items.iter_mut().find(|item| item.id() == id) {
            *item = replacement;
        }
    }

    /// Re-reads the server list; a failure leaves local state and the
    /// existing error untouched.
    pub(crate) async fn refetch_quietly(&self) {
        match self.remote.list().await {
            Ok(items) => self.state().items = items,
            Err(error) => {
                tracing::debug!(error = %error, "best-effort refetch failed; keeping local state");
            }
        }
    }
}
