use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait contract for items owned by an [`crate::OptimisticStore`].
///
/// `Draft` is the create payload and `Patch` the partial update payload; both
/// are sent to the server as-is.
pub trait CollectionItem: Clone + Send + Sync + DeserializeOwned + 'static {
    type Draft: Serialize + Send + Sync;
    type Patch: Serialize + Send + Sync;

    fn id(&self) -> &str;

    /// Merges the fields present in `patch` into `self`.
    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Refreshes the local modification timestamp after an optimistic edit.
    fn touch(&mut self, _now: DateTime<Utc>) {}
}
