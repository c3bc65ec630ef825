use std::marker::PhantomData;

use async_trait::async_trait;
use medisync_client::BackendClient;
use medisync_core::ApiError;

use crate::item::CollectionItem;

#[async_trait]
/// Trait contract for the server side of a collection.
pub trait CollectionRemote<T: CollectionItem>: Send + Sync {
    async fn list(&self) -> Result<Vec<T>, ApiError>;
    async fn create(&self, draft: &T::Draft) -> Result<T, ApiError>;
    async fn update(&self, id: &str, patch: &T::Patch) -> Result<T, ApiError>;
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

/// REST collection rooted at one path: `GET/POST {path}`,
/// `PATCH/DELETE {path}/{id}`.
pub struct HttpCollection<T> {
    backend: BackendClient,
    path: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> Clone for HttpCollection<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            path: self.path.clone(),
            _item: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for HttpCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCollection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<T> HttpCollection<T> {
    pub fn new(backend: BackendClient, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            backend,
            path: path.trim_end_matches('/').to_string(),
            _item: PhantomData,
        }
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.path, id)
    }
}

#[async_trait]
impl<T: CollectionItem> CollectionRemote<T> for HttpCollection<T> {
    async fn list(&self) -> Result<Vec<T>, ApiError> {
        self.backend.get_json(&self.path).await
    }

    async fn create(&self, draft: &T::Draft) -> Result<T, ApiError> {
        self.backend.post_json(&self.path, draft).await
    }

    async fn update(&self, id: &str, patch: &T::Patch) -> Result<T, ApiError> {
        self.backend.patch_json(&self.item_path(id), patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.backend.delete(&self.item_path(id)).await
    }
}
