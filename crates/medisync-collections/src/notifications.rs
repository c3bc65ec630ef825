use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medisync_client::BackendClient;
use medisync_core::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    item::CollectionItem,
    remote::{CollectionRemote, HttpCollection},
    store::OptimisticStore,
};

pub const NOTIFICATIONS_PATH: &str = "/notifications";
pub const STATUS_READ: &str = "read";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Delivery record produced when an alert rule fires.
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub alert_rule_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub metric_value: f64,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some() || self.status == STATUS_READ
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDraft {
    pub alert_rule_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Value,
    pub metric_value: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

impl CollectionItem for Notification {
    type Draft = NotificationDraft;
    type Patch = NotificationPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply_patch(&mut self, patch: &Self::Patch) {
        if let Some(status) = &patch.status {
            self.status = status.clone();
        }
        if patch.read_at.is_some() {
            self.read_at = patch.read_at;
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkedRead {
    #[serde(default)]
    marked_read: u64,
}

#[derive(Debug, Deserialize)]
struct UnreadCount {
    count: u64,
}

#[async_trait]
/// Notifications are read-only on the server apart from their read state:
/// `POST {path}/{id}/read`, `POST {path}/read-all`, `GET {path}/unread-count`.
pub trait NotificationRemote: CollectionRemote<Notification> {
    async fn mark_read(&self, id: &str) -> Result<(), ApiError>;
    /// Returns how many notifications the server marked.
    async fn mark_all_read(&self) -> Result<u64, ApiError>;
    async fn unread_count(&self) -> Result<u64, ApiError>;
}

#[async_trait]
impl NotificationRemote for HttpCollection<Notification> {
    async fn mark_read(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("{}/read", self.item_path(id));
        self.backend().post_action(&path).await
    }

    async fn mark_all_read(&self) -> Result<u64, ApiError> {
        let path = format!("{}/read-all", self.path());
        let marked: MarkedRead = self.backend().post_action_json(&path).await?;
        Ok(marked.marked_read)
    }

    async fn unread_count(&self) -> Result<u64, ApiError> {
        let path = format!("{}/unread-count", self.path());
        let unread: UnreadCount = self.backend().get_json(&path).await?;
        Ok(unread.count)
    }
}

fn read_patch(now: DateTime<Utc>) -> NotificationPatch {
    NotificationPatch {
        status: Some(STATUS_READ.to_string()),
        read_at: Some(now),
    }
}

pub type NotificationStore<R = HttpCollection<Notification>> = OptimisticStore<Notification, R>;

pub fn notification_store(backend: BackendClient) -> NotificationStore {
    OptimisticStore::new(HttpCollection::new(backend, NOTIFICATIONS_PATH))
}

impl<R: NotificationRemote> OptimisticStore<Notification, R> {
    /// Marks one notification read locally, then on the server. Re-fetches
    /// on failure.
    pub async fn mark_read(&self, id: &str) -> Result<(), ApiError> {
        let _permit = self.mutation_permit().await;
        let patch = read_patch(Utc::now());
        self.modify_local(id, |notification| notification.apply_patch(&patch));
        match self.remote().mark_read(id).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.record_failure("mark read", &error);
                self.refetch_quietly().await;
                Err(error)
            }
        }
    }

    /// Marks every local notification read, then asks the server to do the
    /// same. Restores the previous items if the server refuses.
    pub async fn mark_all_read(&self) -> Result<u64, ApiError> {
        let _permit = self.mutation_permit().await;
        let snapshot = {
            let mut state = self.state();
            state.error = None;
            let snapshot = state.items.clone();
            let patch = read_patch(Utc::now());
            for notification in state.items.iter_mut().filter(|item| !item.is_read()) {
                notification.apply_patch(&patch);
            }
            snapshot
        };
        match self.remote().mark_all_read().await {
            Ok(marked) => Ok(marked),
            Err(error) => {
                self.record_failure("mark all read", &error);
                self.state().items = snapshot;
                Err(error)
            }
        }
    }

    /// Unread notifications among the loaded items.
    pub fn unread_count(&self) -> usize {
        self.items()
            .iter()
            .filter(|notification| !notification.is_read())
            .count()
    }

    /// Unread total as counted by the server, including notifications not
    /// loaded locally.
    pub async fn fetch_unread_count(&self) -> Result<u64, ApiError> {
        self.remote().unread_count().await.map_err(|error| {
            tracing::warn!(status = error.status, error = %error, "unread count failed");
            self.state().error = Some(error.message.clone());
            error
        })
    }
}
