use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medisync_client::BackendClient;
use medisync_core::ApiError;
use serde::{Deserialize, Serialize};

use crate::{
    item::CollectionItem,
    notifications::Notification,
    remote::{CollectionRemote, HttpCollection},
    store::OptimisticStore,
};

pub const ALERT_RULES_PATH: &str = "/alerts/rules";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Threshold alert on a tracked metric.
pub struct AlertRule {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub metric_id: String,
    #[serde(default)]
    pub metric_name: String,
    /// One of `gt`, `gte`, `lt`, `lte`, `eq`.
    pub operator: String,
    pub threshold: f64,
    /// Seconds between evaluations.
    #[serde(default)]
    pub check_interval: u32,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub cooldown_period: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_value: Option<f64>,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRuleDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub metric_id: String,
    pub metric_name: String,
    pub operator: String,
    pub threshold: f64,
    pub check_interval: u32,
    pub channels: Vec<String>,
    pub cooldown_period: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRulePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_period: Option<u32>,
}

impl CollectionItem for AlertRule {
    type Draft = AlertRuleDraft;
    type Patch = AlertRulePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply_patch(&mut self, patch: &Self::Patch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(threshold) = patch.threshold {
            self.threshold = threshold;
        }
        if let Some(check_interval) = patch.check_interval {
            self.check_interval = check_interval;
        }
        if let Some(channels) = &patch.channels {
            self.channels = channels.clone();
        }
        if let Some(cooldown_period) = patch.cooldown_period {
            self.cooldown_period = cooldown_period;
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToggleRuleBody {
    is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
/// Server answer to a rule test: the in-app notification it produced.
pub struct RuleTestOutcome {
    #[serde(default)]
    pub success: bool,
    pub notification: Notification,
}

#[async_trait]
/// Activation and test actions live on their own routes; the regular
/// update route ignores `isActive`.
pub trait AlertRuleRemote: CollectionRemote<AlertRule> {
    async fn toggle(&self, id: &str, active: bool) -> Result<(), ApiError>;
    async fn test_rule(&self, id: &str) -> Result<RuleTestOutcome, ApiError>;
}

#[async_trait]
impl AlertRuleRemote for HttpCollection<AlertRule> {
    async fn toggle(&self, id: &str, active: bool) -> Result<(), ApiError> {
        let path = format!("{}/toggle", self.item_path(id));
        self.backend()
            .post_empty(&path, &ToggleRuleBody { is_active: active })
            .await
    }

    async fn test_rule(&self, id: &str) -> Result<RuleTestOutcome, ApiError> {
        let path = format!("{}/test", self.item_path(id));
        self.backend().post_action_json(&path).await
    }
}

pub type AlertRuleStore<R = HttpCollection<AlertRule>> = OptimisticStore<AlertRule, R>;

pub fn alert_rule_store(backend: BackendClient) -> AlertRuleStore {
    OptimisticStore::new(HttpCollection::new(backend, ALERT_RULES_PATH))
}

impl<R: AlertRuleRemote> OptimisticStore<AlertRule, R> {
    /// Sets `isActive` locally, then through the toggle route. Re-fetches on
    /// failure.
    pub async fn toggle(&self, id: &str, active: bool) -> Result<(), ApiError> {
        let _permit = self.mutation_permit().await;
        self.modify_local(id, |rule| rule.is_active = active);
        match self.remote().toggle(id, active).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.record_failure("toggle", &error);
                self.refetch_quietly().await;
                Err(error)
            }
        }
    }

    /// Fires a test notification for the rule. Local rules are not touched.
    pub async fn test_rule(&self, id: &str) -> Result<Notification, ApiError> {
        self.clear_error();
        match self.remote().test_rule(id).await {
            Ok(outcome) => {
                tracing::debug!(id, success = outcome.success, "alert rule test sent");
                Ok(outcome.notification)
            }
            Err(error) => {
                self.record_failure("test", &error);
                Err(error)
            }
        }
    }
}
