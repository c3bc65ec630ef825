use chrono::{DateTime, Utc};
use medisync_client::BackendClient;
use serde::{Deserialize, Serialize};

use crate::{item::CollectionItem, remote::HttpCollection, store::OptimisticStore};

pub const SCHEDULED_REPORTS_PATH: &str = "/reports/schedules";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecipient {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReport {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(default)]
    pub natural_language_query: String,
    #[serde(default)]
    pub sql_query: String,
    /// `daily`, `weekly`, `monthly` or `quarterly`.
    pub schedule_type: String,
    /// Wall-clock time as `HH:MM`.
    pub schedule_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_day: Option<u32>,
    #[serde(default)]
    pub recipients: Vec<ReportRecipient>,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub include_charts: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReportDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    pub natural_language_query: String,
    pub sql_query: String,
    pub schedule_type: String,
    pub schedule_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_day: Option<u32>,
    pub recipients: Vec<ReportRecipient>,
    pub format: String,
    pub include_charts: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReportPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<ReportRecipient>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_charts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl CollectionItem for ScheduledReport {
    type Draft = ScheduledReportDraft;
    type Patch = ScheduledReportPatch;

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
        if let Some(schedule_type) = &patch.schedule_type {
            self.schedule_type = schedule_type.clone();
        }
        if let Some(schedule_time) = &patch.schedule_time {
            self.schedule_time = schedule_time.clone();
        }
        if patch.schedule_day.is_some() {
            self.schedule_day = patch.schedule_day;
        }
        if let Some(recipients) = &patch.recipients {
            self.recipients = recipients.clone();
        }
        if let Some(format) = &patch.format {
            self.format = format.clone();
        }
        if let Some(include_charts) = patch.include_charts {
            self.include_charts = include_charts;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

pub type ScheduledReportStore<R = HttpCollection<ScheduledReport>> =
    OptimisticStore<ScheduledReport, R>;

pub fn scheduled_report_store(backend: BackendClient) -> ScheduledReportStore {
    OptimisticStore::new(HttpCollection::new(backend, SCHEDULED_REPORTS_PATH))
}
