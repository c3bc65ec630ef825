//! Pinned dashboard charts, including the grid reorder operation.
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

pub const CHARTS_PATH: &str = "/dashboard/charts";
/// Number of grid columns on the dashboard.
pub const DASHBOARD_COLUMNS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPosition {
    pub row: u32,
    #[serde(rename = "col")]
    pub column: u32,
    pub size: u32,
}

impl Default for ChartPosition {
    fn default() -> Self {
        Self {
            row: 0,
            column: 0,
            size: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedChart {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(default)]
    pub natural_language_query: String,
    #[serde(default)]
    pub sql_query: String,
    #[serde(default)]
    pub chart_spec: Value,
    #[serde(default)]
    pub chart_type: String,
    #[serde(default)]
    pub refresh_interval: u32,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub position: ChartPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refreshed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Payload for pinning a new chart.
pub struct PinnedChartDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    pub natural_language_query: String,
    pub sql_query: String,
    pub chart_spec: Value,
    pub chart_type: String,
    pub refresh_interval: u32,
    pub position: ChartPosition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedChartPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<ChartPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl CollectionItem for PinnedChart {
    type Draft = PinnedChartDraft;
    type Patch = PinnedChartPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn apply_patch(&mut self, patch: &Self::Patch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(refresh_interval) = patch.refresh_interval {
            self.refresh_interval = refresh_interval;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPositionUpdate {
    pub id: String,
    pub position: ChartPosition,
}

#[derive(Debug, Serialize)]
struct ReorderChartsBody<'a> {
    positions: &'a [ChartPositionUpdate],
}

#[async_trait]
/// Chart remotes additionally persist grid layouts and re-run chart queries.
pub trait ChartRemote: CollectionRemote<PinnedChart> {
    async fn reorder(&self, positions: &[ChartPositionUpdate]) -> Result<(), ApiError>;
    async fn refresh_chart(&self, id: &str) -> Result<PinnedChart, ApiError>;
}

#[async_trait]
impl ChartRemote for HttpCollection<PinnedChart> {
    async fn reorder(&self, positions: &[ChartPositionUpdate]) -> Result<(), ApiError> {
        let path = format!("{}/reorder", self.path());
        self.backend()
            .post_empty(&path, &ReorderChartsBody { positions })
            .await
    }

    async fn refresh_chart(&self, id: &str) -> Result<PinnedChart, ApiError> {
        let path = format!("{}/refresh", self.item_path(id));
        self.backend().post_action_json(&path).await
    }
}

pub type ChartStore<R = HttpCollection<PinnedChart>> = OptimisticStore<PinnedChart, R>;

pub fn chart_store(backend: BackendClient) -> ChartStore {
    OptimisticStore::new(HttpCollection::new(backend, CHARTS_PATH))
}

/// Orders `items` by `ids`, skipping unknown ids, then appends the items not
/// mentioned in their previous relative order. Positions are recomputed on a
/// grid of [`DASHBOARD_COLUMNS`] columns; sizes are kept.
pub fn layout_charts(items: &[PinnedChart], ids: &[String]) -> Vec<PinnedChart> {
    let mut remaining: Vec<Option<&PinnedChart>> = items.iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(items.len());
    for id in ids {
        if let Some(slot) = remaining
            .iter_mut()
            .find(|slot| matches!(slot, Some(chart) if chart.id == *id))
        {
            if let Some(chart) = slot.take() {
                ordered.push(chart.clone());
            }
        }
    }
    ordered.extend(remaining.into_iter().flatten().cloned());

    for (index, chart) in ordered.iter_mut().enumerate() {
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        chart.position = ChartPosition {
            row: index / DASHBOARD_COLUMNS,
            column: index % DASHBOARD_COLUMNS,
            size: chart.position.size,
        };
    }
    ordered
}

impl<R: ChartRemote> OptimisticStore<PinnedChart, R> {
    /// Moves charts into the order given by `ids` and persists the full
    /// position list. Re-fetches on failure.
    pub async fn reorder(&self, ids: &[String]) -> Result<(), ApiError> {
        let _permit = self.mutation_permit().await;
        let positions: Vec<ChartPositionUpdate> = {
            let mut state = self.state();
            state.error = None;
            let reordered = layout_charts(&state.items, ids);
            state.items = reordered;
            state
                .items
                .iter()
                .map(|chart| ChartPositionUpdate {
                    id: chart.id.clone(),
                    position: chart.position,
                })
                .collect()
        };
        match self.remote().reorder(&positions).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.record_failure("reorder", &error);
                self.refetch_quietly().await;
                Err(error)
            }
        }
    }

    /// Asks the server to refresh one chart and stores the returned chart.
    pub async fn refresh_chart(&self, id: &str) -> Result<PinnedChart, ApiError> {
        self.clear_error();
        let requested_at = Utc::now();
        match self.remote().refresh_chart(id).await {
            Ok(mut chart) => {
                // The server echoes the row read before it stamped the refresh.
                if chart.last_refreshed_at.map_or(true, |at| at < requested_at) {
                    chart.last_refreshed_at = Some(requested_at);
                }
                self.replace_item(id, chart.clone());
                Ok(chart)
            }
            Err(error) => {
                self.record_failure("refresh chart", &error);
                Err(error)
            }
        }
    }
}
