// Mutation port for chart tabs
use crate::domain::chart_tab::TabColor;
use crate::domain::metric::{MetricFrequency, MetricUnits};
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct CreateMetricTabInput {
    pub meeting_id: String,
    pub creator_id: String,
    pub name: Option<String>,
    pub frequency: MetricFrequency,
    pub units: MetricUnits,
    pub is_shared_to_meeting: bool,
    pub is_pinned_to_tab_bar: bool,
    /// Metrics to seed the tab with, in display order.
    pub metrics: Vec<MetricToTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricToTrack {
    pub metric_id: String,
    pub color: TabColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditMetricTabInput {
    pub tab_id: String,
    pub name: Option<String>,
    pub is_shared_to_meeting: bool,
}

#[async_trait]
pub trait MetricTabMutations: Send + Sync {
    /// Create a tab; resolves to the new tab id
    async fn create_metric_tab(&self, input: CreateMetricTabInput) -> anyhow::Result<String>;

    async fn add_metric_to_tab(&self, tab_id: &str, metric: MetricToTrack) -> anyhow::Result<()>;

    async fn remove_metric_from_tab(&self, tab_id: &str, tracked_metric_id: &str)
        -> anyhow::Result<()>;

    async fn remove_all_metrics_from_tab(&self, tab_id: &str) -> anyhow::Result<()>;

    async fn pin_or_unpin_metric_tab(&self, tab_id: &str, pinned: bool) -> anyhow::Result<()>;

    async fn delete_metric_tab(&self, tab_id: &str) -> anyhow::Result<()>;

    async fn edit_metric_tab(&self, input: EditMetricTabInput) -> anyhow::Result<()>;
}
