// Metrics table service - Rows and date columns for the session's metrics table
use crate::application::metrics_tabs_client::MetricsTabsClient;
use crate::application::metrics_tabs_controller::{ControllerError, MetricsTabsController};
use crate::domain::chart_rules::{ChartButtonDisabledReason, ChartingMetricState, MetricsTableRowState};
use crate::domain::chart_tab::{ActiveTab, TabColor, MAX_TRACKED_METRICS};
use crate::domain::date_ranges::{get_date_ranges, DateRange};
use crate::domain::metric::{Metric, MetricFrequency};
use crate::infrastructure::config::{TableSettings, Terminology};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsTableRow {
    pub metric: Metric,
    pub row_state: MetricsTableRowState,
    pub charting: ChartingMetricState,
    /// Color of the metric in the active tab, when charted there.
    pub chart_color: Option<TabColor>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsTable {
    pub frequency: MetricFrequency,
    pub date_ranges: Vec<DateRange>,
    pub rows: Vec<MetricsTableRow>,
}

#[derive(Clone)]
pub struct MetricsTableService {
    client: Arc<dyn MetricsTabsClient>,
    terminology: Terminology,
    table: TableSettings,
}

impl MetricsTableService {
    pub fn new(client: Arc<dyn MetricsTabsClient>, terminology: Terminology, table: TableSettings) -> Self {
        Self {
            client,
            terminology,
            table,
        }
    }

    pub async fn build_table(
        &self,
        controller: &MetricsTabsController,
        today: NaiveDate,
    ) -> Result<MetricsTable, ControllerError> {
        let (meeting_id, frequency) = match (controller.meeting_id(), controller.frequency()) {
            (Some(meeting_id), Some(frequency)) => (meeting_id.to_string(), frequency),
            _ => return Err(ControllerError::NotDisplaying),
        };

        let metrics = self.client.list_meeting_metrics(&meeting_id, frequency).await?;
        let active_tab = controller.active_tab();
        let tracked = active_tab
            .as_ref()
            .and_then(ActiveTab::as_tab)
            .map(|tab| &tab.tracked_metrics);

        let rows = metrics
            .into_iter()
            .map(|metric| MetricsTableRow {
                row_state: controller.metric_row_state(&metric),
                charting: controller.charting_state(&metric, |reason| self.chart_button_tooltip(reason)),
                chart_color: tracked
                    .and_then(|t| t.find_by_metric(&metric.id))
                    .map(|t| t.color),
                metric,
            })
            .collect();

        Ok(MetricsTable {
            frequency,
            date_ranges: get_date_ranges(frequency, today, self.table.periods, self.table.week_start),
            rows,
        })
    }

    pub async fn find_metric(
        &self,
        controller: &MetricsTabsController,
        metric_id: &str,
    ) -> Result<Option<Metric>, ControllerError> {
        let (meeting_id, frequency) = match (controller.meeting_id(), controller.frequency()) {
            (Some(meeting_id), Some(frequency)) => (meeting_id.to_string(), frequency),
            _ => return Err(ControllerError::NotDisplaying),
        };

        let metrics = self.client.list_meeting_metrics(&meeting_id, frequency).await?;
        Ok(metrics.into_iter().find(|m| m.id == metric_id))
    }

    pub fn chart_button_tooltip(&self, reason: ChartButtonDisabledReason) -> String {
        let metrics = &self.terminology.metrics;
        match reason {
            ChartButtonDisabledReason::YesNoMetric => format!("Yes/No {} cannot be charted", metrics),
            ChartButtonDisabledReason::MaxMetricsTracked => {
                format!("A chart can show up to {} {}", MAX_TRACKED_METRICS, metrics)
            }
            ChartButtonDisabledReason::UnitTypeMismatch => {
                format!("Only {} with the same units can be charted together", metrics)
            }
        }
    }
}
