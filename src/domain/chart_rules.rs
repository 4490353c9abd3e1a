// Chart tab assignment rules and metrics-table row state
use super::chart_tab::ActiveTab;
use super::metric::{Metric, MetricUnits};
use super::permissions::PermissionCheck;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddToTabRejection {
    UnitTypeMismatch,
    MaxMetricsTracked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddToTabOutcome {
    CanBeAdded,
    Rejected(AddToTabRejection),
}

impl AddToTabOutcome {
    pub fn can_be_added(self) -> bool {
        matches!(self, AddToTabOutcome::CanBeAdded)
    }
}

/// Whether a metric with `units` may join `tab`. A new tab adopts whatever
/// units the first metric has, so it accepts anything.
pub fn metric_can_be_added_to_tab_by_user(tab: &ActiveTab, units: MetricUnits) -> AddToTabOutcome {
    let tab = match tab {
        ActiveTab::NewTab => return AddToTabOutcome::CanBeAdded,
        ActiveTab::Tab(tab) => tab,
    };

    if tab.units != units {
        return AddToTabOutcome::Rejected(AddToTabRejection::UnitTypeMismatch);
    }

    if tab.is_full() {
        return AddToTabOutcome::Rejected(AddToTabRejection::MaxMetricsTracked);
    }

    AddToTabOutcome::CanBeAdded
}

#[derive(Debug, PartialEq)]
pub enum ChartButtonAction<'a> {
    AddToExistingTab(&'a ActiveTab),
    NewTab,
}

/// Decide where a metric clicked in the table goes. Toggling off an already
/// tracked metric is left to the caller.
pub fn on_metrics_table_chart_button_click<'a>(
    metric: &Metric,
    active_tab: Option<&'a ActiveTab>,
) -> ChartButtonAction<'a> {
    if let Some(active_tab) = active_tab {
        if active_tab.is_new_tab()
            || metric_can_be_added_to_tab_by_user(active_tab, metric.units).can_be_added()
        {
            return ChartButtonAction::AddToExistingTab(active_tab);
        }
    }

    ChartButtonAction::NewTab
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChartButtonDisabledReason {
    YesNoMetric,
    MaxMetricsTracked,
    UnitTypeMismatch,
}

impl From<AddToTabRejection> for ChartButtonDisabledReason {
    fn from(rejection: AddToTabRejection) -> Self {
        match rejection {
            AddToTabRejection::UnitTypeMismatch => ChartButtonDisabledReason::UnitTypeMismatch,
            AddToTabRejection::MaxMetricsTracked => ChartButtonDisabledReason::MaxMetricsTracked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsTableRowState {
    Enabled,
    Disabled { reason: ChartButtonDisabledReason },
}

impl Serialize for MetricsTableRowState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire {
            chart_button_enabled: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            chart_button_disabled_reason: Option<ChartButtonDisabledReason>,
        }

        Wire {
            chart_button_enabled: self.chart_button_enabled(),
            chart_button_disabled_reason: self.disabled_reason(),
        }
        .serialize(serializer)
    }
}

impl MetricsTableRowState {
    pub fn chart_button_enabled(&self) -> bool {
        matches!(self, MetricsTableRowState::Enabled)
    }

    pub fn disabled_reason(&self) -> Option<ChartButtonDisabledReason> {
        match self {
            MetricsTableRowState::Enabled => None,
            MetricsTableRowState::Disabled { reason } => Some(*reason),
        }
    }
}

pub fn get_metrics_table_row_state(
    units: MetricUnits,
    active_tab: Option<&ActiveTab>,
) -> MetricsTableRowState {
    // Yes/no wins over every tab check, including having no tab at all.
    if !units.is_chartable() {
        return MetricsTableRowState::Disabled {
            reason: ChartButtonDisabledReason::YesNoMetric,
        };
    }

    match active_tab.map(|tab| metric_can_be_added_to_tab_by_user(tab, units)) {
        Some(AddToTabOutcome::Rejected(rejection)) => MetricsTableRowState::Disabled {
            reason: rejection.into(),
        },
        _ => MetricsTableRowState::Enabled,
    }
}

/// Permission checks relevant to charting a single metric.
#[derive(Debug, Clone)]
pub struct ChartingPermissionChecks {
    pub create: PermissionCheck,
    pub delete: PermissionCheck,
    pub edit: PermissionCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartingMetricState {
    pub disabled_state_for_charting_metric: bool,
    pub tooltip: Option<String>,
}

pub fn get_metric_disabled_state_and_tooltip_for_charting_metric(
    row_state: MetricsTableRowState,
    checks: &ChartingPermissionChecks,
    is_shared_to_meeting: bool,
    is_metric_already_charted: bool,
    reason_tooltip: impl Fn(ChartButtonDisabledReason) -> String,
) -> ChartingMetricState {
    // Removing a charted metric is a delete action, adding one is an edit.
    let tab_check = if is_metric_already_charted {
        &checks.delete
    } else {
        &checks.edit
    };
    let blocked_by_tab_permission = is_shared_to_meeting && !tab_check.allowed;

    let tooltip = if !checks.create.allowed {
        checks.create.message.clone()
    } else if blocked_by_tab_permission {
        tab_check.message.clone()
    } else {
        row_state.disabled_reason().map(reason_tooltip)
    };

    ChartingMetricState {
        disabled_state_for_charting_metric: !row_state.chart_button_enabled()
            || !checks.create.allowed
            || blocked_by_tab_permission,
        tooltip,
    }
}
