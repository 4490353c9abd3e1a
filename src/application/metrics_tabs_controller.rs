// Metrics tabs controller - Session state for chart tabs of one displayed meeting
use crate::application::metric_tab_mutations::{
    CreateMetricTabInput, EditMetricTabInput, MetricTabMutations, MetricToTrack,
};
use crate::application::metrics_tabs_client::{
    MeetingTabs, MeetingTabsQuery, MetricsTabsClient, Subscription,
};
use crate::application::overlays::{OverlayController, Toast};
use crate::domain::chart_rules::{
    get_metric_disabled_state_and_tooltip_for_charting_metric, get_metrics_table_row_state,
    on_metrics_table_chart_button_click, ChartButtonAction, ChartButtonDisabledReason,
    ChartingMetricState, ChartingPermissionChecks, MetricsTableRowState,
};
use crate::domain::chart_tab::{ActiveTab, ActiveTabSessionInfo, ChartTab, Position, TabColor};
use crate::domain::metric::{Metric, MetricFrequency};
use crate::domain::permissions::{
    can_create_metrics_tabs_in_meeting, can_edit_metric_tab_in_meeting,
    can_perform_delete_actions_for_metric_tab_in_meeting, MeetingPermissions, PermissionCheck,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("metrics tabs are not being displayed")]
    NotDisplaying,
    #[error("there is no active tab")]
    NoActiveTab,
    #[error("active tab {0} is not in the tab bar")]
    ActiveTabNotDisplayed(String),
    #[error(transparent)]
    Client(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMetricsTabsOpts {
    pub meeting_id: String,
    pub user_id: String,
    pub frequency: MetricFrequency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetActiveTabOpts {
    NewTab,
    Tab { id: String },
}

/// Where the active tab's first snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ActiveTabSource {
    TabList,
    FetchedById,
}

struct DisplayedMeeting {
    meeting_id: String,
    user_id: String,
    frequency: MetricFrequency,
    permissions: MeetingPermissions,
    tabs: Subscription<MeetingTabs>,
}

struct ActiveTabHandle {
    source: ActiveTabSource,
    snapshot: ChartTab,
    live: Option<Subscription<ChartTab>>,
}

impl ActiveTabHandle {
    fn current(&self) -> ChartTab {
        match &self.live {
            Some(live) => live.current(),
            None => self.snapshot.clone(),
        }
    }
}

enum ActiveTabSlot {
    NewTab,
    Tab(ActiveTabHandle),
}

pub struct MetricsTabsController {
    client: Arc<dyn MetricsTabsClient>,
    mutations: Arc<dyn MetricTabMutations>,
    overlays: Arc<dyn OverlayController>,
    metric_term: String,
    displayed: Option<DisplayedMeeting>,
    active_tab: Option<ActiveTabSlot>,
    session_info: ActiveTabSessionInfo,
}

impl MetricsTabsController {
    pub fn new(
        client: Arc<dyn MetricsTabsClient>,
        mutations: Arc<dyn MetricTabMutations>,
        overlays: Arc<dyn OverlayController>,
        metric_term: impl Into<String>,
    ) -> Self {
        Self {
            client,
            mutations,
            overlays,
            metric_term: metric_term.into(),
            displayed: None,
            active_tab: None,
            session_info: ActiveTabSessionInfo::default(),
        }
    }

    pub async fn display_metrics_tabs(
        &mut self,
        opts: DisplayMetricsTabsOpts,
    ) -> Result<(), ControllerError> {
        let switching_session = self
            .displayed
            .as_ref()
            .is_some_and(|d| d.meeting_id != opts.meeting_id || d.user_id != opts.user_id);
        if switching_session {
            self.clear_active_tab();
        }

        let permissions = self
            .client
            .fetch_meeting_permissions(&opts.meeting_id, &opts.user_id)
            .await?;
        let tabs = self
            .client
            .subscribe_meeting_tabs(MeetingTabsQuery {
                meeting_id: opts.meeting_id.clone(),
                user_id: opts.user_id.clone(),
                frequency: opts.frequency,
            })
            .await?;

        tracing::info!(
            "Displaying {} metrics tabs for meeting {} (user {})",
            opts.frequency,
            opts.meeting_id,
            opts.user_id
        );

        self.displayed = Some(DisplayedMeeting {
            meeting_id: opts.meeting_id,
            user_id: opts.user_id,
            frequency: opts.frequency,
            permissions,
            tabs,
        });
        Ok(())
    }

    pub async fn hide_metrics_tabs(&mut self) {
        self.dismiss_active_tab().await;
        if let Some(displayed) = self.displayed.take() {
            tracing::info!("Stopped displaying metrics tabs for meeting {}", displayed.meeting_id);
        }
    }

    pub fn is_displaying(&self) -> bool {
        self.displayed.is_some()
    }

    pub fn meeting_id(&self) -> Option<&str> {
        self.displayed.as_ref().map(|d| d.meeting_id.as_str())
    }

    pub fn frequency(&self) -> Option<MetricFrequency> {
        self.displayed.as_ref().map(|d| d.frequency)
    }

    pub fn permissions(&self) -> Option<&MeetingPermissions> {
        self.displayed.as_ref().map(|d| &d.permissions)
    }

    /// Own tabs followed by shared tabs, in subscription order.
    pub fn all_tabs(&self) -> Vec<ChartTab> {
        self.displayed
            .as_ref()
            .map(|d| {
                d.tabs.with_current(|tabs| {
                    tabs.own.iter().chain(tabs.shared.iter()).cloned().collect()
                })
            })
            .unwrap_or_default()
    }

    pub fn tabs_to_display(&self) -> Vec<ChartTab> {
        self.all_tabs()
            .into_iter()
            .filter(|tab| tab.is_pinned_to_tab_bar)
            .collect()
    }

    pub fn active_tab(&self) -> Option<ActiveTab> {
        self.active_tab.as_ref().map(|slot| match slot {
            ActiveTabSlot::NewTab => ActiveTab::NewTab,
            ActiveTabSlot::Tab(handle) => ActiveTab::Tab(handle.current()),
        })
    }

    pub fn active_tab_source(&self) -> Option<ActiveTabSource> {
        match &self.active_tab {
            Some(ActiveTabSlot::Tab(handle)) => Some(handle.source),
            _ => None,
        }
    }

    pub fn active_tab_session_info(&self) -> &ActiveTabSessionInfo {
        &self.session_info
    }

    pub async fn set_active_tab(&mut self, opts: SetActiveTabOpts) -> Result<(), ControllerError> {
        let tab_id = match opts {
            SetActiveTabOpts::NewTab => {
                self.replace_active_tab(ActiveTabSlot::NewTab, None);
                return Ok(());
            }
            SetActiveTabOpts::Tab { id } => id,
        };

        let listed = self.all_tabs().into_iter().find(|tab| tab.id == tab_id);
        let (snapshot, source) = match listed {
            Some(tab) => (tab, ActiveTabSource::TabList),
            None => {
                // Not visible through the list yet: brand new, or another frequency.
                tracing::debug!("Tab {} not in tab list, fetching by id", tab_id);
                match self.client.fetch_tab(&tab_id).await {
                    Ok(tab) => (tab, ActiveTabSource::FetchedById),
                    Err(e) => {
                        tracing::error!("Failed to load tab {}: {:#}", tab_id, e);
                        self.overlays.open_toast(Toast::error("Failed to open chart"));
                        return Ok(());
                    }
                }
            }
        };

        // Release the previous tab's subscription before taking the next one.
        self.release_active_tab();
        let live = match self.client.subscribe_tab(&tab_id).await {
            Ok(live) => Some(live),
            Err(e) => {
                tracing::warn!("Live updates unavailable for tab {}: {:#}", tab_id, e);
                None
            }
        };

        if !snapshot.is_pinned_to_tab_bar && self.edit_check(&snapshot).allowed {
            self.spawn_pin(tab_id.clone());
        }

        self.replace_active_tab(
            ActiveTabSlot::Tab(ActiveTabHandle {
                source,
                snapshot,
                live,
            }),
            Some(&tab_id),
        );
        Ok(())
    }

    pub async fn go_to_next_tab(&mut self) -> Result<(), ControllerError> {
        self.step_active_tab(1).await
    }

    pub async fn go_to_previous_tab(&mut self) -> Result<(), ControllerError> {
        self.step_active_tab(-1).await
    }

    async fn step_active_tab(&mut self, step: isize) -> Result<(), ControllerError> {
        let active_id = match self.active_tab() {
            Some(ActiveTab::Tab(tab)) => tab.id,
            _ => return Err(ControllerError::NoActiveTab),
        };

        let tabs = self.tabs_to_display();
        let index = tabs
            .iter()
            .position(|tab| tab.id == active_id)
            .ok_or(ControllerError::ActiveTabNotDisplayed(active_id))?;

        let Some(target) = index.checked_add_signed(step).and_then(|i| tabs.get(i)) else {
            return Ok(());
        };

        self.set_active_tab(SetActiveTabOpts::Tab {
            id: target.id.clone(),
        })
        .await
    }

    pub async fn on_chart_metric_clicked_from_table(
        &mut self,
        metric: &Metric,
    ) -> Result<(), ControllerError> {
        if self.displayed.is_none() {
            return Err(ControllerError::NotDisplaying);
        }

        let active_tab = self.active_tab();
        let existing = match on_metrics_table_chart_button_click(metric, active_tab.as_ref()) {
            ChartButtonAction::AddToExistingTab(ActiveTab::Tab(tab)) => tab.clone(),
            ChartButtonAction::AddToExistingTab(ActiveTab::NewTab) | ChartButtonAction::NewTab => {
                return self.create_tab_with_metric(metric).await;
            }
        };

        if let Some(tracked) = existing.tracked_metrics.find_by_metric(&metric.id) {
            if let Err(e) = self
                .mutations
                .remove_metric_from_tab(&existing.id, &tracked.id)
                .await
            {
                self.toast_failure(format!("Failed to remove {} from chart", self.metric_term), e);
            }
            return Ok(());
        }

        let Some(color) = existing.tracked_metrics.next_unused_color() else {
            return Ok(());
        };
        let result = self
            .mutations
            .add_metric_to_tab(
                &existing.id,
                MetricToTrack {
                    metric_id: metric.id.clone(),
                    color,
                },
            )
            .await;
        if let Err(e) = result {
            self.toast_failure(format!("Failed to add {} to chart", self.metric_term), e);
        }
        Ok(())
    }

    async fn create_tab_with_metric(&mut self, metric: &Metric) -> Result<(), ControllerError> {
        let displayed = self.displayed.as_ref().ok_or(ControllerError::NotDisplaying)?;
        let input = CreateMetricTabInput {
            meeting_id: displayed.meeting_id.clone(),
            creator_id: displayed.user_id.clone(),
            name: None,
            frequency: displayed.frequency,
            units: metric.units,
            is_shared_to_meeting: false,
            is_pinned_to_tab_bar: true,
            metrics: vec![MetricToTrack {
                metric_id: metric.id.clone(),
                color: TabColor::Color1,
            }],
        };

        match self.mutations.create_metric_tab(input).await {
            Ok(tab_id) => {
                tracing::info!("Created chart tab {} for metric {}", tab_id, metric.id);
                self.set_active_tab(SetActiveTabOpts::Tab { id: tab_id }).await
            }
            Err(e) => {
                self.toast_failure(format!("Failed to chart {}", self.metric_term), e);
                Ok(())
            }
        }
    }

    pub async fn dismiss_active_tab(&mut self) {
        if let Some(ActiveTab::Tab(tab)) = self.active_tab() {
            if tab.is_empty() && self.delete_check(&tab).allowed {
                tracing::info!("Deleting empty chart tab {}", tab.id);
                if let Err(e) = self.mutations.delete_metric_tab(&tab.id).await {
                    self.toast_failure("Failed to delete chart".to_string(), e);
                }
            }
        }
        self.clear_active_tab();
    }

    pub async fn clear_active_tab_metrics(&mut self) -> Result<(), ControllerError> {
        let tab = match self.active_tab() {
            Some(ActiveTab::Tab(tab)) => tab,
            _ => return Err(ControllerError::NoActiveTab),
        };

        let check = self.delete_check(&tab);
        if !check.allowed {
            self.toast_denied(check);
            return Ok(());
        }

        if let Err(e) = self.mutations.remove_all_metrics_from_tab(&tab.id).await {
            self.toast_failure(format!("Failed to remove {} from chart", self.metric_term), e);
        }
        Ok(())
    }

    pub async fn edit_tab(
        &mut self,
        tab_id: &str,
        name: Option<String>,
        is_shared_to_meeting: bool,
    ) -> Result<(), ControllerError> {
        let tab = self.find_tab(tab_id).await?;
        let check = self.edit_check(&tab);
        if !check.allowed {
            self.toast_denied(check);
            return Ok(());
        }

        let input = EditMetricTabInput {
            tab_id: tab.id,
            name,
            is_shared_to_meeting,
        };
        if let Err(e) = self.mutations.edit_metric_tab(input).await {
            self.toast_failure("Failed to update chart".to_string(), e);
        }
        Ok(())
    }

    pub async fn set_tab_pinned(&mut self, tab_id: &str, pinned: bool) -> Result<(), ControllerError> {
        let tab = self.find_tab(tab_id).await?;
        let check = self.edit_check(&tab);
        if !check.allowed {
            self.toast_denied(check);
            return Ok(());
        }

        if let Err(e) = self.mutations.pin_or_unpin_metric_tab(&tab.id, pinned).await {
            self.toast_failure("Failed to update chart".to_string(), e);
            return Ok(());
        }

        let unpinned_active = !pinned
            && matches!(self.active_tab(), Some(ActiveTab::Tab(active)) if active.id == tab.id);
        if unpinned_active {
            self.dismiss_active_tab().await;
        }
        Ok(())
    }

    pub async fn update_frequency(&mut self, frequency: MetricFrequency) -> Result<(), ControllerError> {
        let displayed = self.displayed.as_ref().ok_or(ControllerError::NotDisplaying)?;
        let opts = DisplayMetricsTabsOpts {
            meeting_id: displayed.meeting_id.clone(),
            user_id: displayed.user_id.clone(),
            frequency,
        };

        self.clear_active_tab();
        self.display_metrics_tabs(opts).await
    }

    pub fn toggle_active_tab_expanded(&mut self) {
        self.session_info.expanded = !self.session_info.expanded;
    }

    pub fn move_active_tab(&mut self, position: Position) {
        self.session_info.last_dragged_to = Some(position);
    }

    /// Record where a resize pushed the popup; `None` clears it.
    pub fn set_active_tab_forced_position(&mut self, position: Option<Position>) {
        self.session_info.last_forcefully_moved_to = position;
    }

    /// The last dragged-to position fits again, so the forced position no longer applies.
    pub fn on_dragged_to_position_available(&mut self) {
        self.session_info.last_forcefully_moved_to = None;
    }

    pub fn metric_row_state(&self, metric: &Metric) -> MetricsTableRowState {
        get_metrics_table_row_state(metric.units, self.active_tab().as_ref())
    }

    pub fn charting_state(
        &self,
        metric: &Metric,
        reason_tooltip: impl Fn(ChartButtonDisabledReason) -> String,
    ) -> ChartingMetricState {
        let active_tab = self.active_tab();
        let row_state = get_metrics_table_row_state(metric.units, active_tab.as_ref());

        let create = self
            .permissions()
            .map(can_create_metrics_tabs_in_meeting)
            .unwrap_or_else(|| PermissionCheck::denied("Metrics tabs are not available"));
        let tab = active_tab.as_ref().and_then(ActiveTab::as_tab);
        let checks = ChartingPermissionChecks {
            create,
            delete: tab.map(|t| self.delete_check(t)).unwrap_or_else(PermissionCheck::allowed),
            edit: tab.map(|t| self.edit_check(t)).unwrap_or_else(PermissionCheck::allowed),
        };

        get_metric_disabled_state_and_tooltip_for_charting_metric(
            row_state,
            &checks,
            tab.is_some_and(|t| t.is_shared_to_meeting),
            tab.is_some_and(|t| t.tracked_metrics.contains_metric(&metric.id)),
            reason_tooltip,
        )
    }

    async fn find_tab(&self, tab_id: &str) -> Result<ChartTab, ControllerError> {
        if let Some(ActiveTab::Tab(tab)) = self.active_tab() {
            if tab.id == tab_id {
                return Ok(tab);
            }
        }
        if let Some(tab) = self.all_tabs().into_iter().find(|tab| tab.id == tab_id) {
            return Ok(tab);
        }
        Ok(self.client.fetch_tab(tab_id).await?)
    }

    fn replace_active_tab(&mut self, slot: ActiveTabSlot, tab_id: Option<&str>) {
        self.release_active_tab();
        self.active_tab = Some(slot);
        self.overlays.open_metrics_tab_popup(tab_id);
    }

    /// Drop the active tab and its subscription, closing its popup.
    fn release_active_tab(&mut self) {
        if self.active_tab.take().is_some() {
            self.overlays.close_metrics_tab_popup();
        }
    }

    fn clear_active_tab(&mut self) {
        self.release_active_tab();
        self.session_info = ActiveTabSessionInfo::default();
    }

    fn spawn_pin(&self, tab_id: String) {
        let mutations = Arc::clone(&self.mutations);
        let overlays = Arc::clone(&self.overlays);

        tokio::spawn(async move {
            if let Err(e) = mutations.pin_or_unpin_metric_tab(&tab_id, true).await {
                tracing::error!("Failed to pin tab {}: {:#}", tab_id, e);
                overlays.open_toast(Toast::error("Failed to pin chart to the tab bar"));
            }
        });
    }

    fn edit_check(&self, tab: &ChartTab) -> PermissionCheck {
        match self.permissions() {
            Some(permissions) => can_edit_metric_tab_in_meeting(permissions, tab),
            None => PermissionCheck::denied("Metrics tabs are not available"),
        }
    }

    fn delete_check(&self, tab: &ChartTab) -> PermissionCheck {
        match self.permissions() {
            Some(permissions) => can_perform_delete_actions_for_metric_tab_in_meeting(permissions, tab),
            None => PermissionCheck::denied("Metrics tabs are not available"),
        }
    }

    fn toast_failure(&self, text: String, error: anyhow::Error) {
        tracing::error!("{}: {:#}", text, error);
        self.overlays.open_toast(Toast::error(text));
    }

    fn toast_denied(&self, check: PermissionCheck) {
        let text = check
            .message
            .unwrap_or_else(|| "You do not have permission to do that".to_string());
        self.overlays.open_toast(Toast::error(text));
    }
}
