// Permission predicates for chart tabs in a meeting
use super::chart_tab::ChartTab;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeetingRole {
    Admin,
    Edit,
    View,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingPermissions {
    pub user_id: String,
    pub role: MeetingRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionCheck {
    pub allowed: bool,
    pub message: Option<String>,
}

impl PermissionCheck {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            message: None,
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            message: Some(message.into()),
        }
    }
}

pub fn can_create_metrics_tabs_in_meeting(permissions: &MeetingPermissions) -> PermissionCheck {
    match permissions.role {
        MeetingRole::None => {
            PermissionCheck::denied("You do not have permission to create charts in this meeting")
        }
        _ => PermissionCheck::allowed(),
    }
}

pub fn can_edit_metric_tab_in_meeting(
    permissions: &MeetingPermissions,
    tab: &ChartTab,
) -> PermissionCheck {
    if tab.creator.id == permissions.user_id {
        return PermissionCheck::allowed();
    }

    match permissions.role {
        MeetingRole::Admin | MeetingRole::Edit if tab.is_shared_to_meeting => {
            PermissionCheck::allowed()
        }
        _ => PermissionCheck::denied("You do not have permission to edit this chart"),
    }
}

pub fn can_perform_delete_actions_for_metric_tab_in_meeting(
    permissions: &MeetingPermissions,
    tab: &ChartTab,
) -> PermissionCheck {
    if tab.creator.id == permissions.user_id {
        return PermissionCheck::allowed();
    }

    match permissions.role {
        MeetingRole::Admin if tab.is_shared_to_meeting => PermissionCheck::allowed(),
        _ => PermissionCheck::denied("You do not have permission to remove metrics from this chart"),
    }
}
