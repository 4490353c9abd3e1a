// HTTP request handlers
use crate::application::metrics_table_service::MetricsTable;
use crate::application::metrics_tabs_controller::{
    ActiveTabSource, ControllerError, DisplayMetricsTabsOpts, SetActiveTabOpts,
};
use crate::domain::chart_tab::{ActiveTab, ActiveTabSessionInfo, ChartTab, Position};
use crate::domain::metric::MetricFrequency;
use crate::infrastructure::tracing_overlays::OverlayEvent;
use crate::presentation::app_state::{AppState, Session};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no metrics tabs session for meeting {0} and user {1}")]
    SessionNotFound(String, String),
    #[error("metric {0} not found")]
    MetricNotFound(String),
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::SessionNotFound(..) | ApiError::MetricNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Controller(ControllerError::Client(e)) => {
                tracing::error!("Backend call failed: {:#}", e);
                StatusCode::BAD_GATEWAY
            }
            ApiError::Controller(_) => StatusCode::CONFLICT,
        };

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Deserialize)]
pub struct FrequencyRequest {
    pub frequency: MetricFrequency,
}

#[derive(Deserialize)]
pub struct PinRequest {
    pub pinned: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTabRequest {
    pub name: Option<String>,
    pub is_shared_to_meeting: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub displaying: bool,
    pub frequency: Option<MetricFrequency>,
    pub tabs_to_display: Vec<ChartTab>,
    pub active_tab: Option<ActiveTab>,
    /// Whether the active tab came from the tab list or a fetch by id.
    pub active_tab_source: Option<ActiveTabSource>,
    pub active_tab_session_info: ActiveTabSessionInfo,
    /// Toasts and popup events raised since the previous response.
    pub overlay_events: Vec<OverlayEvent>,
}

impl SessionView {
    fn of(session: &Session) -> Self {
        Self {
            displaying: session.controller.is_displaying(),
            frequency: session.controller.frequency(),
            tabs_to_display: session.controller.tabs_to_display(),
            active_tab: session.controller.active_tab(),
            active_tab_source: session.controller.active_tab_source(),
            active_tab_session_info: session.controller.active_tab_session_info().clone(),
            overlay_events: session.overlays.drain(),
        }
    }
}

type SessionPath = Path<(String, String)>;
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Start (or restart) displaying a meeting's tabs for a user
pub async fn display_tabs(
    Path((meeting_id, user_id)): SessionPath,
    State(state): State<Arc<AppState>>,
    Json(request): Json<FrequencyRequest>,
) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions
        .entry((meeting_id.clone(), user_id.clone()))
        .or_insert_with(|| state.new_session());

    session
        .controller
        .display_metrics_tabs(DisplayMetricsTabsOpts {
            meeting_id,
            user_id,
            frequency: request.frequency,
        })
        .await?;

    Ok(Json(SessionView::of(session)))
}

pub async fn hide_tabs(
    Path((meeting_id, user_id)): SessionPath,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    let removed = state.sessions.lock().await.remove(&(meeting_id, user_id));
    if let Some(mut session) = removed {
        session.controller.hide_metrics_tabs().await;
    }
    StatusCode::NO_CONTENT
}

pub async fn get_tabs(
    Path((meeting_id, user_id)): SessionPath,
    State(state): State<Arc<AppState>>,
) -> ApiResult<SessionView> {
    let sessions = state.sessions.lock().await;
    let session = sessions
        .get(&(meeting_id.clone(), user_id.clone()))
        .ok_or(ApiError::SessionNotFound(meeting_id, user_id))?;
    Ok(Json(SessionView::of(session)))
}

pub async fn new_tab(path: SessionPath, State(state): State<Arc<AppState>>) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, path)?;
    session.controller.set_active_tab(SetActiveTabOpts::NewTab).await?;
    Ok(Json(SessionView::of(session)))
}

pub async fn activate_tab(
    Path((meeting_id, user_id, tab_id)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, Path((meeting_id, user_id)))?;
    session
        .controller
        .set_active_tab(SetActiveTabOpts::Tab { id: tab_id })
        .await?;
    Ok(Json(SessionView::of(session)))
}

pub async fn next_tab(path: SessionPath, State(state): State<Arc<AppState>>) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, path)?;
    session.controller.go_to_next_tab().await?;
    Ok(Json(SessionView::of(session)))
}

pub async fn previous_tab(path: SessionPath, State(state): State<Arc<AppState>>) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, path)?;
    session.controller.go_to_previous_tab().await?;
    Ok(Json(SessionView::of(session)))
}

pub async fn dismiss_active_tab(
    path: SessionPath,
    State(state): State<Arc<AppState>>,
) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, path)?;
    session.controller.dismiss_active_tab().await;
    Ok(Json(SessionView::of(session)))
}

pub async fn clear_active_tab_metrics(
    path: SessionPath,
    State(state): State<Arc<AppState>>,
) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, path)?;
    session.controller.clear_active_tab_metrics().await?;
    Ok(Json(SessionView::of(session)))
}

pub async fn toggle_expanded(path: SessionPath, State(state): State<Arc<AppState>>) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, path)?;
    session.controller.toggle_active_tab_expanded();
    Ok(Json(SessionView::of(session)))
}

pub async fn move_active_tab(
    path: SessionPath,
    State(state): State<Arc<AppState>>,
    Json(position): Json<Position>,
) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, path)?;
    session.controller.move_active_tab(position);
    Ok(Json(SessionView::of(session)))
}

pub async fn force_active_tab_position(
    path: SessionPath,
    State(state): State<Arc<AppState>>,
    Json(position): Json<Option<Position>>,
) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, path)?;
    session.controller.set_active_tab_forced_position(position);
    Ok(Json(SessionView::of(session)))
}

pub async fn dragged_position_available(
    path: SessionPath,
    State(state): State<Arc<AppState>>,
) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, path)?;
    session.controller.on_dragged_to_position_available();
    Ok(Json(SessionView::of(session)))
}

pub async fn update_frequency(
    path: SessionPath,
    State(state): State<Arc<AppState>>,
    Json(request): Json<FrequencyRequest>,
) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, path)?;
    session.controller.update_frequency(request.frequency).await?;
    Ok(Json(SessionView::of(session)))
}

pub async fn metrics_table(path: SessionPath, State(state): State<Arc<AppState>>) -> ApiResult<MetricsTable> {
    let sessions = state.sessions.lock().await;
    let Path((meeting_id, user_id)) = path;
    let session = sessions
        .get(&(meeting_id.clone(), user_id.clone()))
        .ok_or(ApiError::SessionNotFound(meeting_id, user_id))?;

    let today = chrono::Utc::now().date_naive();
    let table = state.table_service.build_table(&session.controller, today).await?;
    Ok(Json(table))
}

/// The chart button of a metrics table row was clicked
pub async fn chart_metric(
    Path((meeting_id, user_id, metric_id)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, Path((meeting_id, user_id)))?;

    let metric = state
        .table_service
        .find_metric(&session.controller, &metric_id)
        .await?
        .ok_or(ApiError::MetricNotFound(metric_id))?;
    session.controller.on_chart_metric_clicked_from_table(&metric).await?;
    Ok(Json(SessionView::of(session)))
}

pub async fn pin_tab(
    Path((meeting_id, user_id, tab_id)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<PinRequest>,
) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, Path((meeting_id, user_id)))?;
    session.controller.set_tab_pinned(&tab_id, request.pinned).await?;
    Ok(Json(SessionView::of(session)))
}

pub async fn edit_tab(
    Path((meeting_id, user_id, tab_id)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<EditTabRequest>,
) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = session_mut(&mut sessions, Path((meeting_id, user_id)))?;
    session
        .controller
        .edit_tab(&tab_id, request.name, request.is_shared_to_meeting)
        .await?;
    Ok(Json(SessionView::of(session)))
}

fn session_mut<'a>(
    sessions: &'a mut std::collections::HashMap<(String, String), Session>,
    Path((meeting_id, user_id)): SessionPath,
) -> Result<&'a mut Session, ApiError> {
    let key = (meeting_id, user_id);
    match sessions.get_mut(&key) {
        Some(session) => Ok(session),
        None => Err(ApiError::SessionNotFound(key.0, key.1)),
    }
}
