// Route table for the metrics tabs view-model host
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    activate_tab, chart_metric, clear_active_tab_metrics, dismiss_active_tab, display_tabs,
    dragged_position_available, edit_tab, force_active_tab_position, get_tabs, health_check,
    hide_tabs, metrics_table, move_active_tab, new_tab, next_tab, pin_tab, previous_tab,
    toggle_expanded, update_frequency,
};
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const SESSION: &str = "/meetings/:meeting_id/users/:user_id";

pub fn build_router(state: Arc<AppState>) -> Router {
    let session_routes = Router::new()
        .route("/tabs", get(get_tabs))
        .route("/tabs/display", post(display_tabs).delete(hide_tabs))
        .route("/tabs/new", post(new_tab))
        .route("/tabs/next", post(next_tab))
        .route("/tabs/previous", post(previous_tab))
        .route("/tabs/active", delete(dismiss_active_tab))
        .route("/tabs/active/metrics", delete(clear_active_tab_metrics))
        .route("/tabs/active/expand", post(toggle_expanded))
        .route("/tabs/active/move", post(move_active_tab))
        .route("/tabs/active/forced-position", put(force_active_tab_position))
        .route("/tabs/active/position-available", post(dragged_position_available))
        .route("/chart-tabs/:tab_id", patch(edit_tab))
        .route("/chart-tabs/:tab_id/activate", post(activate_tab))
        .route("/chart-tabs/:tab_id/pin", put(pin_tab))
        .route("/frequency", put(update_frequency))
        .route("/metrics/table", get(metrics_table))
        .route("/metrics/:metric_id/chart", post(chart_metric));

    Router::new()
        .route("/healthz", get(health_check))
        .nest(SESSION, session_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::metrics_table_service::MetricsTableService;
    use crate::infrastructure::config::{SeedConfig, TableSettings, Terminology};
    use crate::infrastructure::in_memory_backend::InMemoryMetricsBackend;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use config::{Config, File, FileFormat};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const SEED: &str = r#"
[[meetings]]
id = "weekly"

[[meetings.members]]
user_id = "ada"
role = "ADMIN"

[[meetings.metrics]]
id = "revenue"
title = "Revenue"
units = "DOLLAR"
frequency = "WEEKLY"

[[meetings.metrics]]
id = "margin"
title = "Margin"
units = "PERCENT"
frequency = "WEEKLY"

[[meetings.metrics]]
id = "shipped"
title = "Shipped"
units = "YESNO"
frequency = "WEEKLY"

[[meetings.tabs]]
id = "money"
creator_id = "grace"
frequency = "WEEKLY"
units = "DOLLAR"
shared = true
metrics = ["revenue"]
"#;

    fn app() -> Router {
        let seed: SeedConfig = Config::builder()
            .add_source(File::from_str(SEED, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        let backend = Arc::new(InMemoryMetricsBackend::from_seed(&seed).unwrap());

        let state = Arc::new(AppState {
            client: backend.clone(),
            mutations: backend.clone(),
            table_service: MetricsTableService::new(
                backend.clone(),
                Terminology::default(),
                TableSettings::default(),
            ),
            metric_term: "metric".to_string(),
            sessions: Mutex::new(HashMap::new()),
        });
        build_router(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = app();
        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = app();
        let (status, body) = send(&app, "GET", "/meetings/weekly/users/ada/tabs", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("weekly"));
    }

    #[tokio::test]
    async fn test_chart_session_flow() {
        let app = app();
        let base = "/meetings/weekly/users/ada";

        let (status, body) = send(&app, "POST", &format!("{base}/tabs/display"), Some(json!({ "frequency": "WEEKLY" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tabsToDisplay"][0]["id"], "money");
        assert_eq!(body["displaying"], true);
        assert_eq!(body["activeTab"], Value::Null);
        assert_eq!(body["activeTabSource"], Value::Null);

        let (status, body) = send(&app, "POST", &format!("{base}/metrics/revenue/chart"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["activeTab"]["kind"], "tab");
        assert_eq!(body["activeTab"]["trackedMetrics"]["totalCount"], 1);
        assert_eq!(body["activeTab"]["trackedMetrics"]["nodes"][0]["color"], "COLOR1");
        assert_eq!(body["activeTabSource"], "tabList");
        assert_eq!(body["overlayEvents"][0]["event"], "popupOpened");
        assert_eq!(body["overlayEvents"][0]["tabId"], body["activeTab"]["id"]);

        let (status, table) = send(&app, "GET", &format!("{base}/metrics/table"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(table["dateRanges"].as_array().unwrap().len(), 13);

        let rows: HashMap<String, Value> = table["rows"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| (row["metric"]["id"].as_str().unwrap().to_string(), row.clone()))
            .collect();
        assert_eq!(rows["revenue"]["chartColor"], "COLOR1");
        assert_eq!(rows["revenue"]["rowState"]["chartButtonEnabled"], true);
        assert_eq!(
            rows["margin"]["rowState"],
            json!({ "chartButtonEnabled": false, "chartButtonDisabledReason": "UNIT_TYPE_MISMATCH" })
        );
        assert_eq!(rows["shipped"]["rowState"]["chartButtonDisabledReason"], "YES_NO_METRIC");
        assert_eq!(rows["shipped"]["charting"]["tooltip"], "Yes/No metrics cannot be charted");

        let (status, body) = send(&app, "POST", &format!("{base}/tabs/active/move"), Some(json!({ "x": 4.0, "y": 2.0 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["activeTabSessionInfo"]["lastDraggedTo"], json!({ "x": 4.0, "y": 2.0 }));

        let (status, _) = send(&app, "DELETE", &format!("{base}/tabs/display"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("{base}/tabs"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_navigation_without_active_tab_conflicts() {
        let app = app();
        let base = "/meetings/weekly/users/ada";
        send(&app, "POST", &format!("{base}/tabs/display"), Some(json!({ "frequency": "WEEKLY" }))).await;

        let (status, body) = send(&app, "POST", &format!("{base}/tabs/next"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "there is no active tab");
    }

    #[tokio::test]
    async fn test_unknown_metric_is_not_found() {
        let app = app();
        let base = "/meetings/weekly/users/ada";
        send(&app, "POST", &format!("{base}/tabs/display"), Some(json!({ "frequency": "WEEKLY" }))).await;

        let (status, _) = send(&app, "POST", &format!("{base}/metrics/nope/chart"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
