// Application state for HTTP handlers
use crate::application::metric_tab_mutations::MetricTabMutations;
use crate::application::metrics_table_service::MetricsTableService;
use crate::application::metrics_tabs_client::MetricsTabsClient;
use crate::application::metrics_tabs_controller::MetricsTabsController;
use crate::infrastructure::tracing_overlays::TracingOverlays;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Sessions are keyed by (meeting id, user id).
pub type SessionKey = (String, String);

pub struct Session {
    pub controller: MetricsTabsController,
    pub overlays: Arc<TracingOverlays>,
}

pub struct AppState {
    pub client: Arc<dyn MetricsTabsClient>,
    pub mutations: Arc<dyn MetricTabMutations>,
    pub table_service: MetricsTableService,
    pub metric_term: String,
    pub sessions: Mutex<HashMap<SessionKey, Session>>,
}

impl AppState {
    pub fn new_session(&self) -> Session {
        let overlays = Arc::new(TracingOverlays::new());
        let controller = MetricsTabsController::new(
            self.client.clone(),
            self.mutations.clone(),
            overlays.clone(),
            self.metric_term.clone(),
        );
        Session {
            controller,
            overlays,
        }
    }
}
