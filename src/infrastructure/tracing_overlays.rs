// Overlay sink that logs through tracing and keeps a record of what was shown
use crate::application::overlays::{OverlayController, Toast};
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OverlayEvent {
    Toast(Toast),
    #[serde(rename_all = "camelCase")]
    PopupOpened { tab_id: Option<String> },
    PopupClosed,
}

#[derive(Default)]
pub struct TracingOverlays {
    events: Mutex<Vec<OverlayEvent>>,
}

impl TracingOverlays {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn events(&self) -> Vec<OverlayEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Remove and return recorded events, oldest first.
    pub fn drain(&self) -> Vec<OverlayEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn toasts(&self) -> Vec<Toast> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OverlayEvent::Toast(toast) => Some(toast),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: OverlayEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl OverlayController for TracingOverlays {
    fn open_toast(&self, toast: Toast) {
        tracing::warn!("Toast ({:?}): {}", toast.kind, toast.text);
        self.record(OverlayEvent::Toast(toast));
    }

    fn open_metrics_tab_popup(&self, tab_id: Option<&str>) {
        tracing::debug!("Opening metrics tab popup for {}", tab_id.unwrap_or("new tab"));
        self.record(OverlayEvent::PopupOpened {
            tab_id: tab_id.map(str::to_string),
        });
    }

    fn close_metrics_tab_popup(&self) {
        tracing::debug!("Closing metrics tab popup");
        self.record(OverlayEvent::PopupClosed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_events_in_order() {
        let overlays = TracingOverlays::new();
        overlays.open_metrics_tab_popup(None);
        overlays.open_toast(Toast::error("boom"));
        overlays.close_metrics_tab_popup();

        assert_eq!(
            overlays.events(),
            vec![
                OverlayEvent::PopupOpened { tab_id: None },
                OverlayEvent::Toast(Toast::error("boom")),
                OverlayEvent::PopupClosed,
            ]
        );
        assert_eq!(overlays.toasts().len(), 1);

        let wire = serde_json::to_value(OverlayEvent::PopupOpened {
            tab_id: Some("tab-1".to_string()),
        })
        .unwrap();
        assert_eq!(wire, serde_json::json!({ "event": "popupOpened", "tabId": "tab-1" }));

        assert_eq!(overlays.drain().len(), 3);
        assert!(overlays.events().is_empty());
    }
}
