// Overlay port - toasts and the floating chart popup
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: String,
}

impl Toast {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            text: text.into(),
        }
    }
}

pub trait OverlayController: Send + Sync {
    fn open_toast(&self, toast: Toast);

    /// Open the chart popup. `None` opens it for a tab not created yet.
    fn open_metrics_tab_popup(&self, tab_id: Option<&str>);

    fn close_metrics_tab_popup(&self);
}
