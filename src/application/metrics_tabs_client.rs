// Query/subscription port for chart tabs and meeting metrics
use crate::domain::chart_tab::ChartTab;
use crate::domain::metric::{Metric, MetricFrequency};
use crate::domain::permissions::MeetingPermissions;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

/// Filter for the tab-list subscription of one meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingTabsQuery {
    pub meeting_id: String,
    pub user_id: String,
    pub frequency: MetricFrequency,
}

/// Tabs visible to a user in a meeting for one frequency.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeetingTabs {
    /// Tabs the user created and has not shared.
    pub own: Vec<ChartTab>,
    /// Tabs shared to the meeting, whoever created them.
    pub shared: Vec<ChartTab>,
}

/// A live, push-updated value. Dropping it releases the subscription.
#[derive(Debug)]
pub struct Subscription<T> {
    label: String,
    rx: watch::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    pub fn new(label: impl Into<String>, rx: watch::Receiver<T>) -> Self {
        let label = label.into();
        tracing::debug!("Subscribed to {}", label);
        Self { label, rx }
    }

    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Borrow the latest value without cloning it.
    pub fn with_current<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.rx.borrow())
    }

    /// Wait for the next push. Fails once the publisher has gone away.
    #[cfg(test)]
    pub async fn changed(&mut self) -> anyhow::Result<()> {
        self.rx.changed().await?;
        Ok(())
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        tracing::debug!("Unsubscribed from {}", self.label);
    }
}

#[async_trait]
pub trait MetricsTabsClient: Send + Sync {
    /// Subscribe to the user's own and the meeting's shared tabs for a frequency
    async fn subscribe_meeting_tabs(
        &self,
        query: MeetingTabsQuery,
    ) -> anyhow::Result<Subscription<MeetingTabs>>;

    /// Subscribe to a single tab's live detail
    async fn subscribe_tab(&self, tab_id: &str) -> anyhow::Result<Subscription<ChartTab>>;

    /// One-shot fetch of a tab by id
    async fn fetch_tab(&self, tab_id: &str) -> anyhow::Result<ChartTab>;

    async fn fetch_meeting_permissions(
        &self,
        meeting_id: &str,
        user_id: &str,
    ) -> anyhow::Result<MeetingPermissions>;

    /// Metrics shown in the meeting's metrics table for a frequency
    async fn list_meeting_metrics(
        &self,
        meeting_id: &str,
        frequency: MetricFrequency,
    ) -> anyhow::Result<Vec<Metric>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_sees_pushed_values() {
        let (tx, rx) = watch::channel(1u32);
        let mut subscription = Subscription::new("counter", rx);
        assert_eq!(subscription.current(), 1);

        tx.send(2).unwrap();
        subscription.changed().await.unwrap();
        assert_eq!(subscription.current(), 2);
        assert_eq!(subscription.with_current(|v| v * 10), 20);
    }

    #[tokio::test]
    async fn test_dropping_subscription_closes_channel() {
        let (tx, rx) = watch::channel(());
        let subscription = Subscription::new("unit", rx);
        assert!(!tx.is_closed());

        drop(subscription);
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn test_changed_fails_when_publisher_is_gone() {
        let (tx, rx) = watch::channel(0u8);
        let mut subscription = Subscription::new("gone", rx);
        drop(tx);
        assert!(subscription.changed().await.is_err());
    }
}
