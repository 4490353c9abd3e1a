// Chart tab domain model
use super::metric::{Metric, MetricFrequency, MetricUnits};
use serde::{Deserialize, Serialize};

/// Upper bound on metrics tracked by a single chart tab.
pub const MAX_TRACKED_METRICS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TabColor {
    Color1,
    Color2,
    Color3,
    Color4,
    Color5,
}

impl TabColor {
    pub const ALL: [Self; MAX_TRACKED_METRICS] = [
        Self::Color1,
        Self::Color2,
        Self::Color3,
        Self::Color4,
        Self::Color5,
    ];

    /// Color assigned to the metric added after `tracked_count` others.
    pub fn for_slot(tracked_count: usize) -> Option<Self> {
        Self::ALL.get(tracked_count).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedMetric {
    pub id: String,
    pub color: TabColor,
    pub metric: Metric,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedMetrics {
    pub nodes: Vec<TrackedMetric>,
    pub total_count: usize,
}

impl TrackedMetrics {
    pub fn from_nodes(nodes: Vec<TrackedMetric>) -> Self {
        let total_count = nodes.len();
        Self { nodes, total_count }
    }

    pub fn find_by_metric(&self, metric_id: &str) -> Option<&TrackedMetric> {
        self.nodes.iter().find(|t| t.metric.id == metric_id)
    }

    pub fn contains_metric(&self, metric_id: &str) -> bool {
        self.find_by_metric(metric_id).is_some()
    }

    /// First color slot no tracked metric is using.
    pub fn next_unused_color(&self) -> Option<TabColor> {
        TabColor::ALL
            .into_iter()
            .find(|color| self.nodes.iter().all(|t| t.color != *color))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartTab {
    pub id: String,
    pub meeting_id: String,
    pub name: Option<String>,
    pub frequency: MetricFrequency,
    pub units: MetricUnits,
    pub is_shared_to_meeting: bool,
    pub is_pinned_to_tab_bar: bool,
    pub creator: UserRef,
    pub tracked_metrics: TrackedMetrics,
}

impl ChartTab {
    pub fn is_full(&self) -> bool {
        self.tracked_metrics.total_count >= MAX_TRACKED_METRICS
    }

    pub fn is_empty(&self) -> bool {
        self.tracked_metrics.total_count == 0
    }
}

/// The tab currently presented in the chart popup: either a real tab or the
/// placeholder for one the user is about to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActiveTab {
    NewTab,
    Tab(ChartTab),
}

impl ActiveTab {
    pub fn as_tab(&self) -> Option<&ChartTab> {
        match self {
            ActiveTab::NewTab => None,
            ActiveTab::Tab(tab) => Some(tab),
        }
    }

    pub fn is_new_tab(&self) -> bool {
        matches!(self, ActiveTab::NewTab)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Ephemeral popup state for the active tab; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTabSessionInfo {
    pub expanded: bool,
    pub last_dragged_to: Option<Position>,
    pub last_forcefully_moved_to: Option<Position>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn metric(id: &str, units: MetricUnits) -> Metric {
        Metric::new(
            id.to_string(),
            format!("Metric {}", id),
            units,
            MetricFrequency::Weekly,
        )
    }

    pub fn tab(id: &str, units: MetricUnits, tracked: usize) -> ChartTab {
        let nodes = (0..tracked)
            .map(|i| TrackedMetric {
                id: format!("{}-tracked-{}", id, i),
                color: TabColor::ALL[i % MAX_TRACKED_METRICS],
                metric: metric(&format!("{}-m{}", id, i), units),
            })
            .collect();

        ChartTab {
            id: id.to_string(),
            meeting_id: "meeting-1".to_string(),
            name: None,
            frequency: MetricFrequency::Weekly,
            units,
            is_shared_to_meeting: false,
            is_pinned_to_tab_bar: true,
            creator: UserRef {
                id: "user-1".to_string(),
            },
            tracked_metrics: TrackedMetrics::from_nodes(nodes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::tab;
    use super::*;

    #[test]
    fn test_color_slots() {
        assert_eq!(TabColor::for_slot(0), Some(TabColor::Color1));
        assert_eq!(TabColor::for_slot(4), Some(TabColor::Color5));
        assert_eq!(TabColor::for_slot(5), None);
    }

    #[test]
    fn test_next_unused_color_fills_gaps() {
        let mut tab = tab("t", MetricUnits::Dollar, 3);
        assert_eq!(tab.tracked_metrics.next_unused_color(), Some(TabColor::Color4));

        tab.tracked_metrics.nodes.remove(0);
        assert_eq!(tab.tracked_metrics.next_unused_color(), Some(TabColor::Color1));

        let full = super::fixtures::tab("f", MetricUnits::Dollar, 5);
        assert_eq!(full.tracked_metrics.next_unused_color(), None);
    }

    #[test]
    fn test_full_and_empty() {
        assert!(tab("t", MetricUnits::Dollar, 5).is_full());
        assert!(!tab("t", MetricUnits::Dollar, 4).is_full());
        assert!(tab("t", MetricUnits::Dollar, 0).is_empty());
    }

    #[test]
    fn test_active_tab_serializes_with_kind_tag() {
        let value = serde_json::to_value(ActiveTab::NewTab).unwrap();
        assert_eq!(value["kind"], "newTab");
        assert!(ActiveTab::NewTab.as_tab().is_none());
    }
}
