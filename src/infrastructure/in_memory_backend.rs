// In-memory chart tab backend with live subscriptions
use crate::application::metric_tab_mutations::{
    CreateMetricTabInput, EditMetricTabInput, MetricTabMutations, MetricToTrack,
};
use crate::application::metrics_tabs_client::{
    MeetingTabs, MeetingTabsQuery, MetricsTabsClient, Subscription,
};
use crate::domain::chart_tab::{
    ChartTab, TabColor, TrackedMetric, TrackedMetrics, UserRef, MAX_TRACKED_METRICS,
};
use crate::domain::metric::{Metric, MetricFrequency, MetricUnits};
use crate::domain::permissions::{MeetingPermissions, MeetingRole};
use crate::infrastructure::config::SeedConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{watch, RwLock};

#[derive(Default)]
struct Store {
    /// Metrics per meeting, in table order.
    metrics: HashMap<String, Vec<Metric>>,
    roles: HashMap<(String, String), MeetingRole>,
    /// All tabs, in creation order.
    tabs: Vec<ChartTab>,
    next_id: u64,
    list_watchers: Vec<(MeetingTabsQuery, watch::Sender<MeetingTabs>)>,
    tab_watchers: Vec<(String, watch::Sender<ChartTab>)>,
}

impl Store {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    /// Next generated tab id not already taken by a seeded tab.
    fn next_tab_id(&mut self) -> String {
        loop {
            let id = self.next_id("tab");
            if !self.tabs.iter().any(|t| t.id == id) {
                return id;
            }
        }
    }

    fn metric(&self, meeting_id: &str, metric_id: &str) -> Result<Metric> {
        self.metrics
            .get(meeting_id)
            .and_then(|metrics| metrics.iter().find(|m| m.id == metric_id))
            .cloned()
            .with_context(|| format!("Metric {} not found in meeting {}", metric_id, meeting_id))
    }

    fn tab_mut(&mut self, tab_id: &str) -> Result<&mut ChartTab> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == tab_id)
            .with_context(|| format!("Tab {} not found", tab_id))
    }

    fn meeting_tabs(&self, query: &MeetingTabsQuery) -> MeetingTabs {
        let in_scope = |t: &&ChartTab| t.meeting_id == query.meeting_id && t.frequency == query.frequency;

        MeetingTabs {
            own: self
                .tabs
                .iter()
                .filter(in_scope)
                .filter(|t| !t.is_shared_to_meeting && t.creator.id == query.user_id)
                .cloned()
                .collect(),
            shared: self
                .tabs
                .iter()
                .filter(in_scope)
                .filter(|t| t.is_shared_to_meeting)
                .cloned()
                .collect(),
        }
    }

    fn track(&mut self, tab_id: &str, metric: &Metric, to_track: &MetricToTrack) -> Result<()> {
        let tracked_id = self.next_id("tracked");
        let tab = self.tab_mut(tab_id)?;
        check_can_track(tab.units, &tab.tracked_metrics, metric)?;

        tab.tracked_metrics.nodes.push(TrackedMetric {
            id: tracked_id,
            color: to_track.color,
            metric: metric.clone(),
        });
        tab.tracked_metrics.total_count = tab.tracked_metrics.nodes.len();
        Ok(())
    }

    /// Push current values to every live subscriber and forget closed ones.
    fn publish(&mut self) {
        self.list_watchers.retain(|(_, tx)| !tx.is_closed());
        for (query, tx) in &self.list_watchers {
            tx.send_replace(self.meeting_tabs(query));
        }

        let tabs = &self.tabs;
        self.tab_watchers.retain(|(tab_id, tx)| {
            if tx.is_closed() {
                return false;
            }
            match tabs.iter().find(|t| &t.id == tab_id) {
                Some(tab) => {
                    tx.send_replace(tab.clone());
                    true
                }
                None => false,
            }
        });
    }
}

fn check_can_track(units: MetricUnits, tracked: &TrackedMetrics, metric: &Metric) -> Result<()> {
    if metric.units != units {
        bail!("Metric {} has units {:?}, tab expects {:?}", metric.id, metric.units, units);
    }
    if tracked.total_count >= MAX_TRACKED_METRICS {
        bail!("Tab already tracks {} metrics", MAX_TRACKED_METRICS);
    }
    if tracked.contains_metric(&metric.id) {
        bail!("Metric {} is already tracked", metric.id);
    }
    Ok(())
}

/// Backend holding meetings, metrics and tabs in memory.
pub struct InMemoryMetricsBackend {
    store: RwLock<Store>,
}

impl InMemoryMetricsBackend {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
        }
    }

    pub fn from_seed(seed: &SeedConfig) -> Result<Self> {
        let mut store = Store::default();

        for meeting in &seed.meetings {
            let metrics: Vec<Metric> = meeting
                .metrics
                .iter()
                .map(|m| Metric::new(m.id.clone(), m.title.clone(), m.units, m.frequency))
                .collect();
            store.metrics.insert(meeting.id.clone(), metrics);

            for member in &meeting.members {
                store
                    .roles
                    .insert((meeting.id.clone(), member.user_id.clone()), member.role);
            }

            for tab_seed in &meeting.tabs {
                if store.tabs.iter().any(|t| t.id == tab_seed.id) {
                    bail!("Duplicate seed tab id {}", tab_seed.id);
                }
                store.tabs.push(ChartTab {
                    id: tab_seed.id.clone(),
                    meeting_id: meeting.id.clone(),
                    name: tab_seed.name.clone(),
                    frequency: tab_seed.frequency,
                    units: tab_seed.units,
                    is_shared_to_meeting: tab_seed.shared,
                    is_pinned_to_tab_bar: tab_seed.pinned,
                    creator: UserRef {
                        id: tab_seed.creator_id.clone(),
                    },
                    tracked_metrics: TrackedMetrics::default(),
                });

                for (slot, metric_id) in tab_seed.metrics.iter().enumerate() {
                    let metric = store.metric(&meeting.id, metric_id)?;
                    let color = TabColor::for_slot(slot)
                        .with_context(|| format!("Seed tab {} tracks too many metrics", tab_seed.id))?;
                    let to_track = MetricToTrack {
                        metric_id: metric_id.clone(),
                        color,
                    };
                    store
                        .track(&tab_seed.id, &metric, &to_track)
                        .with_context(|| format!("Invalid seed tab {}", tab_seed.id))?;
                }
            }
        }

        tracing::info!(
            "Seeded {} meetings with {} chart tabs",
            store.metrics.len(),
            store.tabs.len()
        );

        Ok(Self {
            store: RwLock::new(store),
        })
    }

    #[cfg(test)]
    pub async fn add_meeting_member(&self, meeting_id: &str, user_id: &str, role: MeetingRole) {
        let mut store = self.store.write().await;
        store
            .roles
            .insert((meeting_id.to_string(), user_id.to_string()), role);
    }

    #[cfg(test)]
    pub async fn add_meeting_metric(&self, meeting_id: &str, metric: Metric) {
        let mut store = self.store.write().await;
        store
            .metrics
            .entry(meeting_id.to_string())
            .or_default()
            .push(metric);
    }

    #[cfg(test)]
    /// Number of subscriptions still held by someone.
    pub async fn live_subscription_count(&self) -> usize {
        let store = self.store.read().await;
        store.list_watchers.iter().filter(|(_, tx)| !tx.is_closed()).count()
            + store.tab_watchers.iter().filter(|(_, tx)| !tx.is_closed()).count()
    }
}

impl Default for InMemoryMetricsBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsTabsClient for InMemoryMetricsBackend {
    async fn subscribe_meeting_tabs(&self, query: MeetingTabsQuery) -> Result<Subscription<MeetingTabs>> {
        let mut store = self.store.write().await;
        let (tx, rx) = watch::channel(store.meeting_tabs(&query));
        let label = format!("tabs of meeting {} ({})", query.meeting_id, query.frequency);
        store.list_watchers.push((query, tx));
        Ok(Subscription::new(label, rx))
    }

    async fn subscribe_tab(&self, tab_id: &str) -> Result<Subscription<ChartTab>> {
        let mut store = self.store.write().await;
        let tab = store.tab_mut(tab_id)?.clone();
        let (tx, rx) = watch::channel(tab);
        store.tab_watchers.push((tab_id.to_string(), tx));
        Ok(Subscription::new(format!("tab {}", tab_id), rx))
    }

    async fn fetch_tab(&self, tab_id: &str) -> Result<ChartTab> {
        let store = self.store.read().await;
        store
            .tabs
            .iter()
            .find(|t| t.id == tab_id)
            .cloned()
            .with_context(|| format!("Tab {} not found", tab_id))
    }

    async fn fetch_meeting_permissions(&self, meeting_id: &str, user_id: &str) -> Result<MeetingPermissions> {
        let store = self.store.read().await;
        let role = store
            .roles
            .get(&(meeting_id.to_string(), user_id.to_string()))
            .copied()
            .unwrap_or(MeetingRole::None);

        Ok(MeetingPermissions {
            user_id: user_id.to_string(),
            role,
        })
    }

    async fn list_meeting_metrics(&self, meeting_id: &str, frequency: MetricFrequency) -> Result<Vec<Metric>> {
        let store = self.store.read().await;
        Ok(store
            .metrics
            .get(meeting_id)
            .map(|metrics| {
                metrics
                    .iter()
                    .filter(|m| m.frequency == frequency)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl MetricTabMutations for InMemoryMetricsBackend {
    async fn create_metric_tab(&self, input: CreateMetricTabInput) -> Result<String> {
        let mut store = self.store.write().await;
        if input.metrics.len() > MAX_TRACKED_METRICS {
            bail!("A tab tracks at most {} metrics", MAX_TRACKED_METRICS);
        }
        let metrics = input
            .metrics
            .iter()
            .map(|m| store.metric(&input.meeting_id, &m.metric_id))
            .collect::<Result<Vec<_>>>()?;
        if let Some(mismatch) = metrics.iter().find(|m| m.units != input.units) {
            bail!("Metric {} does not match tab units {:?}", mismatch.id, input.units);
        }

        let tab_id = store.next_tab_id();
        let nodes = metrics
            .into_iter()
            .zip(&input.metrics)
            .map(|(metric, to_track)| TrackedMetric {
                id: store.next_id("tracked"),
                color: to_track.color,
                metric,
            })
            .collect();

        store.tabs.push(ChartTab {
            id: tab_id.clone(),
            meeting_id: input.meeting_id,
            name: input.name,
            frequency: input.frequency,
            units: input.units,
            is_shared_to_meeting: input.is_shared_to_meeting,
            is_pinned_to_tab_bar: input.is_pinned_to_tab_bar,
            creator: UserRef { id: input.creator_id },
            tracked_metrics: TrackedMetrics::from_nodes(nodes),
        });
        store.publish();

        tracing::debug!("Created tab {}", tab_id);
        Ok(tab_id)
    }

    async fn add_metric_to_tab(&self, tab_id: &str, metric: MetricToTrack) -> Result<()> {
        let mut store = self.store.write().await;
        let meeting_id = store.tab_mut(tab_id)?.meeting_id.clone();
        let resolved = store.metric(&meeting_id, &metric.metric_id)?;
        store.track(tab_id, &resolved, &metric)?;
        store.publish();
        Ok(())
    }

    async fn remove_metric_from_tab(&self, tab_id: &str, tracked_metric_id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        let tab = store.tab_mut(tab_id)?;
        let before = tab.tracked_metrics.nodes.len();
        tab.tracked_metrics.nodes.retain(|t| t.id != tracked_metric_id);
        if tab.tracked_metrics.nodes.len() == before {
            bail!("Tracked metric {} not found in tab {}", tracked_metric_id, tab_id);
        }
        tab.tracked_metrics.total_count = tab.tracked_metrics.nodes.len();
        store.publish();
        Ok(())
    }

    async fn remove_all_metrics_from_tab(&self, tab_id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        store.tab_mut(tab_id)?.tracked_metrics = TrackedMetrics::default();
        store.publish();
        Ok(())
    }

    async fn pin_or_unpin_metric_tab(&self, tab_id: &str, pinned: bool) -> Result<()> {
        let mut store = self.store.write().await;
        store.tab_mut(tab_id)?.is_pinned_to_tab_bar = pinned;
        store.publish();
        Ok(())
    }

    async fn delete_metric_tab(&self, tab_id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        let before = store.tabs.len();
        store.tabs.retain(|t| t.id != tab_id);
        if store.tabs.len() == before {
            bail!("Tab {} not found", tab_id);
        }
        store.publish();
        Ok(())
    }

    async fn edit_metric_tab(&self, input: EditMetricTabInput) -> Result<()> {
        let mut store = self.store.write().await;
        let tab = store.tab_mut(&input.tab_id)?;
        tab.name = input.name;
        tab.is_shared_to_meeting = input.is_shared_to_meeting;
        store.publish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backend() -> InMemoryMetricsBackend {
        let backend = InMemoryMetricsBackend::new();
        backend.add_meeting_member("m1", "ada", MeetingRole::Admin).await;
        for (id, units) in [("rev", MetricUnits::Dollar), ("cost", MetricUnits::Dollar), ("pct", MetricUnits::Percent)] {
            backend
                .add_meeting_metric("m1", Metric::new(id.to_string(), id.to_string(), units, MetricFrequency::Weekly))
                .await;
        }
        backend
    }

    fn create_input(metric_id: &str, units: MetricUnits) -> CreateMetricTabInput {
        CreateMetricTabInput {
            meeting_id: "m1".to_string(),
            creator_id: "ada".to_string(),
            name: None,
            frequency: MetricFrequency::Weekly,
            units,
            is_shared_to_meeting: false,
            is_pinned_to_tab_bar: true,
            metrics: vec![MetricToTrack {
                metric_id: metric_id.to_string(),
                color: TabColor::Color1,
            }],
        }
    }

    fn query(user_id: &str) -> MeetingTabsQuery {
        MeetingTabsQuery {
            meeting_id: "m1".to_string(),
            user_id: user_id.to_string(),
            frequency: MetricFrequency::Weekly,
        }
    }

    #[tokio::test]
    async fn test_list_subscription_sees_created_tabs() {
        let backend = backend().await;
        let mut tabs = backend.subscribe_meeting_tabs(query("ada")).await.unwrap();
        assert!(tabs.current().own.is_empty());

        let tab_id = backend.create_metric_tab(create_input("rev", MetricUnits::Dollar)).await.unwrap();
        tabs.changed().await.unwrap();

        let current = tabs.current();
        assert_eq!(current.own.len(), 1);
        assert_eq!(current.own[0].id, tab_id);
        assert_eq!(current.own[0].tracked_metrics.total_count, 1);
    }

    #[tokio::test]
    async fn test_own_and_shared_split() {
        let backend = backend().await;
        let tab_id = backend.create_metric_tab(create_input("rev", MetricUnits::Dollar)).await.unwrap();

        let other = backend.subscribe_meeting_tabs(query("grace")).await.unwrap();
        assert!(other.current().own.is_empty());
        assert!(other.current().shared.is_empty());

        backend
            .edit_metric_tab(EditMetricTabInput {
                tab_id: tab_id.clone(),
                name: Some("Money".to_string()),
                is_shared_to_meeting: true,
            })
            .await
            .unwrap();

        let shared = other.current().shared;
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].name.as_deref(), Some("Money"));
    }

    #[tokio::test]
    async fn test_tab_invariants_are_enforced() {
        let backend = backend().await;
        assert!(backend.create_metric_tab(create_input("pct", MetricUnits::Dollar)).await.is_err());

        let tab_id = backend.create_metric_tab(create_input("rev", MetricUnits::Dollar)).await.unwrap();
        let mismatch = MetricToTrack {
            metric_id: "pct".to_string(),
            color: TabColor::Color2,
        };
        assert!(backend.add_metric_to_tab(&tab_id, mismatch).await.is_err());

        let duplicate = MetricToTrack {
            metric_id: "rev".to_string(),
            color: TabColor::Color2,
        };
        assert!(backend.add_metric_to_tab(&tab_id, duplicate).await.is_err());

        let cost = MetricToTrack {
            metric_id: "cost".to_string(),
            color: TabColor::Color2,
        };
        backend.add_metric_to_tab(&tab_id, cost).await.unwrap();
        assert_eq!(backend.fetch_tab(&tab_id).await.unwrap().tracked_metrics.total_count, 2);
    }

    #[tokio::test]
    async fn test_dropped_subscriptions_are_pruned() {
        let backend = backend().await;
        let tab_id = backend.create_metric_tab(create_input("rev", MetricUnits::Dollar)).await.unwrap();

        let list = backend.subscribe_meeting_tabs(query("ada")).await.unwrap();
        let tab = backend.subscribe_tab(&tab_id).await.unwrap();
        assert_eq!(backend.live_subscription_count().await, 2);

        drop(list);
        drop(tab);
        assert_eq!(backend.live_subscription_count().await, 0);

        backend.pin_or_unpin_metric_tab(&tab_id, false).await.unwrap();
        assert!(backend.store.read().await.list_watchers.is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_delete() {
        let backend = backend().await;
        let tab_id = backend.create_metric_tab(create_input("rev", MetricUnits::Dollar)).await.unwrap();
        let tracked_id = backend.fetch_tab(&tab_id).await.unwrap().tracked_metrics.nodes[0].id.clone();

        backend.remove_metric_from_tab(&tab_id, &tracked_id).await.unwrap();
        assert!(backend.fetch_tab(&tab_id).await.unwrap().is_empty());
        assert!(backend.remove_metric_from_tab(&tab_id, &tracked_id).await.is_err());

        backend.delete_metric_tab(&tab_id).await.unwrap();
        assert!(backend.fetch_tab(&tab_id).await.is_err());
    }

    fn seed_with_tabs(tab_ids: &[&str]) -> SeedConfig {
        use crate::infrastructure::config::{MeetingSeed, MetricSeed, TabSeed};

        SeedConfig {
            meetings: vec![MeetingSeed {
                id: "m1".to_string(),
                members: Vec::new(),
                metrics: vec![MetricSeed {
                    id: "rev".to_string(),
                    title: "Revenue".to_string(),
                    units: MetricUnits::Dollar,
                    frequency: MetricFrequency::Weekly,
                }],
                tabs: tab_ids
                    .iter()
                    .map(|id| TabSeed {
                        id: id.to_string(),
                        name: Some("seeded".to_string()),
                        creator_id: "ada".to_string(),
                        frequency: MetricFrequency::Weekly,
                        units: MetricUnits::Dollar,
                        shared: false,
                        pinned: true,
                        metrics: vec!["rev".to_string()],
                    })
                    .collect(),
            }],
        }
    }

    #[tokio::test]
    async fn test_created_tab_ids_skip_seeded_ids() {
        let backend = InMemoryMetricsBackend::from_seed(&seed_with_tabs(&["tab-2"])).unwrap();

        let mut input = create_input("rev", MetricUnits::Dollar);
        input.name = Some("created".to_string());
        let tab_id = backend.create_metric_tab(input).await.unwrap();

        assert_ne!(tab_id, "tab-2");
        assert_eq!(backend.fetch_tab(&tab_id).await.unwrap().name.as_deref(), Some("created"));
        assert_eq!(backend.fetch_tab("tab-2").await.unwrap().name.as_deref(), Some("seeded"));
    }

    #[test]
    fn test_duplicate_seed_tab_ids_are_rejected() {
        assert!(InMemoryMetricsBackend::from_seed(&seed_with_tabs(&["money", "money"])).is_err());
    }

    #[tokio::test]
    async fn test_unknown_member_has_no_role() {
        let backend = backend().await;
        let permissions = backend.fetch_meeting_permissions("m1", "stranger").await.unwrap();
        assert_eq!(permissions.role, MeetingRole::None);
    }

    #[tokio::test]
    async fn test_metrics_filtered_by_frequency() {
        let backend = backend().await;
        assert_eq!(backend.list_meeting_metrics("m1", MetricFrequency::Weekly).await.unwrap().len(), 3);
        assert!(backend.list_meeting_metrics("m1", MetricFrequency::Daily).await.unwrap().is_empty());
    }
}
