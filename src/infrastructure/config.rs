use crate::domain::metric::{MetricFrequency, MetricUnits};
use crate::domain::permissions::MeetingRole;
use chrono::Weekday;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub terminology: Terminology,
    #[serde(default)]
    pub table: TableSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// User-facing names for metrics, used in toasts and tooltips.
#[derive(Debug, Deserialize, Clone)]
pub struct Terminology {
    pub metric: String,
    pub metrics: String,
}

impl Default for Terminology {
    fn default() -> Self {
        Self {
            metric: "metric".to_string(),
            metrics: "metrics".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TableSettings {
    /// Number of date-range columns in the metrics table.
    pub periods: usize,
    #[serde(default = "default_week_start")]
    pub week_start: Weekday,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            periods: 13,
            week_start: default_week_start(),
        }
    }
}

fn default_week_start() -> Weekday {
    Weekday::Mon
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedConfig {
    #[serde(default)]
    pub meetings: Vec<MeetingSeed>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MeetingSeed {
    pub id: String,
    #[serde(default)]
    pub members: Vec<MemberSeed>,
    #[serde(default)]
    pub metrics: Vec<MetricSeed>,
    #[serde(default)]
    pub tabs: Vec<TabSeed>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemberSeed {
    pub user_id: String,
    pub role: MeetingRole,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricSeed {
    pub id: String,
    pub title: String,
    pub units: MetricUnits,
    pub frequency: MetricFrequency,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TabSeed {
    pub id: String,
    pub name: Option<String>,
    pub creator_id: String,
    pub frequency: MetricFrequency,
    pub units: MetricUnits,
    #[serde(default)]
    pub shared: bool,
    #[serde(default = "default_pinned")]
    pub pinned: bool,
    /// Metric ids, in display order.
    #[serde(default)]
    pub metrics: Vec<String>,
}

fn default_pinned() -> bool {
    true
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/app"))
        .add_source(config::Environment::with_prefix("METRICS_TABS").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_seed_config() -> anyhow::Result<SeedConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/seed").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    #[test]
    fn test_app_config_defaults() {
        let settings = Config::builder()
            .add_source(File::from_str(
                "[server]\nhost = \"127.0.0.1\"\nport = 9000\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: AppConfig = settings.try_deserialize().unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.terminology.metric, "metric");
        assert_eq!(config.table.periods, 13);
        assert_eq!(config.table.week_start, Weekday::Mon);
    }

    #[test]
    fn test_seed_config_parses_tabs() {
        let toml = r#"
[[meetings]]
id = "weekly-sync"

[[meetings.members]]
user_id = "ada"
role = "ADMIN"

[[meetings.metrics]]
id = "revenue"
title = "Revenue"
units = "DOLLAR"
frequency = "WEEKLY"

[[meetings.tabs]]
id = "money"
creator_id = "ada"
frequency = "WEEKLY"
units = "DOLLAR"
metrics = ["revenue"]
"#;
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap();

        let seed: SeedConfig = settings.try_deserialize().unwrap();
        let meeting = &seed.meetings[0];
        assert_eq!(meeting.members[0].role, MeetingRole::Admin);
        assert_eq!(meeting.metrics[0].units, MetricUnits::Dollar);
        assert!(meeting.tabs[0].pinned);
        assert!(!meeting.tabs[0].shared);
    }
}
