// Metric domain model (chart-relevant subset)
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricUnits {
    #[serde(rename = "NUMBER")]
    Number,
    #[serde(rename = "DOLLAR")]
    Dollar,
    #[serde(rename = "POUND")]
    Pound,
    #[serde(rename = "EURO")]
    Euro,
    #[serde(rename = "PERCENT")]
    Percent,
    #[serde(rename = "TIME")]
    Time,
    /// Yes/no metrics are tracked in the table but never charted.
    #[serde(rename = "YESNO")]
    YesNo,
}

impl MetricUnits {
    pub fn is_chartable(self) -> bool {
        self != MetricUnits::YesNo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl MetricFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricFrequency::Daily => "DAILY",
            MetricFrequency::Weekly => "WEEKLY",
            MetricFrequency::Monthly => "MONTHLY",
            MetricFrequency::Quarterly => "QUARTERLY",
        }
    }
}

impl fmt::Display for MetricFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    pub title: String,
    pub units: MetricUnits,
    pub frequency: MetricFrequency,
}

impl Metric {
    pub fn new(id: String, title: String, units: MetricUnits, frequency: MetricFrequency) -> Self {
        Self {
            id,
            title,
            units,
            frequency,
        }
    }
}
