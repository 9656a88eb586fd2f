//! NaN-rate dataset types and the JSON payload contract

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::types::{NanRateError, Result};

/// NaN ratio as a percentage. Zero when there are no tasks.
pub fn nan_ratio(nan_count: u64, total_tasks: u64) -> f64 {
    if total_tasks == 0 {
        return 0.0;
    }
    nan_count as f64 / total_tasks as f64 * 100.0
}

/// Numeric week extracted from a business week label (`"27주차"`, `"W27"`)
pub fn week_number(label: &str) -> Option<u32> {
    static WEEK_RE: OnceLock<Regex> = OnceLock::new();
    let re = WEEK_RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"));
    re.find(label).and_then(|m| m.as_str().parse().ok())
}

/// Week labels ordered by their numeric week; unparsable labels go last.
pub fn sorted_week_labels<'a, I>(labels: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut labels: Vec<&str> = labels.into_iter().map(String::as_str).collect();
    labels.sort_by_key(|l| (week_number(l).unwrap_or(u32::MAX), l.to_string()));
    labels
}

/// Partner category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Mechanical
    Mech,
    /// Electrical
    Elec,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Mech, Category::Elec];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Mech => "mech",
            Category::Elec => "elec",
        }
    }
}

/// A single work item with a defect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub order_no: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_href: Option<String>,
    pub model_name: String,
    pub nan_count: u64,
    pub total_tasks: u64,
    #[serde(default)]
    pub nan_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PartnerWeekStat {
    pub total_tasks: u64,
    pub nan_count: u64,
    #[serde(default)]
    pub nan_ratio: f64,
    #[serde(default)]
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeekStat {
    pub date: String,
    pub is_sunday_data: bool,
    #[serde(default)]
    pub partners: BTreeMap<Category, BTreeMap<String, PartnerWeekStat>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
}

/// Per-week counts inside a partner summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PartnerWeek {
    pub total_tasks: u64,
    pub nan_count: u64,
    #[serde(default)]
    pub nan_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PartnerStat {
    pub total_tasks: u64,
    pub nan_count: u64,
    #[serde(default)]
    pub nan_ratio: f64,
    #[serde(default)]
    pub weeks: BTreeMap<String, PartnerWeek>,
}

impl PartnerStat {
    pub fn recompute_ratio(&mut self) {
        self.nan_ratio = nan_ratio(self.nan_count, self.total_tasks);
    }
}

/// Resolved statistics for one period, or several periods once combined
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub extracted_at: DateTime<Utc>,
    #[serde(rename = "period")]
    pub period_label: String,
    pub total_records: u64,
    pub weekly_stats: BTreeMap<String, WeekStat>,
    pub partner_summary: BTreeMap<String, PartnerStat>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Combined view over several periods. Same shape, never cached.
pub type CombinedDataset = Dataset;

impl Dataset {
    /// Parse a source payload, validate counts and recompute every ratio.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let dataset: Dataset = serde_json::from_slice(bytes)?;
        dataset.checked()
    }

    /// Same as [`Dataset::from_json`] for an already-parsed JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let dataset: Dataset = serde_json::from_value(value)?;
        dataset.checked()
    }

    fn checked(mut self) -> Result<Self> {
        self.validate()?;
        self.normalize();
        Ok(self)
    }

    /// Reject counts where more NaNs than tasks are reported
    pub fn validate(&self) -> Result<()> {
        for (week, stat) in &self.weekly_stats {
            for (category, partners) in &stat.partners {
                for (partner, pws) in partners {
                    if pws.nan_count > pws.total_tasks {
                        return Err(NanRateError::Parse(format!(
                            "{} {} {}: nan_count {} exceeds total_tasks {}",
                            week,
                            category.as_str(),
                            partner,
                            pws.nan_count,
                            pws.total_tasks
                        )));
                    }
                }
            }
        }
        for (partner, stat) in &self.partner_summary {
            if stat.nan_count > stat.total_tasks {
                return Err(NanRateError::Parse(format!(
                    "{}: nan_count {} exceeds total_tasks {}",
                    partner, stat.nan_count, stat.total_tasks
                )));
            }
            for (week, pw) in &stat.weeks {
                if pw.nan_count > pw.total_tasks {
                    return Err(NanRateError::Parse(format!(
                        "{} {}: nan_count {} exceeds total_tasks {}",
                        partner, week, pw.nan_count, pw.total_tasks
                    )));
                }
            }
        }
        Ok(())
    }

    /// Recompute all derived ratios from counts
    pub fn normalize(&mut self) {
        for stat in self.weekly_stats.values_mut() {
            for partners in stat.partners.values_mut() {
                for pws in partners.values_mut() {
                    pws.nan_ratio = nan_ratio(pws.nan_count, pws.total_tasks);
                    for record in &mut pws.records {
                        record.nan_ratio = nan_ratio(record.nan_count, record.total_tasks);
                    }
                }
            }
        }
        for stat in self.partner_summary.values_mut() {
            stat.recompute_ratio();
            for week in stat.weeks.values_mut() {
                week.nan_ratio = nan_ratio(week.nan_count, week.total_tasks);
            }
        }
    }

    /// Week labels in numeric week order
    pub fn week_labels(&self) -> Vec<&str> {
        sorted_week_labels(self.weekly_stats.keys())
    }
}

/// Accepts RFC 3339 or a naive ISO-8601 datetime (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid extracted_at timestamp: {}", raw))
    })
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
