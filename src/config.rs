//! Configuration loaded from `~/.nanrate/config.toml`
//!
//! Every field has a default, so a missing file or a partial file is fine.

use crate::types::{NanRateError, Period, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default HTTP request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Partners above this NaN percentage need improvement
const DEFAULT_HIGH_NAN_THRESHOLD: f64 = 1.0;

/// Upper bound on the discovery range; each month costs one sequential probe
const MAX_DISCOVERY_MONTHS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// `http(s)://` base URL or local directory holding the dataset files
    pub source: String,
    pub discovery: DiscoveryConfig,
    /// Bundled datasets shipped with the application (period => dataset)
    pub bundle: Option<PathBuf>,
    /// Last-resort dataset used when nothing else matches
    pub default_dataset: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub consistency: ConsistencyConfig,
    pub high_nan_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: "data".to_string(),
            discovery: DiscoveryConfig::default(),
            bundle: None,
            default_dataset: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            consistency: ConsistencyConfig::default(),
            high_nan_threshold: DEFAULT_HIGH_NAN_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// First candidate period (inclusive)
    pub start: Period,
    /// Last candidate period (inclusive)
    pub end: Period,
    /// Used when probing fails wholesale
    pub fallback_periods: Vec<Period>,
    /// Used when probing works but finds nothing
    pub empty_periods: Vec<Period>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let p = Period::from_ym;
        Self {
            start: p(2025, 1),
            end: p(2026, 12),
            fallback_periods: vec![p(2025, 6), p(2025, 7), p(2025, 8), p(2025, 9)],
            empty_periods: vec![p(2025, 8)],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsistencyConfig {
    /// Flag week labels outside the period's calendar weeks
    pub calendar_window: bool,
    /// Extra weeks allowed on either side of the calendar window
    pub tolerance_weeks: u32,
    pub rules: Vec<WeekRangeRuleConfig>,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            calendar_window: true,
            tolerance_weeks: 0,
            rules: Vec::new(),
        }
    }
}

/// Explicit expected week range for one period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeekRangeRuleConfig {
    pub period: Period,
    pub min_week: u32,
    pub max_week: u32,
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| NanRateError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// `~/.nanrate/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.home_dir().join(".nanrate").join("config.toml"))
    }

    pub fn is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }

    fn validate(&self) -> Result<()> {
        if self.discovery.start > self.discovery.end {
            return Err(NanRateError::Config(format!(
                "discovery.start {} is after discovery.end {}",
                self.discovery.start, self.discovery.end
            )));
        }
        let start = self.discovery.start;
        let end = self.discovery.end;
        let months = i64::from(end.year() - start.year()) * 12 + i64::from(end.month())
            - i64::from(start.month())
            + 1;
        if months > MAX_DISCOVERY_MONTHS {
            return Err(NanRateError::Config(format!(
                "discovery range {}..{} spans {} months, at most {} allowed",
                start, end, months, MAX_DISCOVERY_MONTHS
            )));
        }
        if self.discovery.fallback_periods.is_empty() || self.discovery.empty_periods.is_empty() {
            return Err(NanRateError::Config(
                "discovery fallback period lists must not be empty".into(),
            ));
        }
        for rule in &self.consistency.rules {
            if rule.min_week > rule.max_week {
                return Err(NanRateError::Config(format!(
                    "week rule for {}: min_week {} > max_week {}",
                    rule.period, rule.min_week, rule.max_week
                )));
            }
        }
        if !self.high_nan_threshold.is_finite() || self.high_nan_threshold < 0.0 {
            return Err(NanRateError::Config(
                "high_nan_threshold must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source, "data");
        assert_eq!(config.discovery.start.to_string(), "2025-01");
        assert_eq!(config.discovery.end.to_string(), "2026-12");
        assert_eq!(config.discovery.fallback_periods.len(), 4);
        assert_eq!(config.discovery.empty_periods[0].to_string(), "2025-08");
        assert!(config.consistency.calendar_window);
        assert!(!config.is_remote());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            source = "https://reports.example.com/data"

            [discovery]
            start = "2025-06"
            "#,
        )
        .unwrap();

        assert!(config.is_remote());
        assert_eq!(config.discovery.start.to_string(), "2025-06");
        assert_eq!(config.discovery.end.to_string(), "2026-12");
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_week_rules_parsed() {
        let config = Config::from_toml(
            r#"
            [[consistency.rules]]
            period = "2025-07"
            min_week = 27
            max_week = 31
            "#,
        )
        .unwrap();

        assert_eq!(config.consistency.rules.len(), 1);
        assert_eq!(config.consistency.rules[0].min_week, 27);
    }

    #[test]
    fn test_invalid_range_rejected() {
        let err = Config::from_toml(
            r#"
            [discovery]
            start = "2026-01"
            end = "2025-01"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, NanRateError::Config(_)));
    }

    #[test]
    fn test_oversized_range_rejected() {
        let err = Config::from_toml(
            r#"
            [discovery]
            start = "2025-01"
            end = "2925-12"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, NanRateError::Config(ref m) if m.contains("at most 60")));
    }

    #[test]
    fn test_sixty_month_range_accepted() {
        let config = Config::from_toml(
            r#"
            [discovery]
            start = "2025-01"
            end = "2029-12"
            "#,
        )
        .unwrap();
        assert_eq!(Period::range(config.discovery.start, config.discovery.end).len(), 60);
    }

    #[test]
    fn test_invalid_period_rejected() {
        assert!(Config::from_toml("[discovery]\nstart = \"2025-13\"").is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(Some(&temp.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "source = \"/srv/nan\"\nhigh_nan_threshold = 2.5\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.source, "/srv/nan");
        assert!((config.high_nan_threshold - 2.5).abs() < f64::EPSILON);
    }
}
