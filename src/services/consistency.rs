//! Non-fatal integrity checks on resolved datasets
//!
//! A dataset may come back for the right period with week labels that
//! belong to another month (for example a copy of the previous month's
//! file). These checks report such mismatches; callers only log them.

use std::fmt;

use crate::config::ConsistencyConfig;
use crate::types::{week_number, Dataset, Period};

#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyIssue {
    pub check: String,
    pub period: Period,
    pub week_label: String,
    pub message: String,
}

impl fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.check, self.period, self.week_label, self.message
        )
    }
}

pub trait ConsistencyCheck: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, period: Period, dataset: &Dataset) -> Vec<ConsistencyIssue>;
}

/// Labels whose week number falls outside `[min, max]`. Labels without a
/// number are not judged.
fn weeks_outside(
    check: &str,
    period: Period,
    dataset: &Dataset,
    min: u32,
    max: u32,
) -> Vec<ConsistencyIssue> {
    dataset
        .week_labels()
        .into_iter()
        .filter_map(|label| {
            let week = week_number(label)?;
            if (min..=max).contains(&week) {
                return None;
            }
            Some(ConsistencyIssue {
                check: check.to_string(),
                period,
                week_label: label.to_string(),
                message: format!("week {} outside expected {}..={}", week, min, max),
            })
        })
        .collect()
}

/// Week numbers must lie within the ISO weeks the month touches
pub struct CalendarWindowCheck {
    tolerance_weeks: u32,
}

impl CalendarWindowCheck {
    pub fn new(tolerance_weeks: u32) -> Self {
        Self { tolerance_weeks }
    }
}

impl ConsistencyCheck for CalendarWindowCheck {
    fn name(&self) -> &str {
        "calendar-window"
    }

    fn check(&self, period: Period, dataset: &Dataset) -> Vec<ConsistencyIssue> {
        let (start, end) = period.iso_week_span();
        let min = start.saturating_sub(self.tolerance_weeks).max(1);
        let max = end + self.tolerance_weeks;
        weeks_outside(self.name(), period, dataset, min, max)
    }
}

/// Explicitly configured week range for a single period
pub struct WeekRangeRule {
    period: Period,
    min_week: u32,
    max_week: u32,
}

impl WeekRangeRule {
    pub fn new(period: Period, min_week: u32, max_week: u32) -> Self {
        Self {
            period,
            min_week,
            max_week,
        }
    }
}

impl ConsistencyCheck for WeekRangeRule {
    fn name(&self) -> &str {
        "week-range"
    }

    fn check(&self, period: Period, dataset: &Dataset) -> Vec<ConsistencyIssue> {
        if period != self.period {
            return Vec::new();
        }
        weeks_outside(self.name(), period, dataset, self.min_week, self.max_week)
    }
}

pub fn checks_from_config(config: &ConsistencyConfig) -> Vec<Box<dyn ConsistencyCheck>> {
    let mut checks: Vec<Box<dyn ConsistencyCheck>> = Vec::new();
    if config.calendar_window {
        checks.push(Box::new(CalendarWindowCheck::new(config.tolerance_weeks)));
    }
    for rule in &config.rules {
        checks.push(Box::new(WeekRangeRule::new(
            rule.period,
            rule.min_week,
            rule.max_week,
        )));
    }
    checks
}
