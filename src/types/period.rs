//! Calendar year-month period

use crate::types::{NanRateError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One reporting month. Ordered chronologically by (year, month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(NanRateError::Parse(format!("invalid month: {}", month)));
        }
        Ok(Self { year, month })
    }

    /// Month must already be known to be in 1..=12
    pub(crate) const fn from_ym(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Following month (December rolls into January)
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Inclusive range of periods. Empty when `start > end`.
    pub fn range(start: Period, end: Period) -> Vec<Period> {
        let mut periods = Vec::new();
        let mut current = start;
        while current <= end {
            periods.push(current);
            current = current.succ();
        }
        periods
    }

    /// File stem used by the source naming convention, e.g. `2025_08`
    pub fn file_stem(&self) -> String {
        format!("{}_{:02}", self.year, self.month)
    }

    /// Human label, e.g. `2025년 8월`
    pub fn display_label(&self) -> String {
        format!("{}년 {}월", self.year, self.month)
    }

    pub fn first_day(&self) -> NaiveDate {
        // month is validated on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.succ()
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }

    /// ISO week numbers of the first and last day of the month.
    ///
    /// January may start in week 52/53 of the previous ISO year; that
    /// case is clamped to week 1 so the window stays ascending.
    pub fn iso_week_span(&self) -> (u32, u32) {
        let first = self.first_day().iso_week();
        let last = self.last_day().iso_week();
        let start = if first.year() < self.year {
            1
        } else {
            first.week()
        };
        let end = if last.year() > self.year {
            53
        } else {
            last.week()
        };
        (start, end)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = NanRateError;

    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s
            .trim()
            .split_once(['-', '_'])
            .ok_or_else(|| NanRateError::Parse(format!("invalid period: {}", s)))?;
        let year: i32 = year
            .parse()
            .map_err(|_| NanRateError::Parse(format!("invalid period year: {}", s)))?;
        let month: u32 = month
            .parse()
            .map_err(|_| NanRateError::Parse(format!("invalid period month: {}", s)))?;
        Period::new(year, month)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
