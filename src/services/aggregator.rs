//! Aggregator service for combining periods and computing summary statistics

use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::types::{
    nan_ratio, Category, CombinedDataset, Dataset, NanRateError, PartnerStat, Period, WeekStat,
};

/// Headline numbers for one dataset
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatasetSummary {
    pub period_label: String,
    pub extracted_at: chrono::DateTime<Utc>,
    pub total_records: u64,
    pub total_tasks: u64,
    pub nan_count: u64,
    pub overall_nan_ratio: f64,
    /// Partners whose ratio exceeds the high-NaN threshold
    pub high_nan_partners: usize,
    pub total_partners: usize,
}

/// One point of the weekly trend, ratios recomputed per category
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeekTrend {
    pub week_label: String,
    pub date: String,
    pub is_sunday_data: bool,
    pub mech_nan_ratio: f64,
    pub elec_nan_ratio: f64,
}

/// Partner row for ranking tables
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PartnerRow {
    pub partner: String,
    pub total_tasks: u64,
    pub nan_count: u64,
    pub nan_ratio: f64,
}

pub struct Aggregator;

impl Aggregator {
    /// Merge several periods into one dataset.
    ///
    /// `weekly_stats` is the union of every period's weeks; on a label
    /// collision the later period in `periods` replaces the earlier one.
    /// Partner counts are summed and the ratio recomputed from the sums.
    /// Periods without a dataset are skipped with a warning.
    pub fn combine(periods: &[Period], datasets: &HashMap<Period, Arc<Dataset>>) -> CombinedDataset {
        let mut total_records: u64 = 0;
        let mut weekly_stats: BTreeMap<String, WeekStat> = BTreeMap::new();
        let mut partner_summary: BTreeMap<String, PartnerStat> = BTreeMap::new();
        let mut included: Vec<String> = Vec::new();
        let mut extracted_at = None;

        for period in periods {
            let Some(dataset) = datasets.get(period) else {
                let missing = NanRateError::AggregationInputMissing(period.to_string());
                warn!(error = %missing, "skipping period");
                continue;
            };
            debug!(%period, weeks = ?dataset.week_labels(), "merging period");

            included.push(period.to_string());
            total_records = total_records.saturating_add(dataset.total_records);
            extracted_at = extracted_at.max(Some(dataset.extracted_at));

            for (label, week) in &dataset.weekly_stats {
                if weekly_stats.insert(label.clone(), week.clone()).is_some() {
                    warn!(%period, week = %label, "week label collision, later period wins");
                }
            }

            for (partner, stat) in &dataset.partner_summary {
                let combined = partner_summary.entry(partner.clone()).or_default();
                combined.total_tasks = combined.total_tasks.saturating_add(stat.total_tasks);
                combined.nan_count = combined.nan_count.saturating_add(stat.nan_count);
                for (label, week) in &stat.weeks {
                    combined.weeks.insert(label.clone(), week.clone());
                }
            }
        }

        for stat in partner_summary.values_mut() {
            stat.recompute_ratio();
        }

        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "months_included".to_string(),
            serde_json::Value::from(included),
        );

        Dataset {
            extracted_at: extracted_at.unwrap_or_else(Utc::now),
            period_label: span_label(periods),
            total_records,
            weekly_stats,
            partner_summary,
            metadata,
        }
    }

    /// Overall ratio comes from summed partner counts, not averaged ratios
    pub fn summary(dataset: &Dataset, high_nan_threshold: f64) -> DatasetSummary {
        let mut total_tasks: u64 = 0;
        let mut nan_count: u64 = 0;
        let mut high_nan_partners = 0;

        for stat in dataset.partner_summary.values() {
            total_tasks = total_tasks.saturating_add(stat.total_tasks);
            nan_count = nan_count.saturating_add(stat.nan_count);
            if stat.nan_ratio > high_nan_threshold {
                high_nan_partners += 1;
            }
        }

        DatasetSummary {
            period_label: dataset.period_label.clone(),
            extracted_at: dataset.extracted_at,
            total_records: dataset.total_records,
            total_tasks,
            nan_count,
            overall_nan_ratio: nan_ratio(nan_count, total_tasks),
            high_nan_partners,
            total_partners: dataset.partner_summary.len(),
        }
    }

    /// Weekly trend in numeric week order
    pub fn weekly_trend(dataset: &Dataset) -> Vec<WeekTrend> {
        dataset
            .week_labels()
            .into_iter()
            .filter_map(|label| {
                let week = dataset.weekly_stats.get(label)?;
                Some(WeekTrend {
                    week_label: label.to_string(),
                    date: week.date.clone(),
                    is_sunday_data: week.is_sunday_data,
                    mech_nan_ratio: category_ratio(week, Category::Mech),
                    elec_nan_ratio: category_ratio(week, Category::Elec),
                })
            })
            .collect()
    }

    /// Partners sorted by NaN ratio descending, then name
    pub fn partners_by_ratio(dataset: &Dataset) -> Vec<PartnerRow> {
        let mut rows: Vec<PartnerRow> = dataset
            .partner_summary
            .iter()
            .map(|(partner, stat)| PartnerRow {
                partner: partner.clone(),
                total_tasks: stat.total_tasks,
                nan_count: stat.nan_count,
                nan_ratio: stat.nan_ratio,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.nan_ratio
                .total_cmp(&a.nan_ratio)
                .then_with(|| a.partner.cmp(&b.partner))
        });
        rows
    }
}

/// `first ~ last`, or just `first` for a single period
fn span_label(periods: &[Period]) -> String {
    match (periods.first(), periods.last()) {
        (Some(first), Some(last)) if first != last => format!("{} ~ {}", first, last),
        (Some(first), _) => first.to_string(),
        _ => String::new(),
    }
}

fn category_ratio(week: &WeekStat, category: Category) -> f64 {
    let (total, nan) = week
        .partners
        .get(&category)
        .map(|partners| {
            partners.values().fold((0u64, 0u64), |(t, n), p| {
                (t.saturating_add(p.total_tasks), n.saturating_add(p.nan_count))
            })
        })
        .unwrap_or((0, 0));
    nan_ratio(nan, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::sample_dataset;
    use crate::types::PartnerWeekStat;

    fn period(s: &str) -> Period {
        s.parse().unwrap()
    }

    fn datasets(items: Vec<(&str, Dataset)>) -> HashMap<Period, Arc<Dataset>> {
        items
            .into_iter()
            .map(|(p, d)| (period(p), Arc::new(d)))
            .collect()
    }

    // ========== combine() tests ==========

    #[test]
    fn test_combine_recomputes_ratio_not_average() {
        let a = sample_dataset("2025-07", 10, &[("27주차", "BAT", 100, 2)]);
        let b = sample_dataset("2025-08", 20, &[("31주차", "BAT", 50, 4)]);
        let periods = vec![period("2025-07"), period("2025-08")];

        let combined = Aggregator::combine(&periods, &datasets(vec![("2025-07", a), ("2025-08", b)]));

        let bat = &combined.partner_summary["BAT"];
        assert_eq!(bat.total_tasks, 150);
        assert_eq!(bat.nan_count, 6);
        assert!((bat.nan_ratio - 4.0).abs() < 1e-9);
        assert!((bat.nan_ratio - 5.0).abs() > 0.5);
    }

    #[test]
    fn test_combine_total_records_is_sum() {
        let periods = vec![period("2025-06"), period("2025-07"), period("2025-08")];
        let combined = Aggregator::combine(
            &periods,
            &datasets(vec![
                ("2025-06", sample_dataset("2025-06", 7, &[])),
                ("2025-07", sample_dataset("2025-07", 11, &[])),
                ("2025-08", sample_dataset("2025-08", 13, &[])),
            ]),
        );
        assert_eq!(combined.total_records, 31);
    }

    #[test]
    fn test_combine_unions_weeks() {
        let a = sample_dataset("2025-07", 1, &[("27주차", "BAT", 10, 1), ("28주차", "FNI", 10, 0)]);
        let b = sample_dataset("2025-08", 1, &[("31주차", "BAT", 10, 0)]);
        let periods = vec![period("2025-07"), period("2025-08")];

        let combined = Aggregator::combine(&periods, &datasets(vec![("2025-07", a), ("2025-08", b)]));

        assert_eq!(combined.week_labels(), vec!["27주차", "28주차", "31주차"]);
        let bat_weeks: Vec<&String> = combined.partner_summary["BAT"].weeks.keys().collect();
        assert_eq!(bat_weeks, vec!["27주차", "31주차"]);
        assert_eq!(combined.partner_summary.len(), 2);
    }

    #[test]
    fn test_combine_week_collision_last_wins() {
        let a = sample_dataset("2025-07", 1, &[("31주차", "BAT", 10, 1)]);
        let b = sample_dataset("2025-08", 1, &[("31주차", "BAT", 40, 4)]);
        let periods = vec![period("2025-07"), period("2025-08")];

        let combined = Aggregator::combine(&periods, &datasets(vec![("2025-07", a), ("2025-08", b)]));

        let week = &combined.weekly_stats["31주차"];
        assert_eq!(week.partners[&Category::Mech]["BAT"].total_tasks, 40);
        // partner totals still sum both periods
        assert_eq!(combined.partner_summary["BAT"].total_tasks, 50);
    }

    #[test]
    fn test_combine_skips_missing_period() {
        let periods = vec![period("2025-06"), period("2025-07"), period("2025-08")];
        let combined = Aggregator::combine(
            &periods,
            &datasets(vec![
                ("2025-06", sample_dataset("2025-06", 5, &[])),
                ("2025-08", sample_dataset("2025-08", 6, &[])),
            ]),
        );

        assert_eq!(combined.total_records, 11);
        assert_eq!(
            combined.metadata["months_included"],
            serde_json::json!(["2025-06", "2025-08"])
        );
        // label still spans the requested range
        assert_eq!(combined.period_label, "2025-06 ~ 2025-08");
    }

    #[test]
    fn test_combine_zero_tasks_ratio_is_zero() {
        let a = sample_dataset("2025-07", 1, &[("27주차", "TMS(M)", 0, 0)]);
        let combined = Aggregator::combine(&[period("2025-07")], &datasets(vec![("2025-07", a)]));

        let tms = &combined.partner_summary["TMS(M)"];
        assert_eq!(tms.nan_ratio, 0.0);
        assert!(tms.nan_ratio.is_finite());
    }

    #[test]
    fn test_combine_empty_inputs() {
        let combined = Aggregator::combine(&[], &HashMap::new());
        assert_eq!(combined.total_records, 0);
        assert!(combined.weekly_stats.is_empty());
        assert!(combined.period_label.is_empty());
    }

    #[test]
    fn test_combine_uses_latest_extraction_time() {
        let mut a = sample_dataset("2025-07", 1, &[]);
        let b = sample_dataset("2025-08", 1, &[]);
        a.extracted_at = b.extracted_at + chrono::Duration::days(3);
        let expected = a.extracted_at;
        let periods = vec![period("2025-07"), period("2025-08")];

        let combined = Aggregator::combine(&periods, &datasets(vec![("2025-07", a), ("2025-08", b)]));
        assert_eq!(combined.extracted_at, expected);
    }

    #[test]
    fn test_span_label() {
        assert_eq!(span_label(&[period("2025-08")]), "2025-08");
        assert_eq!(
            span_label(&[period("2025-06"), period("2025-09")]),
            "2025-06 ~ 2025-09"
        );
    }

    // ========== summary() tests ==========

    #[test]
    fn test_summary_overall_ratio_and_high_partners() {
        let dataset = sample_dataset(
            "2025-08",
            30,
            &[
                ("31주차", "BAT", 100, 2),
                ("31주차", "FNI", 100, 0),
                ("31주차", "C&A", 50, 1),
            ],
        );

        let summary = Aggregator::summary(&dataset, 1.0);

        assert_eq!(summary.total_tasks, 250);
        assert_eq!(summary.nan_count, 3);
        assert!((summary.overall_nan_ratio - 1.2).abs() < 1e-9);
        // BAT 2% and C&A 2% exceed 1%, FNI 0% does not
        assert_eq!(summary.high_nan_partners, 2);
        assert_eq!(summary.total_partners, 3);
    }

    #[test]
    fn test_summary_empty_dataset() {
        let summary = Aggregator::summary(&sample_dataset("2025-08", 0, &[]), 1.0);
        assert_eq!(summary.overall_nan_ratio, 0.0);
        assert_eq!(summary.total_partners, 0);
    }

    // ========== weekly_trend() tests ==========

    #[test]
    fn test_weekly_trend_sorted_and_per_category() {
        let mut dataset = sample_dataset(
            "2025-08",
            1,
            &[
                ("33주차", "BAT", 100, 1),
                ("33주차", "FNI", 100, 3),
                ("9주차", "BAT", 10, 0),
            ],
        );
        dataset
            .weekly_stats
            .get_mut("33주차")
            .unwrap()
            .partners
            .entry(Category::Elec)
            .or_default()
            .insert(
                "P&S".to_string(),
                PartnerWeekStat {
                    total_tasks: 20,
                    nan_count: 1,
                    ..PartnerWeekStat::default()
                },
            );

        let trend = Aggregator::weekly_trend(&dataset);

        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].week_label, "9주차");
        assert_eq!(trend[0].mech_nan_ratio, 0.0);
        assert_eq!(trend[0].elec_nan_ratio, 0.0);
        assert!((trend[1].mech_nan_ratio - 2.0).abs() < 1e-9);
        assert!((trend[1].elec_nan_ratio - 5.0).abs() < 1e-9);
    }

    // ========== partners_by_ratio() tests ==========

    #[test]
    fn test_partners_by_ratio_descending() {
        let dataset = sample_dataset(
            "2025-08",
            1,
            &[
                ("31주차", "FNI", 100, 1),
                ("31주차", "BAT", 100, 3),
                ("31주차", "C&A", 100, 1),
            ],
        );

        let rows = Aggregator::partners_by_ratio(&dataset);
        let names: Vec<&str> = rows.iter().map(|r| r.partner.as_str()).collect();
        assert_eq!(names, vec!["BAT", "C&A", "FNI"]);
    }
}
