use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use nanrate::config::Config;
use nanrate::services::{Aggregator, Dashboard};
use nanrate::types::{Dataset, Period, Selection};

/// Monthly partner NaN-rate reports
#[derive(Parser)]
#[command(name = "nanrate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: ~/.nanrate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data location, URL or directory (overrides config)
    #[arg(long, global = true)]
    source: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List periods with data
    Periods {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one period (YYYY-MM) or all periods combined (default: latest)
    Show {
        target: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run consistency checks on a period (default: latest)
    Check { period: Option<String> },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.load_config()?;
        let dashboard = Dashboard::from_config(&config).await?;

        match self.command {
            None => show(&dashboard, &config, None, false).await,
            Some(Commands::Periods { json }) => {
                print_periods(&dashboard, json)?;
                Ok(())
            }
            Some(Commands::Show { target, json }) => {
                show(&dashboard, &config, target.as_deref(), json).await
            }
            Some(Commands::Check { period }) => check(&dashboard, period.as_deref()).await,
        }
    }

    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref()).context("loading config")?;
        if let Some(source) = &self.source {
            config.source = source.clone();
        }
        Ok(config)
    }
}

fn default_period(dashboard: &Dashboard) -> anyhow::Result<Period> {
    dashboard
        .default_period()
        .ok_or_else(|| anyhow!("no periods available"))
}

fn print_periods(dashboard: &Dashboard, json: bool) -> anyhow::Result<()> {
    let default = dashboard.default_period();
    if json {
        let rows: Vec<serde_json::Value> = dashboard
            .available_periods()
            .iter()
            .map(|p| {
                serde_json::json!({
                    "period": p.to_string(),
                    "label": p.display_label(),
                    "default": Some(*p) == default,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for period in dashboard.available_periods() {
        let marker = if Some(*period) == default { "*" } else { " " };
        println!("{} {}  {}", marker, period, period.display_label());
    }
    Ok(())
}

async fn show(
    dashboard: &Dashboard,
    config: &Config,
    target: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let selection = match target {
        Some(t) => t.parse::<Selection>()?,
        None => Selection::Period(default_period(dashboard)?),
    };
    let dataset = dashboard.get_dataset(selection).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(dataset.as_ref())?);
    } else {
        print_report(selection, &dataset, config.high_nan_threshold);
    }
    Ok(())
}

async fn check(dashboard: &Dashboard, period: Option<&str>) -> anyhow::Result<()> {
    let period = match period {
        Some(p) => p.parse::<Period>()?,
        None => default_period(dashboard)?,
    };
    let dataset = dashboard.resolver().resolve(period).await?;
    let issues = dashboard.resolver().check(period, &dataset);

    if issues.is_empty() {
        println!("{}: no issues", period);
    } else {
        for issue in &issues {
            println!("{}", issue);
        }
    }
    Ok(())
}

fn print_report(selection: Selection, dataset: &Dataset, threshold: f64) {
    let summary = Aggregator::summary(dataset, threshold);
    let title = match selection {
        Selection::Period(p) => p.display_label(),
        Selection::All => summary.period_label.clone(),
    };

    println!("NaN rate report: {}", title);
    println!(
        "Extracted:  {}",
        summary.extracted_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!("Records:    {}", format_number(summary.total_records));
    println!(
        "Overall:    {} ({} / {} tasks)",
        format_ratio(summary.overall_nan_ratio),
        format_number(summary.nan_count),
        format_number(summary.total_tasks)
    );
    println!(
        "Partners:   {} of {} above {}",
        summary.high_nan_partners,
        summary.total_partners,
        format_ratio(threshold)
    );

    println!();
    println!("{:<16} {:>10} {:>8} {:>8}", "Partner", "Tasks", "NaN", "Ratio");
    for row in Aggregator::partners_by_ratio(dataset) {
        println!(
            "{:<16} {:>10} {:>8} {:>8}",
            row.partner,
            format_number(row.total_tasks),
            format_number(row.nan_count),
            format_ratio(row.nan_ratio)
        );
    }

    println!();
    println!("{:<10} {:<12} {:>8} {:>8}", "Week", "Date", "Mech", "Elec");
    for week in Aggregator::weekly_trend(dataset) {
        println!(
            "{:<10} {:<12} {:>8} {:>8}",
            week.week_label,
            week.date,
            format_ratio(week.mech_nan_ratio),
            format_ratio(week.elec_nan_ratio)
        );
    }
}

/// Format a number with thousand separators (e.g., 1234567 -> "1,234,567")
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let len = s.len();
    let mut result = String::with_capacity(len + len / 3);

    for (i, ch) in s.bytes().enumerate() {
        if i > 0 && (len - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(ch as char);
    }

    result
}

fn format_ratio(ratio: f64) -> String {
    format!("{:.2}%", ratio)
}
