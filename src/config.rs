use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{parse_weekday, WeekCalendar, WeekConfig, WeekLabel, YearBoundary};
use crate::kpi::SampleSchedule;
use crate::matrix::{DEFAULT_COL_LIMIT, DEFAULT_ROW_LIMIT};
use crate::trend::DEFAULT_SERIES;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub week: WeekSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub samples: Vec<SampleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSection {
    #[serde(default = "default_start_day")]
    pub start_day: String,
    #[serde(default)]
    pub fiscal_year_start: Option<NaiveDate>,
    #[serde(default)]
    pub year_boundary: YearBoundary,
}

impl Default for WeekSection {
    fn default() -> Self {
        Self {
            start_day: default_start_day(),
            fiscal_year_start: None,
            year_boundary: YearBoundary::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_summary_top_k")]
    pub summary_top_k: usize,
    #[serde(default = "default_full_top_k")]
    pub full_top_k: usize,
    #[serde(default = "default_trend_series")]
    pub trend_series: usize,
    #[serde(default = "default_matrix_rows")]
    pub matrix_rows: usize,
    #[serde(default = "default_matrix_cols")]
    pub matrix_cols: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            summary_top_k: default_summary_top_k(),
            full_top_k: default_full_top_k(),
            trend_series: default_trend_series(),
            matrix_rows: default_matrix_rows(),
            matrix_cols: default_matrix_cols(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEntry {
    pub week: WeekLabel,
    pub count: usize,
}

fn default_start_day() -> String {
    "sunday".to_string()
}

fn default_summary_top_k() -> usize {
    5
}

fn default_full_top_k() -> usize {
    10
}

fn default_trend_series() -> usize {
    DEFAULT_SERIES
}

fn default_matrix_rows() -> usize {
    DEFAULT_ROW_LIMIT
}

fn default_matrix_cols() -> usize {
    DEFAULT_COL_LIMIT
}

impl AnalyticsConfig {
    pub fn calendar(&self) -> Result<WeekCalendar> {
        Ok(WeekCalendar::new(WeekConfig {
            week_start: parse_weekday(&self.week.start_day)?,
            fiscal_year_start: self.week.fiscal_year_start,
            year_boundary: self.week.year_boundary,
        }))
    }

    pub fn sample_schedule(&self) -> SampleSchedule {
        SampleSchedule::new(self.samples.iter().map(|entry| (entry.week, entry.count)))
    }
}

pub fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig> {
    let Some(path) = path else {
        return Ok(AnalyticsConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AnalyticsConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    // Surface a bad weekday at load time rather than on first use.
    config.calendar()?;
    tracing::debug!(path = %path.display(), samples = config.samples.len(), "loaded config");
    Ok(config)
}
