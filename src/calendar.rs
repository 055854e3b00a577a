use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::AnalyticsError;

/// How the week that straddles a year anchor is labelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum YearBoundary {
    /// Days before the anchor stay in the old year's last week.
    #[default]
    Split,
    /// The whole straddling week becomes week 1 of the new year.
    RollForward,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekConfig {
    pub week_start: Weekday,
    /// Only month and day are used.
    pub fiscal_year_start: Option<NaiveDate>,
    pub year_boundary: YearBoundary,
}

impl Default for WeekConfig {
    fn default() -> Self {
        Self {
            week_start: Weekday::Sun,
            fiscal_year_start: None,
            year_boundary: YearBoundary::Split,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekLabel {
    pub year: i32,
    pub week: u32,
}

impl fmt::Display for WeekLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekLabel {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AnalyticsError::InvalidWeekLabel(s.to_string());
        let (year, week) = s.trim().split_once("-W").ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let week = week.parse::<u32>().map_err(|_| invalid())?;
        if !(1..=54).contains(&week) {
            return Err(invalid());
        }
        Ok(WeekLabel { year, week })
    }
}

impl Serialize for WeekLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekLabel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub fn parse_weekday(raw: &str) -> Result<Weekday, AnalyticsError> {
    raw.trim()
        .parse::<Weekday>()
        .map_err(|_| AnalyticsError::InvalidWeekday(raw.to_string()))
}

/// Project week numbering. Pure: the same date and config always give the
/// same label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekCalendar {
    config: WeekConfig,
}

impl WeekCalendar {
    pub fn new(config: WeekConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WeekConfig {
        &self.config
    }

    pub fn start_of_week(&self, date: NaiveDate) -> NaiveDate {
        let offset = (date.weekday().num_days_from_sunday() + 7
            - self.config.week_start.num_days_from_sunday())
            % 7;
        date - Duration::days(i64::from(offset))
    }

    /// Inclusive `(start, end)` of the week containing `date`.
    pub fn week_range(&self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = self.start_of_week(date);
        (start, start + Duration::days(6))
    }

    /// Week number of `date` counted from the anchor of `year`.
    pub fn week_number(&self, date: NaiveDate, year: i32) -> i64 {
        let first = self.start_of_week(self.anchor(year));
        (self.start_of_week(date) - first).num_days().div_euclid(7) + 1
    }

    pub fn week_label(&self, date: NaiveDate) -> WeekLabel {
        let mut year = self.anchor_year(date);
        if self.config.year_boundary == YearBoundary::RollForward {
            let next = self.anchor(year + 1);
            if self.start_of_week(date) + Duration::days(6) >= next {
                year += 1;
            }
        }
        let week = u32::try_from(self.week_number(date, year)).unwrap_or(1);
        WeekLabel { year, week }
    }

    fn anchor(&self, year: i32) -> NaiveDate {
        let (month, day) = self
            .config
            .fiscal_year_start
            .map_or((1, 1), |start| (start.month(), start.day()));
        NaiveDate::from_ymd_opt(year, month, day)
            .or_else(|| NaiveDate::from_ymd_opt(year, month, 28))
            .unwrap_or(NaiveDate::MIN)
    }

    fn anchor_year(&self, date: NaiveDate) -> i32 {
        if date >= self.anchor(date.year()) {
            date.year()
        } else {
            date.year() - 1
        }
    }
}
