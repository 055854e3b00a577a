use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("unknown task field `{0}`")]
    UnknownField(String),
    #[error("unknown text column `{0}` (expected customer, contact, feedback, slid, location or team)")]
    UnknownColumn(String),
    #[error("unknown date range `{0}` (expected all, custom, this-week, last-week or latest-3-weeks)")]
    UnknownRange(String),
    #[error("invalid week label `{0}` (expected YYYY-Www)")]
    InvalidWeekLabel(String),
    #[error("invalid weekday `{0}`")]
    InvalidWeekday(String),
    #[error("expected key=value, got `{0}`")]
    MalformedPair(String),
}
