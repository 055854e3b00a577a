use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::calendar::WeekCalendar;
use crate::error::AnalyticsError;
use crate::models::{SearchKey, Task, TaskField, TextField};

/// Sentinel that disables a discrete filter.
pub const ALL: &str = "all";

/// Priority assumed for records that do not carry one.
pub const DEFAULT_PRIORITY: &str = "Normal";

/// Column-level text filters. Some columns search more than one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextColumn {
    Customer,
    Contact,
    Feedback,
    Slid,
    Location,
    Team,
}

impl TextColumn {
    pub fn searched_fields(self) -> &'static [SearchKey] {
        match self {
            TextColumn::Customer => &[SearchKey::Text(TextField::CustomerName)],
            TextColumn::Contact => &[SearchKey::Text(TextField::ContactNumber)],
            TextColumn::Feedback => &[SearchKey::Text(TextField::CustomerFeedback)],
            TextColumn::Slid => &[
                SearchKey::Text(TextField::Slid),
                SearchKey::Text(TextField::RequestNumber),
            ],
            TextColumn::Location => &[
                SearchKey::Category(TaskField::Governorate),
                SearchKey::Category(TaskField::District),
            ],
            TextColumn::Team => &[
                SearchKey::Category(TaskField::TeamName),
                SearchKey::Category(TaskField::TeamCompany),
            ],
        }
    }
}

impl FromStr for TextColumn {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "customername" => Ok(TextColumn::Customer),
            "contact" | "contactnumber" => Ok(TextColumn::Contact),
            "feedback" | "customerfeedback" => Ok(TextColumn::Feedback),
            "slid" | "requestnumber" => Ok(TextColumn::Slid),
            "location" => Ok(TextColumn::Location),
            "team" => Ok(TextColumn::Team),
            _ => Err(AnalyticsError::UnknownColumn(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRangeKind {
    #[default]
    All,
    Custom,
    ThisWeek,
    LastWeek,
    LatestThreeWeeks,
}

impl FromStr for DateRangeKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(DateRangeKind::All),
            "custom" => Ok(DateRangeKind::Custom),
            "this-week" => Ok(DateRangeKind::ThisWeek),
            "last-week" => Ok(DateRangeKind::LastWeek),
            "latest-3-weeks" => Ok(DateRangeKind::LatestThreeWeeks),
            _ => Err(AnalyticsError::UnknownRange(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub kind: DateRangeKind,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateFilter {
    pub fn custom(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            kind: DateRangeKind::Custom,
            start,
            end,
        }
    }

    pub fn preset(kind: DateRangeKind) -> Self {
        Self {
            kind,
            start: None,
            end: None,
        }
    }

    /// Inclusive bounds, `None` when the filter is inactive. An unset custom
    /// bound is open on that side.
    pub fn bounds(
        &self,
        calendar: &WeekCalendar,
        today: NaiveDate,
    ) -> Option<(Option<NaiveDate>, Option<NaiveDate>)> {
        match self.kind {
            DateRangeKind::All => None,
            DateRangeKind::Custom => Some((self.start, self.end)),
            DateRangeKind::ThisWeek => {
                let (start, end) = calendar.week_range(today);
                Some((Some(start), Some(end)))
            }
            DateRangeKind::LastWeek => {
                let (start, end) = calendar.week_range(today - Duration::days(7));
                Some((Some(start), Some(end)))
            }
            DateRangeKind::LatestThreeWeeks => {
                let (start, _) = calendar.week_range(today - Duration::days(14));
                let (_, end) = calendar.week_range(today);
                Some((Some(start), Some(end)))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvancedSearch {
    pub active: bool,
    pub terms: BTreeMap<SearchKey, String>,
}

/// Immutable snapshot of the active filters. The UI owns mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub discrete: BTreeMap<TaskField, String>,
    pub text: BTreeMap<TextColumn, String>,
    pub contains: BTreeMap<TaskField, String>,
    pub date: DateFilter,
    pub advanced: AdvancedSearch,
}

impl FilterSet {
    pub fn with_discrete(mut self, field: TaskField, value: impl Into<String>) -> Self {
        self.discrete.insert(field, value.into());
        self
    }

    pub fn with_text(mut self, column: TextColumn, needle: impl Into<String>) -> Self {
        self.text.insert(column, needle.into());
        self
    }

    pub fn with_contains(mut self, field: TaskField, needle: impl Into<String>) -> Self {
        self.contains.insert(field, needle.into());
        self
    }

    pub fn with_date(mut self, date: DateFilter) -> Self {
        self.date = date;
        self
    }

    pub fn with_search(mut self, key: SearchKey, needle: impl Into<String>) -> Self {
        self.advanced.active = true;
        self.advanced.terms.insert(key, needle.into());
        self
    }
}

fn is_inactive(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case(ALL)
}

fn lowered(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A filter set with needles lower-cased and date presets resolved, ready
/// to be evaluated against many records.
#[derive(Debug, Clone)]
pub struct TaskFilter {
    discrete: Vec<(TaskField, String)>,
    text: Vec<(&'static [SearchKey], String)>,
    contains: Vec<(TaskField, String)>,
    date: Option<(Option<NaiveDate>, Option<NaiveDate>)>,
    advanced: Vec<(SearchKey, String)>,
}

impl TaskFilter {
    pub fn new(filters: &FilterSet, calendar: &WeekCalendar, today: NaiveDate) -> Self {
        let discrete = filters
            .discrete
            .iter()
            .filter(|(_, value)| !is_inactive(value))
            .map(|(field, value)| (*field, value.trim().to_string()))
            .collect();
        let text = filters
            .text
            .iter()
            .filter(|(_, needle)| !is_inactive(needle))
            .map(|(column, needle)| (column.searched_fields(), lowered(needle)))
            .collect();
        let contains = filters
            .contains
            .iter()
            .filter(|(_, needle)| !is_inactive(needle))
            .map(|(field, needle)| (*field, lowered(needle)))
            .collect();
        let advanced = if filters.advanced.active {
            filters
                .advanced
                .terms
                .iter()
                .filter(|(_, needle)| !is_inactive(needle))
                .map(|(key, needle)| (*key, lowered(needle)))
                .collect()
        } else {
            Vec::new()
        };

        Self {
            discrete,
            text,
            contains,
            date: filters.date.bounds(calendar, today),
            advanced,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.discrete.is_empty()
            && self.text.is_empty()
            && self.contains.is_empty()
            && self.date.is_none()
            && self.advanced.is_empty()
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.discrete
            .iter()
            .all(|(field, value)| discrete_matches(task, *field, value))
            && self.text.iter().all(|(fields, needle)| {
                fields
                    .iter()
                    .any(|key| substring_matches(&task.search_values(*key), needle))
            })
            && self.contains.iter().all(|(field, needle)| {
                substring_matches(&task.raw_values(*field), needle)
            })
            && self.date_matches(task)
            && self
                .advanced
                .iter()
                .all(|(key, needle)| substring_matches(&task.search_values(*key), needle))
    }

    /// Keeps matching records in input order.
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        let kept: Vec<Task> = tasks.iter().filter(|task| self.matches(task)).cloned().collect();
        debug!(input = tasks.len(), kept = kept.len(), "filtered tasks");
        kept
    }

    fn date_matches(&self, task: &Task) -> bool {
        let Some((start, end)) = self.date else {
            return true;
        };
        let Some(day) = task.interview_day() else {
            return false;
        };
        start.map_or(true, |start| day >= start) && end.map_or(true, |end| day <= end)
    }
}

fn discrete_matches(task: &Task, field: TaskField, value: &str) -> bool {
    let values = task.raw_values(field);
    if values.is_empty() && field == TaskField::Priority {
        return value == DEFAULT_PRIORITY;
    }
    values.iter().any(|candidate| candidate.trim() == value)
}

fn substring_matches(values: &[&str], needle: &str) -> bool {
    values
        .iter()
        .any(|value| value.to_lowercase().contains(needle))
}

pub fn filter_tasks(
    tasks: &[Task],
    filters: &FilterSet,
    calendar: &WeekCalendar,
    today: NaiveDate,
) -> Vec<Task> {
    TaskFilter::new(filters, calendar, today).apply(tasks)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MultiValue;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        day(2026, 3, 4)
    }

    fn run(tasks: &[Task], filters: &FilterSet) -> Vec<Task> {
        filter_tasks(tasks, filters, &WeekCalendar::default(), today())
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            ..Task::default()
        }
    }

    #[test]
    fn discrete_filter_keeps_exact_matches() {
        let tasks = vec![
            Task {
                priority: Some("High".into()),
                status: Some("Todo".into()),
                ..task("a")
            },
            Task {
                priority: Some("Low".into()),
                status: Some("Closed".into()),
                ..task("b")
            },
        ];
        let filters = FilterSet::default().with_discrete(TaskField::Priority, "High");
        let kept = run(&tasks, &filters);
        assert_eq!(ids(&kept), ["a"]);
    }

    #[test]
    fn all_sentinel_and_empty_values_are_noops() {
        let tasks = vec![task("a"), task("b")];
        let filters = FilterSet::default()
            .with_discrete(TaskField::Status, "all")
            .with_text(TextColumn::Customer, "  ")
            .with_contains(TaskField::Reason, "");
        assert!(TaskFilter::new(&filters, &WeekCalendar::default(), today()).is_noop());
        assert_eq!(run(&tasks, &filters).len(), 2);
    }

    #[test]
    fn missing_priority_defaults_to_normal() {
        let tasks = vec![
            task("a"),
            Task {
                priority: Some("High".into()),
                ..task("b")
            },
        ];
        let filters = FilterSet::default().with_discrete(TaskField::Priority, "Normal");
        assert_eq!(ids(&run(&tasks, &filters)), ["a"]);

        let filters = FilterSet::default().with_discrete(TaskField::Status, "Todo");
        assert!(run(&tasks, &filters).is_empty());
    }

    #[test]
    fn location_column_matches_governorate_or_district() {
        let tasks = vec![
            Task {
                governorate: Some("Cairo".into()),
                ..task("a")
            },
            Task {
                district: Some("New Cairo".into()),
                ..task("b")
            },
            Task {
                governorate: Some("Giza".into()),
                ..task("c")
            },
            task("d"),
        ];
        let filters = FilterSet::default().with_text(TextColumn::Location, "CAIRO");
        assert_eq!(ids(&run(&tasks, &filters)), ["a", "b"]);
    }

    #[test]
    fn slid_column_matches_request_number() {
        let tasks = vec![
            Task {
                slid: Some("SL-4410".into()),
                ..task("a")
            },
            Task {
                request_number: Some("REQ-4410".into()),
                ..task("b")
            },
            Task {
                slid: Some("SL-9000".into()),
                request_number: Some("REQ-9000".into()),
                ..task("c")
            },
            task("d"),
        ];
        let filters = FilterSet::default().with_text(TextColumn::Slid, "4410");
        assert_eq!(ids(&run(&tasks, &filters)), ["a", "b"]);
    }

    #[test]
    fn team_column_matches_company() {
        let tasks = vec![
            Task {
                team_name: Some("Falcon Crew".into()),
                ..task("a")
            },
            Task {
                team_name: Some("North 2".into()),
                team_company: Some("Falcon Services".into()),
                ..task("b")
            },
            Task {
                team_company: Some("Orbit".into()),
                ..task("c")
            },
        ];
        let filters = FilterSet::default().with_text(TextColumn::Team, "falcon");
        assert_eq!(ids(&run(&tasks, &filters)), ["a", "b"]);
    }

    #[test]
    fn contains_filter_checks_every_list_element() {
        let tasks = vec![
            Task {
                reason: MultiValue::new(["Billing", "Signal Drop"]),
                ..task("a")
            },
            Task {
                reason: MultiValue::single("Installation"),
                ..task("b")
            },
            task("c"),
        ];
        let filters = FilterSet::default().with_contains(TaskField::Reason, "signal");
        assert_eq!(ids(&run(&tasks, &filters)), ["a"]);
    }

    #[test]
    fn custom_range_is_inclusive_and_drops_bad_dates() {
        let dated = |id: &str, date: &str| Task {
            interview_date: Some(date.to_string()),
            ..task(id)
        };
        let tasks = vec![
            dated("a", "2026-02-01"),
            dated("b", "2026-02-10T09:00:00Z"),
            dated("c", "2026-02-11"),
            dated("d", "not a date"),
            task("e"),
        ];
        let range = DateFilter::custom(Some(day(2026, 2, 1)), Some(day(2026, 2, 10)));
        let filters = FilterSet::default().with_date(range);
        assert_eq!(ids(&run(&tasks, &filters)), ["a", "b"]);
    }

    #[test]
    fn week_presets_follow_the_calendar() {
        // Sunday-started weeks: this week is Mar 1..=7, last week Feb 22..=28.
        let dated = |id: &str, date: &str| Task {
            interview_date: Some(date.to_string()),
            ..task(id)
        };
        let tasks = vec![
            dated("this", "2026-03-01"),
            dated("last", "2026-02-28"),
            dated("older", "2026-02-15"),
            dated("oldest", "2026-02-14"),
        ];
        let kept = |kind| -> Vec<String> {
            let filters = FilterSet::default().with_date(DateFilter::preset(kind));
            run(&tasks, &filters).into_iter().map(|t| t.id).collect()
        };
        assert_eq!(kept(DateRangeKind::ThisWeek), ["this"]);
        assert_eq!(kept(DateRangeKind::LastWeek), ["last"]);
        assert_eq!(
            kept(DateRangeKind::LatestThreeWeeks),
            ["this", "last", "older"]
        );
        assert_eq!(kept(DateRangeKind::All).len(), 4);
    }

    #[test]
    fn advanced_search_applies_only_when_active() {
        let tasks = vec![
            Task {
                slid: Some("SL-100".into()),
                ..task("a")
            },
            Task {
                slid: Some("SL-200".into()),
                ..task("b")
            },
        ];
        let mut filters =
            FilterSet::default().with_search(SearchKey::Text(TextField::Slid), "sl-1");
        assert_eq!(run(&tasks, &filters).len(), 1);

        filters.advanced.active = false;
        assert_eq!(run(&tasks, &filters).len(), 2);
    }

    #[test]
    fn advanced_search_treats_all_as_noop() {
        let tasks = vec![
            Task {
                status: Some("Closed".into()),
                ..task("a")
            },
            Task {
                status: Some("Todo".into()),
                ..task("b")
            },
        ];
        let filters =
            FilterSet::default().with_search(SearchKey::Category(TaskField::Status), "all");
        assert!(TaskFilter::new(&filters, &WeekCalendar::default(), today()).is_noop());
        assert_eq!(ids(&run(&tasks, &filters)), ["a", "b"]);
    }

    #[test]
    fn advanced_search_checks_every_list_element() {
        let tasks = vec![
            Task {
                reason: MultiValue::new(["Billing", "Slow Speed"]),
                ..task("a")
            },
            Task {
                reason: MultiValue::single("Billing"),
                ..task("b")
            },
        ];
        let filters =
            FilterSet::default().with_search(SearchKey::Category(TaskField::Reason), "speed");
        assert_eq!(ids(&run(&tasks, &filters)), ["a"]);
    }

    #[test]
    fn output_preserves_input_order() {
        let tasks: Vec<Task> = ["c", "a", "b"]
            .into_iter()
            .map(|id| Task {
                status: Some("Open".into()),
                ..task(id)
            })
            .collect();
        let filters = FilterSet::default().with_discrete(TaskField::Status, "Open");
        assert_eq!(ids(&run(&tasks, &filters)), ["c", "a", "b"]);
    }
}
