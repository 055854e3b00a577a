use std::collections::BTreeMap;

use tracing::debug;

use crate::calendar::{WeekCalendar, WeekLabel};
use crate::frequency;
use crate::models::{Task, TaskField, TrendKey, TrendResult, WeekPoint};

/// Number of series tracked when the caller does not say otherwise.
pub const DEFAULT_SERIES: usize = 5;

/// Groups records with a usable interview date by week. Weeks are keyed by
/// `(year, week)` so ranges crossing a year boundary stay chronological.
pub fn group_by_week<'a>(
    tasks: &'a [Task],
    calendar: &WeekCalendar,
) -> BTreeMap<WeekLabel, Vec<&'a Task>> {
    let mut weeks: BTreeMap<WeekLabel, Vec<&Task>> = BTreeMap::new();
    let mut undated = 0usize;
    for task in tasks {
        match task.interview_day() {
            Some(day) => weeks.entry(calendar.week_label(day)).or_default().push(task),
            None => undated += 1,
        }
    }
    if undated > 0 {
        debug!(undated, "records without a usable interview date left out of weekly buckets");
    }
    weeks
}

/// Weekly counts for the `series` most frequent values of `field`. The
/// tracked values are picked across the whole input so every week carries
/// the same keys.
pub fn build_trend(
    tasks: &[Task],
    field: TaskField,
    calendar: &WeekCalendar,
    series: usize,
) -> TrendResult {
    let top_keys: Vec<TrendKey> = frequency::top_k(tasks, field, series)
        .into_iter()
        .map(|entry| TrendKey {
            name: entry.name,
            total: entry.count,
        })
        .collect();

    let series = group_by_week(tasks, calendar)
        .into_iter()
        .map(|(week, members)| {
            let counts = top_keys
                .iter()
                .map(|key| {
                    let hits = members
                        .iter()
                        .filter(|task| task.bucket_values(field).contains(&key.name.as_str()))
                        .count();
                    (key.name.clone(), hits)
                })
                .collect();
            WeekPoint {
                week,
                total: members.len(),
                counts,
            }
        })
        .collect();

    TrendResult { series, top_keys }
}
