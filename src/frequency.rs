use std::collections::HashMap;

use crate::models::{FrequencyEntry, Task, TaskField};

/// Counts every bucket value of `field`. Multi-valued fields fan out: a
/// record with three reasons adds one to each of the three buckets.
pub fn count_values<'a>(tasks: &'a [Task], field: TaskField) -> HashMap<&'a str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for task in tasks {
        for value in task.bucket_values(field) {
            *counts.entry(value).or_insert(0) += 1;
        }
    }
    counts
}

/// Share of `total` as a whole percentage; zero when there is nothing to
/// divide by.
pub fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u32
}

/// Full ranking by descending count, ties broken alphabetically.
/// Percentages are taken against the number of records, not the number of
/// counted values.
pub fn rank(tasks: &[Task], field: TaskField) -> Vec<FrequencyEntry> {
    let total = tasks.len();
    let mut entries: Vec<FrequencyEntry> = count_values(tasks, field)
        .into_iter()
        .map(|(name, count)| FrequencyEntry {
            name: name.to_string(),
            count,
            percentage: percentage(count, total),
        })
        .collect();

    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries
}

pub fn top_k(tasks: &[Task], field: TaskField, k: usize) -> Vec<FrequencyEntry> {
    let mut entries = rank(tasks, field);
    entries.truncate(k);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MultiValue;

    fn with_reason(values: &[&str]) -> Task {
        Task {
            reason: MultiValue::new(values.iter().copied()),
            ..Task::default()
        }
    }

    #[test]
    fn multi_valued_fields_fan_out_against_record_total() {
        let tasks = vec![with_reason(&["A", "B"]), with_reason(&["A"])];
        let top = top_k(&tasks, TaskField::Reason, 2);
        assert_eq!(
            top,
            vec![
                FrequencyEntry {
                    name: "A".into(),
                    count: 2,
                    percentage: 100,
                },
                FrequencyEntry {
                    name: "B".into(),
                    count: 1,
                    percentage: 50,
                },
            ]
        );
    }

    #[test]
    fn missing_values_count_as_unknown() {
        let tasks = vec![
            Task {
                status: Some("Open".into()),
                ..Task::default()
            },
            Task::default(),
            Task::default(),
        ];
        let top = top_k(&tasks, TaskField::Status, 5);
        assert_eq!(top[0].name, "Unknown");
        assert_eq!(top[0].count, 2);
        assert_eq!(top[0].percentage, 67);
        assert_eq!(top[1].name, "Open");
    }

    #[test]
    fn ties_break_alphabetically_and_k_truncates() {
        let tasks = vec![with_reason(&["Zeta"]), with_reason(&["Alpha"]), with_reason(&["Mid"])];
        let names: Vec<_> = top_k(&tasks, TaskField::Reason, 2)
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, ["Alpha", "Mid"]);
    }

    #[test]
    fn empty_input_yields_no_entries() {
        assert!(top_k(&[], TaskField::Reason, 5).is_empty());
        assert_eq!(percentage(3, 0), 0);
    }
}
