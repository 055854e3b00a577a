use std::fmt::Write;

use crate::models::{Task, TaskField};

/// A field=value selection coming from a clicked row or cell, plus the title
/// shown above the resulting list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrillDown {
    pub title: String,
    pub constraints: Vec<(TaskField, String)>,
}

impl DrillDown {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            constraints: Vec::new(),
        }
    }

    pub fn with(mut self, field: TaskField, value: impl Into<String>) -> Self {
        self.constraints.push((field, value.into()));
        self
    }

    /// Title given by the caller, or one derived from the constraints.
    pub fn display_title(&self) -> String {
        if !self.title.trim().is_empty() {
            return self.title.clone();
        }
        let mut title = String::from("Tasks");
        for (index, (field, value)) in self.constraints.iter().enumerate() {
            let joiner = if index == 0 { " where " } else { " and " };
            let _ = write!(title, "{joiner}{field} = {value}");
        }
        title
    }

    pub fn resolve(&self, tasks: &[Task]) -> Vec<Task> {
        resolve(tasks, &self.constraints)
    }
}

/// Records satisfying every constraint. Multi-valued fields match when any
/// element equals the value; `Unknown` matches a missing field, mirroring
/// how the aggregates bucket it.
pub fn resolve(tasks: &[Task], constraints: &[(TaskField, String)]) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| {
            constraints.iter().all(|(field, value)| {
                task.bucket_values(*field)
                    .iter()
                    .any(|candidate| *candidate == value.as_str())
            })
        })
        .cloned()
        .collect()
}
