use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::frequency;
use crate::models::{Task, TaskField};

pub const DEFAULT_ROW_LIMIT: usize = 10;
pub const DEFAULT_COL_LIMIT: usize = 8;

/// Row category x column owner contribution counts, restricted to the top
/// values of each axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrossTab {
    pub row_field: Option<TaskField>,
    pub col_field: Option<TaskField>,
    pub row_keys: Vec<String>,
    pub col_keys: Vec<String>,
    pub cells: BTreeMap<String, BTreeMap<String, usize>>,
    pub row_totals: BTreeMap<String, usize>,
    pub col_totals: BTreeMap<String, usize>,
}

impl CrossTab {
    pub fn cell(&self, row: &str, col: &str) -> usize {
        self.cells
            .get(row)
            .and_then(|cols| cols.get(col))
            .copied()
            .unwrap_or(0)
    }

    pub fn row_total(&self, row: &str) -> usize {
        self.row_totals.get(row).copied().unwrap_or(0)
    }

    pub fn col_total(&self, col: &str) -> usize {
        self.col_totals.get(col).copied().unwrap_or(0)
    }

    pub fn grand_total(&self) -> usize {
        self.col_totals.values().sum()
    }

    /// Share of the column owner's load that falls in this row.
    pub fn load_percentage(&self, row: &str, col: &str) -> f64 {
        let total = self.col_total(col);
        if total == 0 {
            return 0.0;
        }
        self.cell(row, col) as f64 / total as f64 * 100.0
    }

    fn bump(&mut self, row: &str, col: &str) {
        *self
            .cells
            .entry(row.to_string())
            .or_default()
            .entry(col.to_string())
            .or_insert(0) += 1;
        *self.row_totals.entry(row.to_string()).or_insert(0) += 1;
        *self.col_totals.entry(col.to_string()).or_insert(0) += 1;
    }
}

/// Builds the matrix. When both sides of a record list more than one value
/// the lists are read as parallel annotations and paired by position;
/// otherwise every row value is crossed with every column value.
pub fn build_matrix(
    tasks: &[Task],
    row_field: TaskField,
    col_field: TaskField,
    row_limit: usize,
    col_limit: usize,
) -> CrossTab {
    let row_keys: Vec<String> = frequency::top_k(tasks, row_field, row_limit)
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    let col_keys: Vec<String> = frequency::top_k(tasks, col_field, col_limit)
        .into_iter()
        .map(|entry| entry.name)
        .collect();

    let allowed_rows: HashSet<&str> = row_keys.iter().map(String::as_str).collect();
    let allowed_cols: HashSet<&str> = col_keys.iter().map(String::as_str).collect();

    let mut tab = CrossTab {
        row_field: Some(row_field),
        col_field: Some(col_field),
        ..CrossTab::default()
    };

    for task in tasks {
        let rows = task.bucket_values(row_field);
        let cols = task.bucket_values(col_field);

        if rows.len() > 1 && cols.len() > 1 {
            for (row, col) in rows.iter().zip(cols.iter()) {
                if allowed_rows.contains(row) && allowed_cols.contains(col) {
                    tab.bump(row, col);
                }
            }
        } else {
            for row in rows.iter().filter(|row| allowed_rows.contains(*row)) {
                for col in cols.iter().filter(|col| allowed_cols.contains(*col)) {
                    tab.bump(row, col);
                }
            }
        }
    }

    tab.row_keys = row_keys;
    tab.col_keys = col_keys;
    tab
}
