use std::path::Path;

use anyhow::{bail, Context};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{MultiValue, Task};

/// Separator for multi-valued cells in CSV input.
pub const LIST_SEPARATOR: char = '|';

pub fn load_tasks(path: &Path) -> anyhow::Result<Vec<Task>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let tasks = match extension.as_deref() {
        Some("json") => load_json(path)?,
        Some("csv") => load_csv(path)?,
        _ => bail!(
            "unsupported task file {} (expected .json or .csv)",
            path.display()
        ),
    };

    info!(path = %path.display(), tasks = tasks.len(), "loaded tasks");
    Ok(tasks)
}

pub fn load_json(path: &Path) -> anyhow::Result<Vec<Task>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse tasks in {}", path.display()))
}

pub fn load_csv(path: &Path) -> anyhow::Result<Vec<Task>> {
    let reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> anyhow::Result<Vec<Task>> {
    #[derive(serde::Deserialize, Default)]
    #[serde(rename_all = "camelCase", default)]
    struct CsvRow {
        id: Option<String>,
        priority: Option<String>,
        status: Option<String>,
        governorate: Option<String>,
        district: Option<String>,
        team_name: Option<String>,
        team_company: Option<String>,
        validation_status: Option<String>,
        gaia_check: Option<String>,
        reason: Option<String>,
        sub_reason: Option<String>,
        root_cause: Option<String>,
        responsible: Option<String>,
        itn_related: Option<String>,
        related_to_subscription: Option<String>,
        evaluation_score: Option<String>,
        created_at: Option<String>,
        interview_date: Option<String>,
        customer_name: Option<String>,
        contact_number: Option<String>,
        customer_feedback: Option<String>,
        slid: Option<String>,
        request_number: Option<String>,
    }

    fn list(cell: Option<String>) -> MultiValue {
        cell.map(|cell| MultiValue::new(cell.split(LIST_SEPARATOR).map(str::trim)))
            .unwrap_or_default()
    }

    fn text(cell: Option<String>) -> Option<String> {
        cell.map(|cell| cell.trim().to_string())
            .filter(|cell| !cell.is_empty())
    }

    let mut tasks = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed CSV row {}", index + 1))?;

        let evaluation_score = match text(row.evaluation_score) {
            Some(raw) => match raw.parse::<f64>() {
                Ok(score) => Some(score),
                Err(_) => {
                    warn!(
                        row = index + 1,
                        value = %raw,
                        "unreadable evaluation score treated as unscored"
                    );
                    None
                }
            },
            None => None,
        };

        let id = text(row.id).unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        tasks.push(Task {
            id,
            priority: text(row.priority),
            status: text(row.status),
            governorate: text(row.governorate),
            district: text(row.district),
            team_name: text(row.team_name),
            team_company: text(row.team_company),
            validation_status: text(row.validation_status),
            gaia_check: text(row.gaia_check),
            reason: list(row.reason),
            sub_reason: list(row.sub_reason),
            root_cause: list(row.root_cause),
            responsible: list(row.responsible),
            itn_related: list(row.itn_related),
            related_to_subscription: list(row.related_to_subscription),
            evaluation_score,
            created_at: text(row.created_at),
            interview_date: text(row.interview_date),
            customer_name: text(row.customer_name),
            contact_number: text(row.contact_number),
            customer_feedback: text(row.customer_feedback),
            slid: text(row.slid),
            request_number: text(row.request_number),
        });
    }

    Ok(tasks)
}
