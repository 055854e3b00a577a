use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::calendar::WeekCalendar;
use crate::config::AnalyticsConfig;
use crate::frequency;
use crate::kpi::{self, SampleSchedule};
use crate::matrix;
use crate::models::{Task, TaskField};
use crate::trend;

/// Flat tabular sheet handed to a spreadsheet writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    fn new<I, S>(name: &str, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.rows.push(row.into_iter().map(|cell| cell.to_string()).collect());
    }

    /// File-friendly form of the sheet name.
    pub fn slug(&self) -> String {
        self.name
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join("_")
    }
}

pub trait SheetSink {
    fn write_sheet(&mut self, sheet: &Sheet) -> anyhow::Result<()>;
}

/// Writes each sheet as `<slug>.csv` inside a directory.
pub struct CsvDirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl CsvDirectorySink {
    pub fn create(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create export directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl SheetSink for CsvDirectorySink {
    fn write_sheet(&mut self, sheet: &Sheet) -> anyhow::Result<()> {
        let path = self.dir.join(format!("{}.csv", sheet.slug()));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        writer.write_record(&sheet.headers)?;
        for row in &sheet.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        info!(sheet = %sheet.name, rows = sheet.rows.len(), path = %path.display(), "wrote sheet");
        self.written.push(path);
        Ok(())
    }
}

fn fmt_rate(value: f64) -> String {
    format!("{value:.1}")
}

pub fn executive_summary(
    tasks: &[Task],
    calendar: &WeekCalendar,
    samples: &SampleSchedule,
    config: &AnalyticsConfig,
) -> Sheet {
    let rule = samples.rule_for(tasks, calendar);
    let kpis = kpi::summarize_with_samples(tasks, rule);
    let mut sheet = Sheet::new("Executive Summary", ["Metric", "Value"]);

    sheet.push(["Total audits".to_string(), kpis.total.to_string()]);
    if let Some(rule) = rule {
        sheet.push([
            "Expected samples".to_string(),
            rule.total_expected_samples.to_string(),
        ]);
    }
    sheet.push(["Validated".to_string(), kpis.validated.to_string()]);
    sheet.push(["Compliance rate %".to_string(), fmt_rate(kpis.compliance_rate)]);
    sheet.push(["Promoter rate %".to_string(), fmt_rate(kpis.promoter_rate)]);
    sheet.push(["Neutral rate %".to_string(), fmt_rate(kpis.neutral_rate)]);
    sheet.push(["Detractor rate %".to_string(), fmt_rate(kpis.detractor_rate)]);
    sheet.push(["NPS".to_string(), fmt_rate(kpis.nps)]);
    sheet.push(["Average score".to_string(), format!("{:.2}", kpis.avg_score)]);

    for (rank, entry) in frequency::top_k(tasks, TaskField::Reason, config.limits.summary_top_k)
        .into_iter()
        .enumerate()
    {
        sheet.push([
            format!("Top reason #{}", rank + 1),
            format!("{} ({} / {}%)", entry.name, entry.count, entry.percentage),
        ]);
    }
    sheet
}

pub fn reason_analytics(tasks: &[Task]) -> Sheet {
    let mut sheet = Sheet::new("Reason Analytics", ["Field", "Value", "Count", "Percentage"]);
    for field in [TaskField::Reason, TaskField::SubReason, TaskField::RootCause] {
        for entry in frequency::rank(tasks, field) {
            sheet.push([
                field.name().to_string(),
                entry.name,
                entry.count.to_string(),
                entry.percentage.to_string(),
            ]);
        }
    }
    sheet
}

pub fn owner_performance(tasks: &[Task], config: &AnalyticsConfig) -> Sheet {
    let tab = matrix::build_matrix(
        tasks,
        TaskField::Reason,
        TaskField::Responsible,
        config.limits.matrix_rows,
        config.limits.matrix_cols,
    );

    let mut headers = vec!["Reason".to_string()];
    for owner in &tab.col_keys {
        headers.push(owner.clone());
        headers.push(format!("{owner} load %"));
    }
    headers.push("Total".to_string());
    let mut sheet = Sheet::new("Owner Performance", headers);

    for reason in &tab.row_keys {
        let mut row = vec![reason.clone()];
        for owner in &tab.col_keys {
            row.push(tab.cell(reason, owner).to_string());
            row.push(fmt_rate(tab.load_percentage(reason, owner)));
        }
        row.push(tab.row_total(reason).to_string());
        sheet.push(row);
    }

    let mut totals = vec!["Total".to_string()];
    for owner in &tab.col_keys {
        totals.push(tab.col_total(owner).to_string());
        totals.push(String::new());
    }
    totals.push(tab.grand_total().to_string());
    sheet.push(totals);
    sheet
}

pub fn historical_trends(
    tasks: &[Task],
    calendar: &WeekCalendar,
    samples: &SampleSchedule,
    config: &AnalyticsConfig,
) -> Sheet {
    let trend = trend::build_trend(tasks, TaskField::Reason, calendar, config.limits.trend_series);
    let mut headers = vec!["Week".to_string(), "Audits".to_string()];
    headers.extend(trend.top_keys.iter().map(|key| key.name.clone()));
    headers.extend(["Compliance %", "NPS"].map(String::from));
    let mut sheet = Sheet::new("Historical Trends", headers);

    let weeks = trend::group_by_week(tasks, calendar);
    for point in &trend.series {
        let members: Vec<Task> = weeks
            .get(&point.week)
            .map(|members| members.iter().map(|task| (*task).clone()).collect())
            .unwrap_or_default();
        let rule = samples.rule_for(&members, calendar);
        let kpis = kpi::summarize_with_samples(&members, rule);

        let mut row = vec![point.week.to_string(), point.total.to_string()];
        row.extend(
            trend
                .top_keys
                .iter()
                .map(|key| point.counts.get(&key.name).copied().unwrap_or(0).to_string()),
        );
        row.push(fmt_rate(kpis.compliance_rate));
        row.push(fmt_rate(kpis.nps));
        sheet.push(row);
    }
    sheet
}

pub fn deep_raw_data(tasks: &[Task]) -> Sheet {
    let mut headers = vec!["id".to_string()];
    headers.extend(TaskField::ALL.iter().map(|field| field.name().to_string()));
    headers.extend(
        [
            "evaluationScore",
            "createdAt",
            "interviewDate",
            "customerName",
            "contactNumber",
            "customerFeedback",
            "slid",
            "requestNumber",
        ]
        .map(String::from),
    );
    let mut sheet = Sheet::new("Deep Raw Data", headers);

    for task in tasks {
        let mut row = vec![task.id.clone()];
        row.extend(
            TaskField::ALL
                .iter()
                .map(|field| task.raw_values(*field).join(" | ")),
        );
        row.push(task.evaluation_score.map(|s| s.to_string()).unwrap_or_default());
        for value in [
            &task.created_at,
            &task.interview_date,
            &task.customer_name,
            &task.contact_number,
            &task.customer_feedback,
            &task.slid,
            &task.request_number,
        ] {
            row.push(value.clone().unwrap_or_default());
        }
        sheet.push(row);
    }
    sheet
}

pub fn ticket_history(tasks: &[Task]) -> Sheet {
    let mut sheet = Sheet::new(
        "Ticket History",
        [
            "id",
            "requestNumber",
            "slid",
            "created",
            "interviewed",
            "status",
            "validationStatus",
        ],
    );

    let mut ordered: Vec<&Task> = tasks.iter().collect();
    // Undated tickets sort after dated ones.
    ordered.sort_by_key(|task| (task.created_day().is_none(), task.created_day()));

    let day = |value: Option<chrono::NaiveDate>| {
        value.map_or_else(|| "-".to_string(), |d| d.to_string())
    };
    for task in ordered {
        sheet.push([
            task.id.clone(),
            task.request_number.clone().unwrap_or_default(),
            task.slid.clone().unwrap_or_default(),
            day(task.created_day()),
            day(task.interview_day()),
            task.bucket_values(TaskField::Status).join(" | "),
            task.bucket_values(TaskField::ValidationStatus).join(" | "),
        ]);
    }
    sheet
}

/// All workbook sheets in their fixed order.
pub fn build_workbook(
    tasks: &[Task],
    calendar: &WeekCalendar,
    config: &AnalyticsConfig,
) -> Vec<Sheet> {
    let samples = config.sample_schedule();
    vec![
        executive_summary(tasks, calendar, &samples, config),
        reason_analytics(tasks),
        owner_performance(tasks, config),
        historical_trends(tasks, calendar, &samples, config),
        deep_raw_data(tasks),
        ticket_history(tasks),
    ]
}

pub fn export_workbook(sheets: &[Sheet], sink: &mut dyn SheetSink) -> anyhow::Result<()> {
    for sheet in sheets {
        sink.write_sheet(sheet)
            .with_context(|| format!("failed to export sheet {}", sheet.name))?;
    }
    Ok(())
}
