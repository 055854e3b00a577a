use std::path::PathBuf;

use anyhow::Context;
use audit_task_analytics::calendar::WeekCalendar;
use audit_task_analytics::config::{self, AnalyticsConfig};
use audit_task_analytics::drilldown::DrillDown;
use audit_task_analytics::error::AnalyticsError;
use audit_task_analytics::export::{self, CsvDirectorySink};
use audit_task_analytics::filter::{DateFilter, DateRangeKind, FilterSet, TaskFilter, TextColumn};
use audit_task_analytics::models::{SearchKey, Task, TaskField};
use audit_task_analytics::{frequency, ingest, kpi, matrix, report, trend};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "task-analytics")]
#[command(about = "Filter, rank and cross-tabulate quality audit tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Task records (.json array or .csv)
    #[arg(long)]
    tasks: PathBuf,
    /// Optional TOML config with week rules, limits and expected samples
    #[arg(long)]
    config: Option<PathBuf>,
    /// Reference date for week presets (defaults to today, UTC)
    #[arg(long)]
    today: Option<NaiveDate>,
    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Args)]
struct FilterArgs {
    /// Exact match on a categorical field, e.g. --eq priority=High
    #[arg(long = "eq", value_name = "FIELD=VALUE")]
    discrete: Vec<String>,
    /// Substring match on a text column (customer, contact, feedback, slid, location, team)
    #[arg(long = "text", value_name = "COLUMN=NEEDLE")]
    text: Vec<String>,
    /// Substring match against any element of a multi-valued field
    #[arg(long = "contains", value_name = "FIELD=NEEDLE")]
    contains: Vec<String>,
    /// all, custom, this-week, last-week or latest-3-weeks
    #[arg(long, default_value = "all")]
    range: String,
    /// Custom range start (implies --range custom)
    #[arg(long, conflicts_with = "range")]
    from: Option<NaiveDate>,
    /// Custom range end (implies --range custom)
    #[arg(long, conflicts_with = "range")]
    to: Option<NaiveDate>,
    /// Advanced search term; any term activates advanced search
    #[arg(long = "search", value_name = "FIELD=NEEDLE")]
    search: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Headline KPIs for the filtered tasks
    Summary {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        json: bool,
    },
    /// Top values of a categorical field
    Top {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value = "reason")]
        field: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Weekly counts for the top values of a field
    Trend {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value = "reason")]
        field: String,
        #[arg(long)]
        json: bool,
    },
    /// Cross-tabulate two fields (rows x owners)
    Matrix {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value = "reason")]
        rows: String,
        #[arg(long, default_value = "responsible")]
        cols: String,
        #[arg(long)]
        row_limit: Option<usize>,
        #[arg(long)]
        col_limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// List the tasks behind a row or cell
    Drill {
        #[command(flatten)]
        source: Source,
        #[arg(long = "where", value_name = "FIELD=VALUE", required = true)]
        constraints: Vec<String>,
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Label for the selection, shown in the report header
        #[arg(long)]
        scope: Option<String>,
    },
    /// Write the workbook sheets as CSV files
    Export {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value = "export")]
        out_dir: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TASK_ANALYTICS_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match std::env::var("TASK_ANALYTICS_LOG_FORMAT").as_deref() {
        Ok("json") => registry
            .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}

fn split_pair(raw: &str) -> Result<(&str, &str), AnalyticsError> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| AnalyticsError::MalformedPair(raw.to_string()))
}

impl FilterArgs {
    fn to_filter_set(&self) -> anyhow::Result<FilterSet> {
        let mut filters = FilterSet::default();
        for raw in &self.discrete {
            let (field, value) = split_pair(raw)?;
            filters = filters.with_discrete(field.parse::<TaskField>()?, value);
        }
        for raw in &self.text {
            let (column, needle) = split_pair(raw)?;
            filters = filters.with_text(column.parse::<TextColumn>()?, needle);
        }
        for raw in &self.contains {
            let (field, needle) = split_pair(raw)?;
            filters = filters.with_contains(field.parse::<TaskField>()?, needle);
        }
        for raw in &self.search {
            let (key, needle) = split_pair(raw)?;
            filters = filters.with_search(key.parse::<SearchKey>()?, needle);
        }

        let kind = if self.from.is_some() || self.to.is_some() {
            DateRangeKind::Custom
        } else {
            self.range.parse::<DateRangeKind>()?
        };
        filters.date = DateFilter {
            kind,
            start: self.from,
            end: self.to,
        };
        Ok(filters)
    }
}

struct Loaded {
    config: AnalyticsConfig,
    calendar: WeekCalendar,
    today: NaiveDate,
    tasks: Vec<Task>,
}

impl Source {
    fn load(&self) -> anyhow::Result<Loaded> {
        let config = config::load_config(self.config.as_deref())?;
        let calendar = config.calendar()?;
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        let filters = self.filters.to_filter_set()?;
        let all = ingest::load_tasks(&self.tasks)?;
        let tasks = TaskFilter::new(&filters, &calendar, today).apply(&all);
        tracing::info!(loaded = all.len(), kept = tasks.len(), "applied filters");
        Ok(Loaded {
            config,
            calendar,
            today,
            tasks,
        })
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { source, json } => {
            let loaded = source.load()?;
            let rule = loaded
                .config
                .sample_schedule()
                .rule_for(&loaded.tasks, &loaded.calendar);
            let kpis = kpi::summarize_with_samples(&loaded.tasks, rule);
            if json {
                return print_json(&kpis);
            }
            println!("Audits: {}", kpis.total);
            if let Some(rule) = rule {
                println!("Expected samples: {}", rule.total_expected_samples);
            }
            println!("Compliance: {:.1}%", kpis.compliance_rate);
            println!(
                "NPS: {:.0} (promoters {:.0}%, neutrals {:.0}%, detractors {:.0}%)",
                kpis.nps, kpis.promoter_rate, kpis.neutral_rate, kpis.detractor_rate
            );
            println!("Average score: {:.2} across {} scored", kpis.avg_score, kpis.scored);
        }
        Commands::Top {
            source,
            field,
            limit,
            json,
        } => {
            let loaded = source.load()?;
            let field: TaskField = field.parse()?;
            let limit = limit.unwrap_or(loaded.config.limits.full_top_k);
            let entries = frequency::top_k(&loaded.tasks, field, limit);
            if json {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No tasks match these filters.");
                return Ok(());
            }
            println!("Top {field} values:");
            for entry in &entries {
                println!("- {}: {} ({}%)", entry.name, entry.count, entry.percentage);
            }
        }
        Commands::Trend {
            source,
            field,
            json,
        } => {
            let loaded = source.load()?;
            let field: TaskField = field.parse()?;
            let result = trend::build_trend(
                &loaded.tasks,
                field,
                &loaded.calendar,
                loaded.config.limits.trend_series,
            );
            if json {
                return print_json(&result);
            }
            if result.series.is_empty() {
                println!("No dated tasks match these filters.");
                return Ok(());
            }
            for point in &result.series {
                let counts: Vec<String> = result
                    .top_keys
                    .iter()
                    .map(|key| {
                        format!(
                            "{}={}",
                            key.name,
                            point.counts.get(&key.name).copied().unwrap_or(0)
                        )
                    })
                    .collect();
                println!("{} ({} audits): {}", point.week, point.total, counts.join(", "));
            }
        }
        Commands::Matrix {
            source,
            rows,
            cols,
            row_limit,
            col_limit,
            json,
        } => {
            let loaded = source.load()?;
            let tab = matrix::build_matrix(
                &loaded.tasks,
                rows.parse()?,
                cols.parse()?,
                row_limit.unwrap_or(loaded.config.limits.matrix_rows),
                col_limit.unwrap_or(loaded.config.limits.matrix_cols),
            );
            if json {
                return print_json(&tab);
            }
            for row in &tab.row_keys {
                let cells: Vec<String> = tab
                    .col_keys
                    .iter()
                    .filter(|col| tab.cell(row, col) > 0)
                    .map(|col| {
                        format!(
                            "{col}={} ({:.0}% of load)",
                            tab.cell(row, col),
                            tab.load_percentage(row, col)
                        )
                    })
                    .collect();
                println!("{row} [{}]: {}", tab.row_total(row), cells.join(", "));
            }
        }
        Commands::Drill {
            source,
            constraints,
            title,
        } => {
            let loaded = source.load()?;
            let mut drill = DrillDown::new(title);
            for raw in &constraints {
                let (field, value) = split_pair(raw)?;
                drill = drill.with(field.parse::<TaskField>()?, value);
            }
            let found = drill.resolve(&loaded.tasks);
            println!("{} ({} tasks)", drill.display_title(), found.len());
            for task in &found {
                println!(
                    "- {} {} [{}] score {}",
                    task.id,
                    task.customer_name.as_deref().unwrap_or("-"),
                    task.interview_date.as_deref().unwrap_or("-"),
                    task.evaluation_score
                        .map_or_else(|| "-".to_string(), |score| score.to_string())
                );
            }
        }
        Commands::Report { source, out, scope } => {
            let loaded = source.load()?;
            let markdown = report::build_report(
                scope.as_deref(),
                loaded.today,
                &loaded.tasks,
                &loaded.calendar,
                &loaded.config,
            );
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { source, out_dir } => {
            let loaded = source.load()?;
            let sheets = export::build_workbook(&loaded.tasks, &loaded.calendar, &loaded.config);
            let mut sink = CsvDirectorySink::create(&out_dir)?;
            export::export_workbook(&sheets, &mut sink)?;
            println!("Wrote {} sheets to {}.", sink.written().len(), out_dir.display());
        }
    }

    Ok(())
}
