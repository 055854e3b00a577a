use std::fmt::Write;

use chrono::NaiveDate;

use crate::calendar::WeekCalendar;
use crate::config::AnalyticsConfig;
use crate::frequency;
use crate::kpi;
use crate::models::{Task, TaskField};
use crate::trend;

pub fn build_report(
    scope: Option<&str>,
    today: NaiveDate,
    tasks: &[Task],
    calendar: &WeekCalendar,
    config: &AnalyticsConfig,
) -> String {
    let rule = config.sample_schedule().rule_for(tasks, calendar);
    let kpis = kpi::summarize_with_samples(tasks, rule);
    let reasons = frequency::top_k(tasks, TaskField::Reason, config.limits.summary_top_k);
    let owners = frequency::top_k(tasks, TaskField::Responsible, config.limits.summary_top_k);
    let trend = trend::build_trend(tasks, TaskField::Reason, calendar, config.limits.trend_series);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all audits");

    let _ = writeln!(output, "# Quality Audit Report");
    let _ = writeln!(output, "Generated for {} on {}", scope_label, today);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Headline");
    let _ = writeln!(output, "- Audits: {}", kpis.total);
    if let Some(rule) = rule {
        let _ = writeln!(output, "- Expected samples: {}", rule.total_expected_samples);
    }
    let _ = writeln!(output, "- Compliance: {:.1}%", kpis.compliance_rate);
    let _ = writeln!(
        output,
        "- NPS: {:.0} (promoters {:.0}%, neutrals {:.0}%, detractors {:.0}%)",
        kpis.nps, kpis.promoter_rate, kpis.neutral_rate, kpis.detractor_rate
    );
    let _ = writeln!(
        output,
        "- Average score: {:.2} across {} scored audits",
        kpis.avg_score, kpis.scored
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Reasons");
    if reasons.is_empty() {
        let _ = writeln!(output, "No audits recorded for this selection.");
    } else {
        for entry in &reasons {
            let _ = writeln!(output, "- {}: {} ({}%)", entry.name, entry.count, entry.percentage);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Owners");
    if owners.is_empty() {
        let _ = writeln!(output, "No audits recorded for this selection.");
    } else {
        for entry in &owners {
            let _ = writeln!(output, "- {}: {} ({}%)", entry.name, entry.count, entry.percentage);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Trend");
    if trend.series.is_empty() {
        let _ = writeln!(output, "No dated audits for this selection.");
    } else {
        let mut header = String::from("| Week | Audits |");
        let mut rule_line = String::from("| --- | --- |");
        for key in &trend.top_keys {
            let _ = write!(header, " {} |", key.name);
            rule_line.push_str(" --- |");
        }
        let _ = writeln!(output, "{header}");
        let _ = writeln!(output, "{rule_line}");
        for point in &trend.series {
            let mut line = format!("| {} | {} |", point.week, point.total);
            for key in &trend.top_keys {
                let _ = write!(line, " {} |", point.counts.get(&key.name).copied().unwrap_or(0));
            }
            let _ = writeln!(output, "{line}");
        }
    }

    let mut recent: Vec<&Task> = tasks
        .iter()
        .filter(|task| {
            task.customer_feedback
                .as_deref()
                .is_some_and(|feedback| !feedback.trim().is_empty())
        })
        .collect();
    recent.sort_by(|a, b| b.interview_day().cmp(&a.interview_day()));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Customer Feedback");

    if recent.is_empty() {
        let _ = writeln!(output, "No customer feedback recorded for this selection.");
    } else {
        for task in recent.iter().take(5) {
            let when = task
                .interview_day()
                .map_or_else(|| "-".to_string(), |day| day.to_string());
            let _ = writeln!(
                output,
                "- {} ({}) on {}: {}",
                task.customer_name.as_deref().unwrap_or("Unknown customer"),
                task.bucket_values(TaskField::Reason).join(", "),
                when,
                task.customer_feedback.as_deref().unwrap_or_default()
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MultiValue;

    #[test]
    fn report_covers_every_section() {
        let tasks = vec![
            Task {
                customer_name: Some("Mona".into()),
                customer_feedback: Some("Slow install".into()),
                reason: MultiValue::single("Installation"),
                interview_date: Some("2026-03-02".into()),
                evaluation_score: Some(5.0),
                ..Task::default()
            },
            Task {
                customer_feedback: Some("Great".into()),
                interview_date: Some("2026-03-10".into()),
                evaluation_score: Some(10.0),
                ..Task::default()
            },
        ];
        let today = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        let report = build_report(
            Some("Cairo"),
            today,
            &tasks,
            &WeekCalendar::default(),
            &AnalyticsConfig::default(),
        );

        assert!(report.contains("Generated for Cairo on 2026-03-12"));
        assert!(report.contains("- NPS: 0 (promoters 50%, neutrals 0%, detractors 50%)"));
        assert!(report.contains("- Installation: 1 (50%)"));
        assert!(report.contains("| 2026-W10 | 1 |"));
        // Newest feedback first.
        let great = report.find("Unknown customer").unwrap();
        let slow = report.find("Mona").unwrap();
        assert!(great < slow);
    }

    #[test]
    fn empty_selection_renders_placeholders() {
        let report = build_report(
            None,
            NaiveDate::from_ymd_opt(2026, 3, 12).unwrap(),
            &[],
            &WeekCalendar::default(),
            &AnalyticsConfig::default(),
        );
        assert!(report.contains("Generated for all audits"));
        assert!(report.contains("No dated audits for this selection."));
        assert!(report.contains("No customer feedback recorded"));
    }
}
