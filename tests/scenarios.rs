//! End-to-end scenarios over a JSON task dump: filter, then derive every view.

use audit_task_analytics::calendar::WeekCalendar;
use audit_task_analytics::drilldown::DrillDown;
use audit_task_analytics::filter::{filter_tasks, FilterSet};
use audit_task_analytics::kpi::{self, UnauditedSampleRule};
use audit_task_analytics::models::{Task, TaskField};
use audit_task_analytics::{frequency, matrix, trend};
use chrono::NaiveDate;

const DUMP: &str = r#"[
  {"id": "1", "priority": "High", "status": "Todo", "reason": ["R1", "R2"],
   "responsible": ["O1", "O2"], "evaluationScore": 9, "interviewDate": "2026-03-02",
   "validationStatus": "Validated", "governorate": "Cairo"},
  {"id": "2", "priority": "Low", "status": "Closed", "reason": ["R1", "R2"],
   "responsible": "O1", "evaluationScore": 6, "interviewDate": "2026-03-10"},
  {"id": "3", "status": "Todo", "reason": "R1", "responsible": "O2",
   "evaluationScore": null, "interviewDate": "bad-date"}
]"#;

fn tasks() -> Vec<Task> {
    serde_json::from_str(DUMP).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 12).unwrap()
}

#[test]
fn basic_priority_filter_keeps_first_record() {
    let filters = FilterSet::default().with_discrete(TaskField::Priority, "High");
    let kept = filter_tasks(&tasks(), &filters, &WeekCalendar::default(), today());
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].id, "1");
}

#[test]
fn pairing_and_cross_product_combine_in_one_matrix() {
    let all = tasks();
    let two = &all[..2];
    let tab = matrix::build_matrix(two, TaskField::Reason, TaskField::Responsible, 10, 8);
    assert_eq!(tab.cell("R1", "O1"), 2);
    assert_eq!(tab.cell("R2", "O2"), 1);
    assert_eq!(tab.cell("R2", "O1"), 1);
    assert_eq!(tab.cell("R1", "O2"), 0);
}

#[test]
fn derived_views_agree_on_the_filtered_collection() {
    let calendar = WeekCalendar::default();
    let filtered = filter_tasks(
        &tasks(),
        &FilterSet::default().with_discrete(TaskField::Status, "Todo"),
        &calendar,
        today(),
    );
    assert_eq!(filtered.len(), 2);

    let top = frequency::top_k(&filtered, TaskField::Reason, 5);
    assert_eq!(top[0].name, "R1");
    assert_eq!(top[0].percentage, 100);

    let weekly = trend::build_trend(&filtered, TaskField::Reason, &calendar, 5);
    assert_eq!(weekly.series.len(), 1, "record 3 has an unreadable date");

    let kpis = kpi::summarize(&filtered);
    assert_eq!(kpis.promoters, 1);
    assert_eq!(kpis.compliance_rate, 50.0);

    let drilled = DrillDown::new("R1 owned by O2")
        .with(TaskField::Reason, "R1")
        .with(TaskField::Responsible, "O2")
        .resolve(&filtered);
    let ids: Vec<_> = drilled.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, ["1", "3"]);
}

#[test]
fn nps_sample_adjustment_matches_business_example() {
    let mut audits: Vec<Task> = Vec::new();
    for score in std::iter::repeat(10.0)
        .take(40)
        .chain(std::iter::repeat(7.0).take(30))
        .chain(std::iter::repeat(2.0).take(10))
    {
        audits.push(Task {
            evaluation_score: Some(score),
            ..Task::default()
        });
    }
    let kpis = kpi::summarize_with_samples(
        &audits,
        Some(UnauditedSampleRule {
            total_expected_samples: 100,
        }),
    );
    assert_eq!(kpis.total, 80);
    assert_eq!(kpis.promoter_rate, 60.0);
    assert_eq!(kpis.detractor_rate, 10.0);
    assert_eq!(kpis.nps, 50.0);
}
