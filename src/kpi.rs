use std::collections::{BTreeMap, BTreeSet};

use crate::calendar::{WeekCalendar, WeekLabel};
use crate::models::{KpiSummary, Task};

pub const VALIDATED: &str = "Validated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Promoter,
    Neutral,
    Detractor,
}

/// Unscored records have no segment.
pub fn segment(score: Option<f64>) -> Option<Segment> {
    let score = score.filter(|score| score.is_finite())?;
    Some(if score >= 9.0 {
        Segment::Promoter
    } else if score >= 7.0 {
        Segment::Neutral
    } else {
        Segment::Detractor
    })
}

/// Business rule: when fewer audits were performed than samples were
/// expected, the missing audits count as promoters and the expected sample
/// count becomes the denominator for the segment rates.
///
/// This couples "samples" to "audits". Revisit if the two ever diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnauditedSampleRule {
    pub total_expected_samples: usize,
}

impl UnauditedSampleRule {
    pub fn unaudited(&self, actual_audits: usize) -> usize {
        self.total_expected_samples.saturating_sub(actual_audits)
    }

    pub fn applies(&self, actual_audits: usize) -> bool {
        self.total_expected_samples > actual_audits
    }
}

/// Externally supplied expected sample counts, keyed by week label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSchedule {
    weeks: BTreeMap<WeekLabel, usize>,
}

impl SampleSchedule {
    pub fn new(weeks: impl IntoIterator<Item = (WeekLabel, usize)>) -> Self {
        let mut schedule = Self::default();
        for (week, count) in weeks {
            *schedule.weeks.entry(week).or_insert(0) += count;
        }
        schedule
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn expected_for(&self, week: WeekLabel) -> usize {
        self.weeks.get(&week).copied().unwrap_or(0)
    }

    /// Rule for the weeks these tasks were interviewed in, if any samples are
    /// known for them.
    pub fn rule_for(&self, tasks: &[Task], calendar: &WeekCalendar) -> Option<UnauditedSampleRule> {
        if self.is_empty() {
            return None;
        }
        let weeks: BTreeSet<WeekLabel> = tasks
            .iter()
            .filter_map(Task::interview_day)
            .map(|day| calendar.week_label(day))
            .collect();
        let total: usize = weeks.iter().map(|week| self.expected_for(*week)).sum();
        (total > 0).then_some(UnauditedSampleRule {
            total_expected_samples: total,
        })
    }
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

pub fn summarize(tasks: &[Task]) -> KpiSummary {
    summarize_with_samples(tasks, None)
}

pub fn summarize_with_samples(tasks: &[Task], samples: Option<UnauditedSampleRule>) -> KpiSummary {
    let total = tasks.len();
    let validated = tasks
        .iter()
        .filter(|task| task.validation_status.as_deref() == Some(VALIDATED))
        .count();

    let scores: Vec<f64> = tasks
        .iter()
        .filter_map(|task| task.evaluation_score)
        .filter(|score| score.is_finite())
        .collect();
    let segments: Vec<Segment> = scores.iter().filter_map(|s| segment(Some(*s))).collect();
    let count_of = |wanted: Segment| segments.iter().filter(|s| **s == wanted).count();
    let promoters = count_of(Segment::Promoter);
    let neutrals = count_of(Segment::Neutral);
    let detractors = count_of(Segment::Detractor);

    let (promoter_rate, denominator) = match samples.filter(|rule| rule.applies(total)) {
        Some(rule) => (
            rate(promoters + rule.unaudited(total), rule.total_expected_samples).round(),
            rule.total_expected_samples,
        ),
        None => (rate(promoters, total).round(), total),
    };
    let neutral_rate = rate(neutrals, denominator).round();
    let detractor_rate = rate(detractors, denominator).round();

    let avg_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    KpiSummary {
        total,
        validated,
        scored: scores.len(),
        promoters,
        neutrals,
        detractors,
        compliance_rate: rate(validated, total),
        promoter_rate,
        neutral_rate,
        detractor_rate,
        avg_score,
        nps: promoter_rate - detractor_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(score: Option<f64>) -> Task {
        Task {
            evaluation_score: score,
            ..Task::default()
        }
    }

    fn population(promoters: usize, neutrals: usize, detractors: usize) -> Vec<Task> {
        std::iter::repeat_with(|| scored(Some(10.0)))
            .take(promoters)
            .chain(std::iter::repeat_with(|| scored(Some(8.0))).take(neutrals))
            .chain(std::iter::repeat_with(|| scored(Some(3.0))).take(detractors))
            .collect()
    }

    #[test]
    fn segments_follow_score_thresholds() {
        assert_eq!(segment(Some(9.0)), Some(Segment::Promoter));
        assert_eq!(segment(Some(8.5)), Some(Segment::Neutral));
        assert_eq!(segment(Some(7.0)), Some(Segment::Neutral));
        assert_eq!(segment(Some(6.0)), Some(Segment::Detractor));
        assert_eq!(segment(Some(0.0)), Some(Segment::Detractor));
        assert_eq!(segment(None), None);
    }

    #[test]
    fn unscored_records_join_no_segment() {
        let mut tasks = population(1, 0, 1);
        tasks.push(scored(None));
        tasks.push(scored(None));
        let kpis = summarize(&tasks);
        assert_eq!(kpis.total, 4);
        assert_eq!(kpis.scored, 2);
        assert_eq!(kpis.detractors, 1);
        assert_eq!(kpis.promoter_rate, 25.0);
        assert_eq!(kpis.detractor_rate, 25.0);
        assert_eq!(kpis.avg_score, 6.5);
    }

    #[test]
    fn unaudited_samples_fold_into_promoters() {
        let tasks = population(40, 30, 10);
        let rule = UnauditedSampleRule {
            total_expected_samples: 100,
        };
        let kpis = summarize_with_samples(&tasks, Some(rule));
        assert_eq!(kpis.promoter_rate, 60.0);
        assert_eq!(kpis.detractor_rate, 10.0);
        assert_eq!(kpis.nps, 50.0);
    }

    #[test]
    fn sample_rule_is_ignored_when_audits_cover_samples() {
        let tasks = population(2, 1, 1);
        let rule = UnauditedSampleRule {
            total_expected_samples: 3,
        };
        assert_eq!(summarize_with_samples(&tasks, Some(rule)), summarize(&tasks));
    }

    #[test]
    fn compliance_counts_validated_records() {
        let tasks = vec![
            Task {
                validation_status: Some("Validated".into()),
                ..Task::default()
            },
            Task {
                validation_status: Some("Pending".into()),
                ..Task::default()
            },
        ];
        assert_eq!(summarize(&tasks).compliance_rate, 50.0);
    }

    #[test]
    fn empty_input_yields_zeros() {
        let kpis = summarize(&[]);
        assert_eq!(kpis.total, 0);
        assert_eq!(kpis.compliance_rate, 0.0);
        assert_eq!(kpis.avg_score, 0.0);
        assert_eq!(kpis.nps, 0.0);
    }

    #[test]
    fn schedule_sums_samples_for_weeks_touched() {
        let calendar = WeekCalendar::default();
        let week = |s: &str| s.parse::<WeekLabel>().unwrap();
        let schedule = SampleSchedule::new([
            (week("2026-W10"), 30),
            (week("2026-W11"), 20),
            (week("2026-W12"), 99),
        ]);
        let tasks = vec![
            Task {
                interview_date: Some("2026-03-02".into()),
                ..Task::default()
            },
            Task {
                interview_date: Some("2026-03-09".into()),
                ..Task::default()
            },
        ];
        assert_eq!(
            schedule.rule_for(&tasks, &calendar),
            Some(UnauditedSampleRule {
                total_expected_samples: 50
            })
        );
        assert_eq!(SampleSchedule::default().rule_for(&tasks, &calendar), None);
    }
}
