//! Aggregate statistics over a set of projects.
//!
//! Everything here is a pure function of the slice it is given; callers
//! recompute after each change instead of keeping running totals.

use serde::Serialize;

use crate::models::{Project, ProjectStatus, SizeCategory};

/// Number of completed projects shown in the estimate vs actual comparison.
pub const RECENT_COMPLETED_LIMIT: usize = 5;

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Mean percentage deviation over projects with an estimate.
pub fn average_deviation(projects: &[Project]) -> f64 {
    mean(
        projects
            .iter()
            .filter(|p| p.has_estimate())
            .map(Project::percentage_deviation),
    )
}

/// Mean accuracy score over completed projects with an estimate.
pub fn average_accuracy(projects: &[Project]) -> f64 {
    mean(
        projects
            .iter()
            .filter(|p| p.is_completed() && p.has_estimate())
            .map(Project::accuracy_score),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryBias {
    pub category: SizeCategory,
    pub count: usize,
    pub mean_deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiasBreakdown {
    /// Small, Medium and Large, in that order.
    pub categories: [CategoryBias; 3],
    pub riskiest: SizeCategory,
}

impl BiasBreakdown {
    pub fn get(&self, category: SizeCategory) -> &CategoryBias {
        &self.categories[category as usize]
    }

    pub fn riskiest(&self) -> &CategoryBias {
        self.get(self.riskiest)
    }

    pub fn has_data(&self) -> bool {
        self.categories.iter().any(|c| c.count > 0)
    }

    /// One-line reading of the breakdown for the dashboard.
    pub fn advice(&self) -> String {
        if !self.has_data() {
            return "Add more projects with estimates to see a trend.".to_string();
        }
        let worst = self.riskiest();
        if worst.mean_deviation == 0.0 {
            return "Estimates match actual hours across all sizes.".to_string();
        }
        let direction = if worst.mean_deviation > 0.0 { "overrun" } else { "overestimate" };
        format!(
            "{} projects drift the most ({:.1}% average {}).",
            worst.category.name(),
            worst.mean_deviation,
            direction
        )
    }
}

/// Mean deviation per size category, considering projects with an estimate.
///
/// The riskiest category has the largest absolute mean; on a tie the first
/// of Small, Medium, Large wins.
pub fn bias_by_size(projects: &[Project]) -> BiasBreakdown {
    let categories = SizeCategory::ALL.map(|category| {
        let members: Vec<&Project> = projects
            .iter()
            .filter(|p| p.has_estimate() && p.size_category() == category)
            .collect();

        CategoryBias {
            category,
            count: members.len(),
            mean_deviation: mean(members.iter().map(|p| p.percentage_deviation())),
        }
    });

    let mut riskiest = categories[0];
    for candidate in &categories[1..] {
        if candidate.mean_deviation.abs() > riskiest.mean_deviation.abs() {
            riskiest = *candidate;
        }
    }

    BiasBreakdown {
        categories,
        riskiest: riskiest.category,
    }
}

/// Outcome of the linear suggestion heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Prediction {
    /// No positive estimate was entered yet.
    NeedsInput,
    Suggested { hours: f64, average_deviation: f64 },
}

/// Scale a fresh estimate by the historical average deviation.
pub fn predict_suggested_hours(new_estimate: f64, average_deviation: f64) -> Prediction {
    if !(new_estimate > 0.0) {
        return Prediction::NeedsInput;
    }
    Prediction::Suggested {
        hours: new_estimate * (1.0 + average_deviation / 100.0),
        average_deviation,
    }
}

/// Keep the projects with `status`, or all of them for `None`.
pub fn filter_by_status(projects: &[Project], status: Option<ProjectStatus>) -> Vec<&Project> {
    projects
        .iter()
        .filter(|p| status.is_none_or(|s| p.status == s))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateComparison {
    pub name: String,
    pub estimated_hours: f64,
    pub actual_hours: f64,
}

impl EstimateComparison {
    pub fn is_overestimated(&self) -> bool {
        self.actual_hours < self.estimated_hours
    }
}

/// Most recently started completed projects, newest first.
pub fn recent_completed(projects: &[Project], limit: usize) -> Vec<EstimateComparison> {
    let mut completed: Vec<&Project> = projects.iter().filter(|p| p.is_completed()).collect();
    completed.sort_by(|a, b| b.start_date.cmp(&a.start_date));

    completed
        .into_iter()
        .take(limit)
        .map(|p| EstimateComparison {
            name: p.name.clone(),
            estimated_hours: p.estimated_hours,
            actual_hours: p.actual_hours,
        })
        .collect()
}

/// Everything the dashboard and `stats` show, computed in one pass per field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub planned: usize,
    pub active: usize,
    pub completed: usize,
    pub average_deviation: f64,
    pub average_accuracy: f64,
    pub overestimated: usize,
    pub underestimated: usize,
    pub bias: BiasBreakdown,
    pub recent_completed: Vec<EstimateComparison>,
}

impl Statistics {
    pub fn compute(projects: &[Project]) -> Self {
        let count_status = |status| projects.iter().filter(|p| p.status == status).count();

        Self {
            total: projects.len(),
            planned: count_status(ProjectStatus::Planned),
            active: count_status(ProjectStatus::Active),
            completed: count_status(ProjectStatus::Completed),
            average_deviation: average_deviation(projects),
            average_accuracy: average_accuracy(projects),
            overestimated: projects.iter().filter(|p| p.is_overestimated()).count(),
            underestimated: projects.iter().filter(|p| p.is_underestimated()).count(),
            bias: bias_by_size(projects),
            recent_completed: recent_completed(projects, RECENT_COMPLETED_LIMIT),
        }
    }

    pub fn predict(&self, new_estimate: f64) -> Prediction {
        predict_suggested_hours(new_estimate, self.average_deviation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample;
    use chrono::NaiveDate;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn symmetric_deviations_cancel_out() {
        let projects = vec![
            sample(5.0, 6.0, ProjectStatus::Completed),
            sample(5.0, 4.0, ProjectStatus::Completed),
        ];

        assert!(close(average_deviation(&projects), 0.0));
        assert!(close(average_accuracy(&projects), 80.0));
    }

    #[test]
    fn zero_estimate_is_left_out_of_both_averages() {
        let projects = vec![sample(0.0, 7.0, ProjectStatus::Completed)];

        assert_eq!(average_deviation(&projects), 0.0);
        assert_eq!(average_accuracy(&projects), 0.0);
        assert_eq!(average_deviation(&[]), 0.0);
    }

    #[test]
    fn accuracy_only_counts_completed_projects() {
        let projects = vec![
            sample(10.0, 10.0, ProjectStatus::Completed),
            sample(10.0, 30.0, ProjectStatus::Active),
        ];

        assert!(close(average_accuracy(&projects), 100.0));
        assert!(close(average_deviation(&projects), 100.0));
    }

    #[test]
    fn empty_categories_have_zero_bias() {
        let bias = bias_by_size(&[sample(20.0, 30.0, ProjectStatus::Completed)]);

        assert_eq!(bias.get(SizeCategory::Small).count, 0);
        assert_eq!(bias.get(SizeCategory::Small).mean_deviation, 0.0);
        assert!(close(bias.get(SizeCategory::Medium).mean_deviation, 50.0));
        assert_eq!(bias.get(SizeCategory::Large).mean_deviation, 0.0);
        assert_eq!(bias.riskiest, SizeCategory::Medium);
    }

    #[test]
    fn riskiest_tie_goes_to_the_smaller_category() {
        let projects = vec![
            sample(10.0, 12.0, ProjectStatus::Completed),
            sample(50.0, 60.0, ProjectStatus::Completed),
            sample(100.0, 100.0, ProjectStatus::Completed),
        ];

        let bias = bias_by_size(&projects);
        assert!(close(bias.get(SizeCategory::Small).mean_deviation, 20.0));
        assert!(close(bias.get(SizeCategory::Medium).mean_deviation, 20.0));
        assert_eq!(bias.riskiest, SizeCategory::Small);
    }

    #[test]
    fn negative_bias_can_be_riskiest() {
        let projects = vec![
            sample(8.0, 9.0, ProjectStatus::Completed),
            sample(80.0, 20.0, ProjectStatus::Completed),
        ];

        let bias = bias_by_size(&projects);
        assert_eq!(bias.riskiest, SizeCategory::Large);
        assert!(bias.advice().starts_with("Large projects drift the most (-75.0%"));
    }

    #[test]
    fn zero_estimates_stay_out_of_the_small_bucket() {
        let bias = bias_by_size(&[sample(0.0, 4.0, ProjectStatus::Active)]);

        assert_eq!(bias.get(SizeCategory::Small).count, 0);
        assert!(!bias.has_data());
        assert_eq!(bias.advice(), "Add more projects with estimates to see a trend.");
    }

    #[test]
    fn prediction_scales_by_average_deviation() {
        assert_eq!(predict_suggested_hours(0.0, 25.0), Prediction::NeedsInput);
        assert_eq!(predict_suggested_hours(-3.0, 25.0), Prediction::NeedsInput);

        match predict_suggested_hours(40.0, 25.0) {
            Prediction::Suggested { hours, average_deviation } => {
                assert!(close(hours, 50.0));
                assert!(close(average_deviation, 25.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_filter() {
        let projects = vec![
            sample(1.0, 1.0, ProjectStatus::Planned),
            sample(1.0, 1.0, ProjectStatus::Completed),
            sample(1.0, 1.0, ProjectStatus::Completed),
        ];

        assert_eq!(filter_by_status(&projects, None).len(), 3);
        assert_eq!(filter_by_status(&projects, Some(ProjectStatus::Completed)).len(), 2);
        assert!(filter_by_status(&projects, Some(ProjectStatus::Active)).is_empty());
    }

    #[test]
    fn recent_completed_takes_newest_first() {
        let projects: Vec<Project> = (1..=7)
            .map(|day| {
                let mut p = sample(10.0, day as f64, ProjectStatus::Completed);
                p.name = format!("P{day}");
                p.start_date = NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
                p
            })
            .chain(std::iter::once(sample(3.0, 3.0, ProjectStatus::Active)))
            .collect();

        let names: Vec<String> = recent_completed(&projects, 5).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["P7", "P6", "P5", "P4", "P3"]);
    }

    #[test]
    fn statistics_counts() {
        let projects = vec![
            sample(5.0, 6.0, ProjectStatus::Completed),
            sample(5.0, 4.0, ProjectStatus::Completed),
            sample(20.0, 25.0, ProjectStatus::Active),
            sample(8.0, 0.0, ProjectStatus::Planned),
        ];

        let stats = Statistics::compute(&projects);
        assert_eq!((stats.total, stats.planned, stats.active, stats.completed), (4, 1, 1, 2));
        assert_eq!(stats.overestimated, 1);
        assert_eq!(stats.underestimated, 2);
        assert_eq!(stats.recent_completed.len(), 2);
        assert!(matches!(stats.predict(10.0), Prediction::Suggested { .. }));
    }
}
