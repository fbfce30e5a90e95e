use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ValidationError;

/// Upper bound (inclusive) of the Small size category, in estimated hours.
pub const SMALL_MAX_HOURS: f64 = 10.0;
/// Upper bound (inclusive) of the Medium size category, in estimated hours.
pub const MEDIUM_MAX_HOURS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ProjectStatus {
    #[default]
    Planned,
    Active,
    Completed,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] = [
        ProjectStatus::Planned,
        ProjectStatus::Active,
        ProjectStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Planned => "Planned",
            ProjectStatus::Active => "Active",
            ProjectStatus::Completed => "Completed",
        }
    }

    /// Next status in declaration order, wrapping around.
    pub fn cycle(self) -> Self {
        match self {
            ProjectStatus::Planned => ProjectStatus::Active,
            ProjectStatus::Active => ProjectStatus::Completed,
            ProjectStatus::Completed => ProjectStatus::Planned,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ProjectStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

/// Coarse bucket of a project by estimated hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
}

impl SizeCategory {
    pub const ALL: [SizeCategory; 3] = [SizeCategory::Small, SizeCategory::Medium, SizeCategory::Large];

    pub fn for_estimate(estimated_hours: f64) -> Self {
        if estimated_hours <= SMALL_MAX_HOURS {
            SizeCategory::Small
        } else if estimated_hours <= MEDIUM_MAX_HOURS {
            SizeCategory::Medium
        } else {
            SizeCategory::Large
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SizeCategory::Small => "Small",
            SizeCategory::Medium => "Medium",
            SizeCategory::Large => "Large",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SizeCategory::Small => "Small (0-10h)",
            SizeCategory::Medium => "Medium (10-50h)",
            SizeCategory::Large => "Large (50h+)",
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stored project row. Derived metrics are computed on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
}

impl Project {
    pub fn deviation_hours(&self) -> f64 {
        self.actual_hours - self.estimated_hours
    }

    /// Signed overrun in percent of the estimate; 0 without an estimate.
    pub fn percentage_deviation(&self) -> f64 {
        if self.estimated_hours <= 0.0 {
            return 0.0;
        }
        self.deviation_hours() / self.estimated_hours * 100.0
    }

    /// `100 - |deviation|`, floored at 0; 0 without an estimate.
    pub fn accuracy_score(&self) -> f64 {
        if self.estimated_hours <= 0.0 {
            return 0.0;
        }
        (100.0 - self.percentage_deviation().abs()).max(0.0)
    }

    pub fn has_estimate(&self) -> bool {
        self.estimated_hours > 0.0
    }

    pub fn is_completed(&self) -> bool {
        self.status == ProjectStatus::Completed
    }

    pub fn is_overestimated(&self) -> bool {
        self.actual_hours < self.estimated_hours && self.is_completed()
    }

    pub fn is_underestimated(&self) -> bool {
        self.actual_hours > self.estimated_hours
    }

    pub fn size_category(&self) -> SizeCategory {
        SizeCategory::for_estimate(self.estimated_hours)
    }
}

#[cfg(test)]
pub(crate) fn sample(estimated_hours: f64, actual_hours: f64, status: ProjectStatus) -> Project {
    Project {
        id: 1,
        name: "Sample".to_string(),
        description: String::new(),
        estimated_hours,
        actual_hours,
        start_date: NaiveDate::from_ymd_opt(2026, 10, 1).expect("valid date"),
        end_date: None,
        status,
    }
}
