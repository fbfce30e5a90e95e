use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::models::{Project, ProjectStatus};

/// Form values for a project that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
}

impl ProjectDraft {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            estimated_hours: 0.0,
            actual_hours: 0.0,
            start_date,
            end_date: None,
            status: ProjectStatus::Planned,
        }
    }

    pub fn from_project(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            description: project.description.clone(),
            estimated_hours: project.estimated_hours,
            actual_hours: project.actual_hours,
            start_date: project.start_date,
            end_date: project.end_date,
            status: project.status,
        }
    }

    /// Checks the rules the store itself does not enforce.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        check_hours("Estimated hours", self.estimated_hours)?;
        check_hours("Actual hours", self.actual_hours)?;
        Ok(())
    }

    /// Builds the stored record, keeping the identifier of the row it replaces.
    pub fn into_project(self, id: i64) -> Project {
        Project {
            id,
            name: self.name,
            description: self.description,
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
        }
    }
}

/// Hours must be finite and non-negative.
fn check_hours(field: &'static str, hours: f64) -> Result<(), ValidationError> {
    if !hours.is_finite() {
        return Err(ValidationError::InvalidHours(hours.to_string()));
    }
    if hours < 0.0 {
        return Err(ValidationError::NegativeHours { field });
    }
    Ok(())
}

/// Status auto-transition applied before a new project is saved.
///
/// Logged hours move a Planned project to Active; an end date marks it
/// Completed.
pub fn normalize(mut draft: ProjectDraft) -> ProjectDraft {
    if draft.actual_hours > 0.0 && draft.status == ProjectStatus::Planned {
        draft.status = ProjectStatus::Active;
    }
    if draft.end_date.is_some() && draft.status != ProjectStatus::Completed {
        draft.status = ProjectStatus::Completed;
    }
    draft
}

pub fn parse_hours(input: &str) -> Result<f64, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    // "inf", "NaN" and overflowing digit strings parse, but are not hours.
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|hours| hours.is_finite())
        .ok_or_else(|| ValidationError::InvalidHours(input.to_string()))
}

pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(input.to_string()))
}
