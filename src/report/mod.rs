mod csv_export;
mod monthly;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{Error, LogFailure, Result};
use crate::models::Project;

use csv_export::{write_csv, CSV_FILE_NAME};
use monthly::{monthly_file_name, render_monthly};

/// Result of a monthly export request.
#[derive(Debug, PartialEq)]
pub enum MonthlyOutcome {
    Written { path: PathBuf, projects: usize },
    /// Nothing started this month; no file was created.
    NoProjects,
}

/// Writes exports into a single user-facing folder
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn ensure_output_dir(&self) -> Result<()> {
        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir)
                .map_err(|e| Error::report_write(&self.output_dir, e))?;
        }
        Ok(())
    }

    /// Export every project to `TimelineIQ_Report.csv`
    pub fn export_csv(&self, projects: &[Project]) -> Result<PathBuf> {
        let path = self.output_dir.join(CSV_FILE_NAME);

        let result = self.ensure_output_dir().and_then(|()| {
            let file = File::create(&path).map_err(|e| Error::report_write(&path, e))?;
            write_csv(projects, file).map_err(|e| Error::report_write(&path, e))
        });

        result.log_failure("ExportCsv")?;
        tracing::info!(path = %path.display(), projects = projects.len(), "CSV export written");
        Ok(path)
    }

    /// Write the report for the month containing `now`
    pub fn export_monthly(&self, projects: &[Project], now: NaiveDateTime) -> Result<MonthlyOutcome> {
        let Some((content, count)) = render_monthly(projects, now) else {
            return Ok(MonthlyOutcome::NoProjects);
        };
        let path = self.output_dir.join(monthly_file_name(now));

        let result = self.ensure_output_dir().and_then(|()| {
            let mut file = File::create(&path).map_err(|e| Error::report_write(&path, e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| Error::report_write(&path, e))
        });
        result.log_failure("ExportMonthlyReport")?;

        tracing::info!(path = %path.display(), projects = count, "monthly report written");
        Ok(MonthlyOutcome::Written { path, projects: count })
    }
}
