use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics;

/// Boxed cause kept behind a user-facing error.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to the user.
///
/// The display text is deliberately coarse; the underlying cause travels as
/// the error source and is only written to the diagnostics log.
#[derive(Debug, Error)]
pub enum Error {
    #[error("The project database could not be opened.")]
    StorageInit(#[source] Cause),

    #[error("Projects could not be loaded.")]
    StorageRead(#[source] Cause),

    #[error("The project could not be {action}.")]
    StorageWrite {
        action: &'static str,
        #[source]
        source: Cause,
    },

    #[error("The report could not be written to {}.", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: Cause,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Input rejected at the form boundary, before anything reaches the store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Project name cannot be empty.")]
    EmptyName,

    #[error("{field} cannot be negative.")]
    NegativeHours { field: &'static str },

    #[error("Unknown status '{0}'. Use Planned, Active or Completed.")]
    UnknownStatus(String),

    #[error("'{0}' is not a valid number of hours.")]
    InvalidHours(String),

    #[error("'{0}' is not a date in YYYY-MM-DD form.")]
    InvalidDate(String),
}

impl Error {
    pub fn storage_write(action: &'static str, source: impl Into<Cause>) -> Self {
        Error::StorageWrite {
            action,
            source: source.into(),
        }
    }

    pub fn report_write(path: impl Into<PathBuf>, source: impl Into<Cause>) -> Self {
        Error::ReportWrite {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Records a failure in the diagnostics log before handing it back.
pub trait LogFailure<T> {
    fn log_failure(self, context: &str) -> Result<T>;
}

impl<T> LogFailure<T> for Result<T> {
    fn log_failure(self, context: &str) -> Result<T> {
        if let Err(err) = &self {
            if !matches!(err, Error::Validation(_)) {
                diagnostics::record_failure(context, err);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn storage_errors_hide_the_cause_from_the_message() {
        let err = Error::storage_write("saved", "disk I/O error");

        assert_eq!(err.to_string(), "The project could not be saved.");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("disk I/O error"));
    }

    #[test]
    fn validation_errors_are_shown_verbatim() {
        let err = Error::from(ValidationError::NegativeHours { field: "Estimated hours" });

        assert_eq!(err.to_string(), "Estimated hours cannot be negative.");
    }
}
