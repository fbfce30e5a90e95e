mod draft;
mod project;

pub use draft::{normalize, parse_date, parse_hours, ProjectDraft};
pub use project::{Project, ProjectStatus, SizeCategory};

#[cfg(test)]
pub(crate) use project::sample;
