use std::io::Write;

use crate::models::Project;

pub const CSV_FILE_NAME: &str = "TimelineIQ_Report.csv";

const HEADER: [&str; 8] = ["Id", "Name", "Description", "Estimated", "Actual", "Deviation", "Status", "Date"];

/// Write one comma-separated row per project under a fixed header.
///
/// Fields containing commas, quotes or line breaks are quoted.
/// Returns the number of projects written.
pub fn write_csv<W: Write>(projects: &[Project], writer: W) -> Result<usize, csv::Error> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

    wtr.write_record(HEADER)?;

    for project in projects {
        wtr.write_record([
            project.id.to_string(),
            project.name.clone(),
            project.description.clone(),
            project.estimated_hours.to_string(),
            project.actual_hours.to_string(),
            format!("{:.2}%", project.percentage_deviation()),
            project.status.to_string(),
            project.start_date.format("%Y-%m-%d").to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(projects.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample, ProjectStatus};
    use pretty_assertions::assert_eq;

    #[test]
    fn rows_follow_the_fixed_header() {
        let mut project = sample(8.0, 10.0, ProjectStatus::Completed);
        project.id = 7;
        project.name = "Login page".to_string();
        project.description = "OAuth".to_string();

        let mut out = Vec::new();
        let written = write_csv(&[project], &mut out).expect("csv");

        assert_eq!(written, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Id,Name,Description,Estimated,Actual,Deviation,Status,Date\n\
             7,Login page,OAuth,8,10,25.00%,Completed,2026-10-01\n"
        );
    }

    #[test]
    fn delimiters_in_free_text_are_quoted() {
        let mut project = sample(4.0, 3.0, ProjectStatus::Active);
        project.name = "Search, filters".to_string();
        project.description = "Say \"hi\"".to_string();

        let mut out = Vec::new();
        write_csv(&[project], &mut out).expect("csv");

        let text = String::from_utf8(out).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(row, "1,\"Search, filters\",\"Say \"\"hi\"\"\",4,3,-25.00%,Active,2026-10-01");
    }

    #[test]
    fn empty_collection_still_has_a_header() {
        let mut out = Vec::new();

        assert_eq!(write_csv(&[], &mut out).expect("csv"), 0);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }
}
