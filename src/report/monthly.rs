use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::analysis::{average_accuracy, average_deviation, bias_by_size};
use crate::models::{Project, ProjectStatus};

const WIDTH: usize = 59;

pub fn monthly_file_name(now: NaiveDateTime) -> String {
    format!("TimelineIQ_Monthly_{}.txt", now.format("%Y_%m"))
}

/// Projects started in the calendar month containing `today`, oldest first.
pub fn projects_in_month(projects: &[Project], today: NaiveDate) -> Vec<Project> {
    let mut in_month: Vec<Project> = projects
        .iter()
        .filter(|p| p.start_date.year() == today.year() && p.start_date.month() == today.month())
        .cloned()
        .collect();
    in_month.sort_by_key(|p| p.start_date);
    in_month
}

/// Render the monthly report with the number of projects it lists, or
/// `None` when no project started this month.
pub fn render_monthly(projects: &[Project], now: NaiveDateTime) -> Option<(String, usize)> {
    let month = projects_in_month(projects, now.date());
    if month.is_empty() {
        return None;
    }

    let banner = "═".repeat(WIDTH);
    let rule = "─".repeat(WIDTH);
    let count = |status| month.iter().filter(|p| p.status == status).count();

    let mut content = String::new();

    content.push_str(&format!("{banner}\n"));
    content.push_str(&format!("       TIMELINE IQ - MONTHLY REPORT ({})\n", now.format("%B %Y")));
    content.push_str(&format!("{banner}\n\n"));

    content.push_str(&format!("Report date: {}\n", now.format("%Y-%m-%d %H:%M")));
    content.push_str(&format!("Total projects: {}\n", month.len()));
    content.push_str(&format!("Completed: {}\n", count(ProjectStatus::Completed)));
    content.push_str(&format!("Active: {}\n", count(ProjectStatus::Active)));
    content.push_str(&format!("Planned: {}\n\n", count(ProjectStatus::Planned)));

    let measured: Vec<Project> = month
        .iter()
        .filter(|p| p.is_completed() && p.has_estimate())
        .cloned()
        .collect();
    if !measured.is_empty() {
        content.push_str(&format!("{rule}\n"));
        content.push_str("PERFORMANCE ANALYSIS\n\n");
        content.push_str(&format!("Average deviation: {:.1}%\n", average_deviation(&measured)));
        content.push_str(&format!("Accuracy score: {:.1}/100\n", average_accuracy(&measured)));
        content.push_str(&format!(
            "Underestimated: {} projects\n",
            measured.iter().filter(|p| p.is_underestimated()).count()
        ));
        content.push_str(&format!(
            "Overestimated: {} projects\n\n",
            measured.iter().filter(|p| p.is_overestimated()).count()
        ));
    }

    let bias = bias_by_size(&month);
    content.push_str(&format!("{rule}\n"));
    content.push_str("ESTIMATION BIAS ANALYSIS\n\n");
    for category in &bias.categories {
        content.push_str(&format!("{} projects: {}\n", category.category.label(), category.count));
        if category.count > 0 {
            content.push_str(&format!("  -> Average deviation: {:.1}%\n", category.mean_deviation));
        }
    }
    if bias.has_data() {
        let worst = bias.riskiest();
        content.push_str(&format!(
            "\nRiskiest category: {} ({:.1}% deviation)\n",
            worst.category.name(),
            worst.mean_deviation.abs()
        ));
    }
    content.push('\n');

    content.push_str(&format!("{rule}\n"));
    content.push_str("PROJECT LIST\n\n");
    for project in &month {
        content.push_str(&format!("• {}\n", project.name));
        content.push_str(&format!(
            "  Status: {} | Estimated: {}h | Actual: {}h\n",
            project.status, project.estimated_hours, project.actual_hours
        ));
        content.push_str(&format!(
            "  Deviation: {:.1}% | Date: {}\n\n",
            project.percentage_deviation(),
            project.start_date.format("%Y-%m-%d")
        ));
    }

    content.push_str(&format!("{banner}\n"));
    content.push_str(&format!("Report generated: {}\n", now.format("%Y-%m-%d %H:%M:%S")));
    content.push_str(&format!("{banner}\n"));

    Some((content, month.len()))
}
