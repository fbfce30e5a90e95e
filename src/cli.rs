use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::analysis::{filter_by_status, Prediction, Statistics};
use crate::db::Database;
use crate::error::ValidationError;
use crate::models::{normalize, parse_date, parse_hours, Project, ProjectDraft, ProjectStatus, SizeCategory};
use crate::report::{MonthlyOutcome, ReportWriter};

#[derive(Debug, Parser)]
#[command(
    name = "timeline-iq",
    version,
    about = "Track estimated versus actual hours and learn from the difference"
)]
pub struct Cli {
    /// SQLite database file (overrides TIMELINE_IQ_DATABASE_PATH)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Folder for CSV and monthly report exports (overrides TIMELINE_IQ_EXPORT_DIR)
    #[arg(long, global = true)]
    pub export_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the terminal dashboard (default)
    Dashboard,
    /// List projects, newest start date first
    List {
        /// Only show Planned, Active or Completed projects
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Add a project; status follows logged hours and end date
    Add(ProjectFields),
    /// Overwrite fields of an existing project
    Update {
        id: i64,
        #[command(flatten)]
        fields: ProjectFields,
    },
    /// Delete a project
    Delete { id: i64 },
    /// Show deviation statistics and bias by project size
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Suggest realistic hours for a new estimate
    Predict {
        #[arg(allow_hyphen_values = true)]
        hours: String,
    },
    /// Write all projects to TimelineIQ_Report.csv
    ExportCsv,
    /// Write this month's report to TimelineIQ_Monthly_YYYY_MM.txt
    MonthlyReport,
}

impl Command {
    pub fn is_dashboard(&self) -> bool {
        matches!(self, Command::Dashboard)
    }
}

#[derive(Debug, Default, Args)]
pub struct ProjectFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub estimated: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub actual: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub start: Option<String>,
    /// YYYY-MM-DD
    #[arg(long, conflicts_with = "clear_end")]
    pub end: Option<String>,
    /// Remove the end date
    #[arg(long)]
    pub clear_end: bool,
    /// Planned, Active or Completed
    #[arg(long)]
    pub status: Option<String>,
}

impl ProjectFields {
    /// Overlay the given flags on `draft` and validate the result.
    pub fn apply(self, mut draft: ProjectDraft) -> Result<ProjectDraft, ValidationError> {
        if let Some(name) = self.name {
            draft.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(hours) = self.estimated {
            draft.estimated_hours = parse_hours(&hours)?;
        }
        if let Some(hours) = self.actual {
            draft.actual_hours = parse_hours(&hours)?;
        }
        if let Some(start) = self.start {
            draft.start_date = parse_date(&start)?;
        }
        if let Some(end) = self.end {
            draft.end_date = Some(parse_date(&end)?);
        }
        if self.clear_end {
            draft.end_date = None;
        }
        if let Some(status) = self.status {
            draft.status = status.parse()?;
        }
        draft.validate()?;
        Ok(draft)
    }
}

/// Project plus the metrics derived from it, for JSON output.
#[derive(Serialize)]
struct ProjectView<'a> {
    #[serde(flatten)]
    project: &'a Project,
    deviation_hours: f64,
    percentage_deviation: f64,
    accuracy_score: f64,
    size_category: SizeCategory,
    overestimated: bool,
    underestimated: bool,
}

impl<'a> From<&'a Project> for ProjectView<'a> {
    fn from(project: &'a Project) -> Self {
        Self {
            project,
            deviation_hours: project.deviation_hours(),
            percentage_deviation: project.percentage_deviation(),
            accuracy_score: project.accuracy_score(),
            size_category: project.size_category(),
            overestimated: project.is_overestimated(),
            underestimated: project.is_underestimated(),
        }
    }
}

pub async fn run(command: Command, db: &Database, reports: &ReportWriter) -> Result<()> {
    match command {
        Command::Dashboard => crate::run_dashboard(db, reports).await?,
        Command::List { status, json } => {
            let status = status.map(|s| s.parse::<ProjectStatus>()).transpose()?;
            let projects = db.load_projects().await?;
            print_projects(&filter_by_status(&projects, status), json)?;
        }
        Command::Add(fields) => {
            let today = chrono::Local::now().date_naive();
            let draft = normalize(fields.apply(ProjectDraft::new(today))?);
            let status = draft.status;
            let id = db.add_project(&draft).await?;
            println!("Added project {id} ({status}).");
        }
        Command::Update { id, fields } => {
            let Some(current) = db.get_project(id).await? else {
                bail!("No project with id {id}.");
            };
            let draft = fields.apply(ProjectDraft::from_project(&current))?;
            if db.update_project(&draft.into_project(id)).await? {
                println!("Updated project {id}.");
            } else {
                bail!("No project with id {id}.");
            }
        }
        Command::Delete { id } => {
            if db.delete_project(id).await? {
                println!("Deleted project {id}.");
            } else {
                println!("No project with id {id}; nothing deleted.");
            }
        }
        Command::Stats { json } => {
            let projects = db.load_projects().await?;
            print_statistics(&Statistics::compute(&projects), json)?;
        }
        Command::Predict { hours } => {
            let estimate = parse_hours(&hours)?;
            let projects = db.load_projects().await?;
            match Statistics::compute(&projects).predict(estimate) {
                Prediction::NeedsInput => println!("Enter an estimate above zero to get a suggestion."),
                Prediction::Suggested { hours, average_deviation } => println!(
                    "Suggested: {hours:.1} hours (overall deviation {average_deviation:.1}%)"
                ),
            }
        }
        Command::ExportCsv => {
            let projects = db.load_projects().await?;
            let path = reports.export_csv(&projects)?;
            println!("Report saved: {}", path.display());
        }
        Command::MonthlyReport => {
            let projects = db.load_projects().await?;
            let now = chrono::Local::now().naive_local();
            match reports.export_monthly(&projects, now)? {
                MonthlyOutcome::Written { path, projects } => {
                    println!("Monthly report saved ({projects} projects): {}", path.display());
                }
                MonthlyOutcome::NoProjects => println!("No projects found for this month."),
            }
        }
    }

    Ok(())
}

fn print_projects(projects: &[&Project], json: bool) -> Result<()> {
    if json {
        let views: Vec<ProjectView> = projects.iter().map(|p| ProjectView::from(*p)).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects.");
        return Ok(());
    }

    println!(
        "{:>4}  {:<28} {:>8} {:>8} {:>9} {:>5}  {:<6} {:<9} {}",
        "Id", "Name", "Est.", "Actual", "Dev.", "Acc.", "Size", "Status", "Start"
    );
    for p in projects {
        println!(
            "{:>4}  {:<28} {:>8.1} {:>8.1} {:>8.1}% {:>5.0}  {:<6} {:<9} {}",
            p.id,
            truncate(&p.name, 28),
            p.estimated_hours,
            p.actual_hours,
            p.percentage_deviation(),
            p.accuracy_score(),
            p.size_category().name(),
            p.status.as_str(),
            p.start_date.format("%Y-%m-%d")
        );
    }
    Ok(())
}

fn print_statistics(stats: &Statistics, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!("Total projects:    {}", stats.total);
    println!(
        "By status:         {} planned, {} active, {} completed",
        stats.planned, stats.active, stats.completed
    );
    println!("Average deviation: {:.1}%", stats.average_deviation);
    println!("Average accuracy:  {:.1}/100", stats.average_accuracy);
    println!("Underestimated:    {}", stats.underestimated);
    println!("Overestimated:     {}", stats.overestimated);
    println!();
    println!("Estimation bias");
    for c in &stats.bias.categories {
        println!("  {:<16} {:>3} projects  {:>7.1}%", c.category.label(), c.count, c.mean_deviation);
    }
    if stats.bias.has_data() {
        let worst = stats.bias.riskiest();
        println!("  Riskiest category: {} ({:.1}%)", worst.category.name(), worst.mean_deviation.abs());
    }
    println!("  {}", stats.bias.advice());

    if !stats.recent_completed.is_empty() {
        println!();
        println!("Recent completed");
        for c in &stats.recent_completed {
            let verdict = if c.is_overestimated() { "under estimate" } else { "at or over estimate" };
            println!("  {}: {}h estimated, {}h actual ({verdict})", c.name, c.estimated_hours, c.actual_hours);
        }
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width - 1).collect();
        cut.push('…');
        cut
    }
}
