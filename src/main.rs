mod analysis;
mod cli;
mod config;
mod db;
mod diagnostics;
mod error;
mod models;
mod report;
mod ui;

use std::fmt::Display;
use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::cli::{Cli, Command};
use crate::db::Database;
use crate::diagnostics::Console;
use crate::error::Error;
use crate::models::normalize;
use crate::report::{MonthlyOutcome, ReportWriter};
use crate::ui::{
    dashboard::{handle_input as handle_dashboard_input, render_dashboard, DashboardAction, DashboardState},
    project_wizard::{
        handle_input as handle_project_wizard_input, render_project_wizard, ProjectWizardAction,
        ProjectWizardState,
    },
    Message,
};

// Represents the current screen in the app
enum AppScreen {
    Dashboard,
    ProjectWizard,
}

// Main application state
struct AppState<'a> {
    db: &'a Database,
    reports: &'a ReportWriter,
    screen: AppScreen,
    dashboard_state: DashboardState,
    project_wizard_state: Option<ProjectWizardState>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    let config = match config::init(args.database, args.export_dir) {
        Ok(config) => config,
        Err(err) => {
            // No configured log path yet; fall back to the default one.
            let log_path = config::default_log_path();
            diagnostics::init(&log_path, Console::Stderr);
            diagnostics::record_failure("Load configuration", &*err);
            return Err(startup_error(&err, &log_path));
        }
    };
    let command = args.command.unwrap_or(Command::Dashboard);

    let console = if command.is_dashboard() { Console::Silent } else { Console::Stderr };
    diagnostics::init(&config.log_path, console);

    // Startup failures are fatal; the cause is already in the log.
    let db = db::init(&config)
        .await
        .map_err(|err| startup_error(&err, &config.log_path))?;
    let reports = ReportWriter::new(&config.export_dir);
    tracing::info!(
        database = %db.path().display(),
        exports = %reports.output_dir().display(),
        "project database ready"
    );

    cli::run(command, &db, &reports).await
}

/// Coarse message for a fatal startup failure, pointing at the log.
fn startup_error(err: &dyn Display, log_path: &Path) -> anyhow::Error {
    anyhow!("{err} Details were written to {}.", log_path.display())
}

/// Run the terminal dashboard until the user quits
pub async fn run_dashboard(db: &Database, reports: &ReportWriter) -> Result<()> {
    let projects = db.load_projects().await?;

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState {
        db,
        reports,
        screen: AppScreen::Dashboard,
        dashboard_state: DashboardState::new(projects),
        project_wizard_state: None,
    };

    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState<'_>) -> Result<()> {
    loop {
        terminal.draw(|f| match app_state.screen {
            AppScreen::Dashboard => render_dashboard(f, &mut app_state.dashboard_state),
            AppScreen::ProjectWizard => {
                if let Some(state) = &mut app_state.project_wizard_state {
                    render_project_wizard(f, state);
                }
            }
        })?;

        let should_quit = match app_state.screen {
            AppScreen::Dashboard => handle_dashboard_screen(app_state).await?,
            AppScreen::ProjectWizard => handle_project_wizard_screen(app_state).await?,
        };

        if should_quit {
            return Ok(());
        }
    }
}

/// Reload every project and recompute the statistics shown on the dashboard.
async fn reload_dashboard(app_state: &mut AppState<'_>) -> Result<(), Error> {
    let projects = app_state.db.load_projects().await?;
    app_state.dashboard_state.reload(projects);
    Ok(())
}

/// Store and report failures are shown on the status line; the app keeps running.
fn report_outcome(app_state: &mut AppState<'_>, outcome: Result<String, Error>) {
    let message = match outcome {
        Ok(text) => Message::Info(text),
        Err(err) => Message::Error(err.to_string()),
    };
    app_state.dashboard_state.set_message(message);
}

async fn handle_dashboard_screen(app_state: &mut AppState<'_>) -> Result<bool> {
    let Some(action) = handle_dashboard_input(&mut app_state.dashboard_state)? else {
        return Ok(false);
    };

    match action {
        DashboardAction::Quit => return Ok(true),
        DashboardAction::Reload => {
            let outcome = reload_dashboard(app_state).await.map(|()| "Projects reloaded.".to_string());
            report_outcome(app_state, outcome);
        }
        DashboardAction::NewProject => {
            let average_deviation = app_state.dashboard_state.stats().average_deviation;
            app_state.project_wizard_state = Some(ProjectWizardState::new(average_deviation));
            app_state.screen = AppScreen::ProjectWizard;
        }
        DashboardAction::EditProject(id) => match app_state.db.get_project(id).await {
            Ok(Some(project)) => {
                let average_deviation = app_state.dashboard_state.stats().average_deviation;
                app_state.project_wizard_state =
                    Some(ProjectWizardState::from_existing(&project, average_deviation));
                app_state.screen = AppScreen::ProjectWizard;
            }
            Ok(None) => {
                let outcome = reload_dashboard(app_state)
                    .await
                    .map(|()| format!("Project {id} no longer exists."));
                report_outcome(app_state, outcome);
            }
            Err(err) => report_outcome(app_state, Err(err)),
        },
        DashboardAction::DeleteProject(id) => {
            let outcome = match app_state.db.delete_project(id).await {
                Ok(deleted) => reload_dashboard(app_state).await.map(|()| {
                    if deleted {
                        "Project deleted.".to_string()
                    } else {
                        format!("Project {id} was already gone.")
                    }
                }),
                Err(err) => Err(err),
            };
            report_outcome(app_state, outcome);
        }
        DashboardAction::ExportCsv => {
            let outcome = match app_state.db.load_projects().await {
                Ok(projects) => app_state
                    .reports
                    .export_csv(&projects)
                    .map(|path| format!("Report saved: {}", path.display())),
                Err(err) => Err(err),
            };
            report_outcome(app_state, outcome);
        }
        DashboardAction::MonthlyReport => {
            let now = chrono::Local::now().naive_local();
            let outcome = match app_state.db.load_projects().await {
                Ok(projects) => app_state.reports.export_monthly(&projects, now).map(|written| match written {
                    MonthlyOutcome::Written { path, .. } => format!("Monthly report saved: {}", path.display()),
                    MonthlyOutcome::NoProjects => "No projects found for this month.".to_string(),
                }),
                Err(err) => Err(err),
            };
            report_outcome(app_state, outcome);
        }
    }

    Ok(false)
}

async fn handle_project_wizard_screen(app_state: &mut AppState<'_>) -> Result<bool> {
    let Some(state) = &mut app_state.project_wizard_state else {
        app_state.screen = AppScreen::Dashboard;
        return Ok(false);
    };

    match handle_project_wizard_input(state)? {
        Some(ProjectWizardAction::Cancel) => {
            app_state.project_wizard_state = None;
            app_state.screen = AppScreen::Dashboard;
        }
        Some(ProjectWizardAction::Save { id, draft }) => {
            let saved = match id {
                None => app_state.db.add_project(&normalize(draft)).await.map(|_| "Project added."),
                Some(id) => app_state
                    .db
                    .update_project(&draft.into_project(id))
                    .await
                    .map(|found| if found { "Project updated." } else { "Project no longer exists." }),
            };

            match saved {
                Ok(text) => {
                    app_state.project_wizard_state = None;
                    app_state.screen = AppScreen::Dashboard;
                    let outcome = reload_dashboard(app_state).await.map(|()| text.to_string());
                    report_outcome(app_state, outcome);
                }
                // Keep the form open so nothing typed is lost.
                Err(err) => {
                    if let Some(state) = &mut app_state.project_wizard_state {
                        state.show_error(err.to_string());
                    }
                }
            }
        }
        None => {}
    }

    Ok(false)
}
