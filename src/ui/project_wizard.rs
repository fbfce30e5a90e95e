use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::analysis::{predict_suggested_hours, Prediction};
use crate::error::ValidationError;
use crate::models::{parse_hours, Project, ProjectDraft, ProjectStatus};
use crate::ui::components::date_input::DateInputState;

pub enum ProjectWizardAction {
    Cancel,
    /// `id` is `None` for a new project.
    Save { id: Option<i64>, draft: ProjectDraft },
}

#[derive(Clone, PartialEq, Copy)]
pub enum ProjectField {
    Name,
    Description,
    EstimatedHours,
    ActualHours,
    StartDate,
    EndDate,
    Status,
}

const FIELDS: [ProjectField; 7] = [
    ProjectField::Name,
    ProjectField::Description,
    ProjectField::EstimatedHours,
    ProjectField::ActualHours,
    ProjectField::StartDate,
    ProjectField::EndDate,
    ProjectField::Status,
];

impl ProjectField {
    fn label(self) -> &'static str {
        match self {
            ProjectField::Name => "Name",
            ProjectField::Description => "Description",
            ProjectField::EstimatedHours => "Estimated hours",
            ProjectField::ActualHours => "Actual hours",
            ProjectField::StartDate => "Start date",
            ProjectField::EndDate => "End date",
            ProjectField::Status => "Status",
        }
    }

    fn is_date(self) -> bool {
        matches!(self, ProjectField::StartDate | ProjectField::EndDate)
    }
}

pub struct ProjectWizardState {
    id: Option<i64>,
    name: String,
    description: String,
    estimated_hours: String,
    actual_hours: String,
    start_date: DateInputState,
    end_date: DateInputState,
    has_end_date: bool,
    status: ProjectStatus,
    current_field: ProjectField,
    editing: bool,
    error: Option<String>,
    /// Historical deviation driving the live suggestion.
    average_deviation: f64,
}

impl ProjectWizardState {
    pub fn new(average_deviation: f64) -> Self {
        let today = chrono::Local::now().date_naive();
        Self::from_draft(None, ProjectDraft::new(today), average_deviation)
    }

    pub fn from_existing(project: &Project, average_deviation: f64) -> Self {
        Self::from_draft(Some(project.id), ProjectDraft::from_project(project), average_deviation)
    }

    fn from_draft(id: Option<i64>, draft: ProjectDraft, average_deviation: f64) -> Self {
        Self {
            id,
            estimated_hours: format_hours(draft.estimated_hours),
            actual_hours: format_hours(draft.actual_hours),
            start_date: DateInputState::new(draft.start_date),
            end_date: DateInputState::new(draft.end_date.unwrap_or(draft.start_date)),
            has_end_date: draft.end_date.is_some(),
            name: draft.name,
            description: draft.description,
            status: draft.status,
            current_field: ProjectField::Name,
            editing: false,
            error: None,
            average_deviation,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    fn field_index(&self) -> usize {
        FIELDS.iter().position(|f| *f == self.current_field).unwrap_or(0)
    }

    pub fn next_field(&mut self) {
        self.current_field = FIELDS[(self.field_index() + 1) % FIELDS.len()];
    }

    pub fn previous_field(&mut self) {
        self.current_field = FIELDS[(self.field_index() + FIELDS.len() - 1) % FIELDS.len()];
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        self.start_date.stop_editing();
        self.end_date.stop_editing();
        if self.editing {
            match self.current_field {
                ProjectField::StartDate => self.start_date.start_editing(),
                ProjectField::EndDate => {
                    self.has_end_date = true;
                    self.end_date.start_editing();
                }
                _ => {}
            }
        }
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match self.current_field {
            ProjectField::Name => edit_text(&mut self.name, key),
            ProjectField::Description => edit_text(&mut self.description, key),
            ProjectField::EstimatedHours => edit_number(&mut self.estimated_hours, key),
            ProjectField::ActualHours => edit_number(&mut self.actual_hours, key),
            ProjectField::StartDate => self.start_date.handle_input(key),
            ProjectField::EndDate => {
                if key == KeyCode::Delete {
                    self.has_end_date = false;
                    self.toggle_editing();
                } else {
                    self.end_date.handle_input(key);
                }
            }
            ProjectField::Status => match key {
                KeyCode::Right | KeyCode::Char(' ') => self.status = self.status.cycle(),
                KeyCode::Left => self.status = self.status.cycle().cycle(),
                _ => {}
            },
        }
    }

    /// Parse and validate the form; nothing is saved when this fails.
    pub fn to_draft(&self) -> Result<ProjectDraft, ValidationError> {
        let draft = ProjectDraft {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            estimated_hours: parse_hours(&self.estimated_hours)?,
            actual_hours: parse_hours(&self.actual_hours)?,
            start_date: self.start_date.date,
            end_date: self.has_end_date.then_some(self.end_date.date),
            status: self.status,
        };
        draft.validate()?;
        Ok(draft)
    }

    pub fn suggestion(&self) -> String {
        let estimate = parse_hours(&self.estimated_hours).unwrap_or(0.0);
        match predict_suggested_hours(estimate, self.average_deviation) {
            Prediction::NeedsInput => "Enter an estimate to get a suggestion.".to_string(),
            Prediction::Suggested { hours, average_deviation } => format!(
                "Suggested: {hours:.1} hours (overall deviation {average_deviation:.1}%)"
            ),
        }
    }

    fn field_value(&self, field: ProjectField) -> String {
        let editing = self.editing && field == self.current_field;
        let cursor = if editing { "|" } else { "" };
        match field {
            ProjectField::Name => format!("{}{cursor}", self.name),
            ProjectField::Description => format!("{}{cursor}", self.description),
            ProjectField::EstimatedHours => format!("{}{cursor}", self.estimated_hours),
            ProjectField::ActualHours => format!("{}{cursor}", self.actual_hours),
            ProjectField::StartDate => self.start_date.display(),
            ProjectField::EndDate if self.has_end_date => self.end_date.display(),
            ProjectField::EndDate => "Not set".to_string(),
            ProjectField::Status if editing => format!("< {} >", self.status),
            ProjectField::Status => self.status.to_string(),
        }
    }
}

fn format_hours(hours: f64) -> String {
    if hours == 0.0 { String::new() } else { hours.to_string() }
}

fn edit_text(value: &mut String, key: KeyCode) {
    match key {
        KeyCode::Char(c) => value.push(c),
        KeyCode::Backspace => {
            value.pop();
        }
        _ => {}
    }
}

fn edit_number(value: &mut String, key: KeyCode) {
    match key {
        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => value.push(c),
        KeyCode::Backspace => {
            value.pop();
        }
        _ => {}
    }
}

pub fn render_project_wizard<B: Backend>(f: &mut Frame<B>, state: &mut ProjectWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(9),
                Constraint::Length(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    let title_text = if state.is_new() { "New Project" } else { "Edit Project" };
    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let (feedback, style) = match &state.error {
        Some(error) => (error.clone(), Style::default().fg(Color::Red)),
        None => (state.suggestion(), Style::default().fg(Color::Green)),
    };
    let feedback = Paragraph::new(feedback)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Prediction"));
    f.render_widget(feedback, chunks[2]);

    let help_text = if state.editing {
        match state.current_field {
            field if field.is_date() => {
                "Enter - Done | Left/Right - Switch date part | Del - Clear end date | Esc - Done"
            }
            ProjectField::Status => "Left/Right/Space - Change status | Enter - Done",
            _ => "Enter - Done | Esc - Done",
        }
    } else {
        "Enter - Edit field | Up/Down - Navigate fields | S - Save project | Esc - Cancel"
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &ProjectWizardState, area: Rect) {
    let items: Vec<ListItem> = FIELDS
        .iter()
        .map(|&field| {
            let selected = field == state.current_field;
            let label_style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let value_style = if selected && state.editing {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            ListItem::new(Spans::from(vec![
                Span::styled(format!("{}: ", field.label()), label_style),
                Span::styled(state.field_value(field), value_style),
            ]))
        })
        .collect();

    let form_list = List::new(items).block(Block::default().borders(Borders::ALL).title("Project Details"));
    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut ProjectWizardState) -> Result<Option<ProjectWizardAction>> {
    if let Event::Key(key) = event::read()? {
        match key.code {
            KeyCode::Esc if state.editing => state.toggle_editing(),
            KeyCode::Esc => return Ok(Some(ProjectWizardAction::Cancel)),
            KeyCode::Enter => state.toggle_editing(),
            KeyCode::Up if !state.editing => state.previous_field(),
            KeyCode::Down | KeyCode::Tab if !state.editing => state.next_field(),
            KeyCode::Char('s') if !state.editing => match state.to_draft() {
                Ok(draft) => {
                    return Ok(Some(ProjectWizardAction::Save { id: state.id, draft }));
                }
                Err(err) => state.show_error(err.to_string()),
            },
            _ if state.editing => {
                state.error = None;
                state.edit_current_field(key.code);
            }
            _ => {}
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample;

    fn type_text(state: &mut ProjectWizardState, text: &str) {
        for c in text.chars() {
            state.edit_current_field(KeyCode::Char(c));
        }
    }

    #[test]
    fn new_form_requires_a_name() {
        let state = ProjectWizardState::new(0.0);

        assert!(state.is_new());
        assert_eq!(state.to_draft(), Err(ValidationError::EmptyName));
    }

    #[test]
    fn typed_values_become_a_draft() {
        let mut state = ProjectWizardState::new(10.0);
        state.toggle_editing();
        type_text(&mut state, "Billing");
        state.toggle_editing();
        state.next_field();
        state.next_field();
        state.toggle_editing();
        type_text(&mut state, "20");
        state.toggle_editing();

        let draft = state.to_draft().expect("valid");
        assert_eq!(draft.name, "Billing");
        assert_eq!(draft.estimated_hours, 20.0);
        assert_eq!(draft.end_date, None);
        assert_eq!(state.suggestion(), "Suggested: 22.0 hours (overall deviation 10.0%)");
    }

    #[test]
    fn negative_hours_are_reported() {
        let mut state = ProjectWizardState::new(0.0);
        state.name = "Search".to_string();
        state.actual_hours = "-4".to_string();

        assert_eq!(
            state.to_draft(),
            Err(ValidationError::NegativeHours { field: "Actual hours" })
        );
    }

    #[test]
    fn editing_keeps_identifier_and_end_date() {
        let mut project = sample(12.0, 3.0, ProjectStatus::Completed);
        project.id = 42;
        project.end_date = chrono::NaiveDate::from_ymd_opt(2026, 10, 9);

        let state = ProjectWizardState::from_existing(&project, 0.0);
        let draft = state.to_draft().expect("valid");

        assert_eq!(state.id, Some(42));
        assert_eq!(draft.into_project(42), project);
    }

    #[test]
    fn end_date_can_be_cleared() {
        let mut project = sample(12.0, 3.0, ProjectStatus::Completed);
        project.end_date = chrono::NaiveDate::from_ymd_opt(2026, 10, 9);
        let mut state = ProjectWizardState::from_existing(&project, 0.0);
        state.current_field = ProjectField::EndDate;
        state.toggle_editing();

        state.edit_current_field(KeyCode::Delete);

        assert!(!state.editing);
        assert_eq!(state.to_draft().expect("valid").end_date, None);
    }

    #[test]
    fn status_cycles_both_ways() {
        let mut state = ProjectWizardState::new(0.0);
        state.current_field = ProjectField::Status;
        state.toggle_editing();

        state.edit_current_field(KeyCode::Left);
        assert_eq!(state.status, ProjectStatus::Completed);
        state.edit_current_field(KeyCode::Right);
        assert_eq!(state.status, ProjectStatus::Planned);
    }
}
