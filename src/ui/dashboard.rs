use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::analysis::{filter_by_status, Statistics};
use crate::models::{Project, ProjectStatus};
use crate::ui::{centered_rect, Message};

const COLUMN_WIDTHS: [Constraint; 9] = [
    Constraint::Length(4),
    Constraint::Min(12),
    Constraint::Length(7),
    Constraint::Length(7),
    Constraint::Length(8),
    Constraint::Length(6),
    Constraint::Length(7),
    Constraint::Length(10),
    Constraint::Length(10),
];

// Represents the state of the main project screen
pub struct DashboardState {
    projects: Vec<Project>,
    stats: Statistics,
    filter: Option<ProjectStatus>,
    table_state: TableState,
    show_delete_confirmation: bool,
    message: Option<Message>,
}

pub enum DashboardAction {
    Quit,
    Reload,
    NewProject,
    EditProject(i64),
    DeleteProject(i64),
    ExportCsv,
    MonthlyReport,
}

impl DashboardState {
    pub fn new(projects: Vec<Project>) -> Self {
        let stats = Statistics::compute(&projects);
        let mut state = Self {
            projects,
            stats,
            filter: None,
            table_state: TableState::default(),
            show_delete_confirmation: false,
            message: None,
        };
        state.clamp_selection();
        state
    }

    /// Swap in a fresh load, keeping filter and message.
    pub fn reload(&mut self, projects: Vec<Project>) {
        self.stats = Statistics::compute(&projects);
        self.projects = projects;
        self.show_delete_confirmation = false;
        self.clamp_selection();
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn set_message(&mut self, message: Message) {
        self.message = Some(message);
    }

    fn visible(&self) -> Vec<&Project> {
        filter_by_status(&self.projects, self.filter)
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        let selected = match self.table_state.selected() {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => Some(0),
        };
        self.table_state.select(selected);
    }

    pub fn next(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    /// All → Planned → Active → Completed → All.
    pub fn cycle_filter(&mut self) {
        self.filter = match self.filter {
            None => Some(ProjectStatus::Planned),
            Some(ProjectStatus::Completed) => None,
            Some(status) => Some(status.cycle()),
        };
        self.table_state.select(None);
        self.clamp_selection();
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    pub fn selected_project(&self) -> Option<&Project> {
        let visible = self.visible();
        self.table_state.selected().and_then(|i| visible.get(i).copied())
    }

    pub fn selected_project_id(&self) -> Option<i64> {
        self.selected_project().map(|p| p.id)
    }
}

pub fn render_dashboard<B: Backend>(frame: &mut Frame<B>, state: &mut DashboardState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(1), Constraint::Length(3)].as_ref())
        .split(size);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)].as_ref())
        .split(chunks[0]);

    render_table(frame, state, main[0]);
    render_side_panel(frame, state.stats(), main[1]);

    let message = match &state.message {
        Some(Message::Info(text)) => Paragraph::new(text.as_str()).style(Style::default().fg(Color::Green)),
        Some(Message::Error(text)) => Paragraph::new(text.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(""),
    };
    frame.render_widget(message, chunks[1]);

    let buttons_text = if state.selected_project().is_some() {
        "<N> New | <E> Edit | <D> Delete | <F> Filter | <X> Export CSV | <M> Monthly report | <R> Reload | <Q> Quit"
    } else {
        "<N> New | <F> Filter | <X> Export CSV | <M> Monthly report | <R> Reload | <Q> Quit"
    };
    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[2]);

    if state.show_delete_confirmation {
        let name = state.selected_project().map(|p| p.name.clone()).unwrap_or_default();
        render_delete_confirmation(frame, size, &name);
    }
}

fn render_table<B: Backend>(frame: &mut Frame<B>, state: &mut DashboardState, area: Rect) {
    let header = Row::new(["Id", "Name", "Est.", "Actual", "Dev.", "Acc.", "Size", "Status", "Start"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = state
        .visible()
        .into_iter()
        .map(|project| {
            let deviation = project.percentage_deviation();
            let deviation_style = if deviation > 0.0 {
                Style::default().fg(Color::Red)
            } else if deviation < 0.0 {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };

            Row::new(vec![
                Cell::from(project.id.to_string()),
                Cell::from(project.name.clone()),
                Cell::from(format!("{:.1}", project.estimated_hours)),
                Cell::from(format!("{:.1}", project.actual_hours)),
                Cell::from(format!("{:+.1}%", deviation)).style(deviation_style),
                Cell::from(format!("{:.0}", project.accuracy_score())),
                Cell::from(project.size_category().name()),
                Cell::from(project.status.as_str()),
                Cell::from(project.start_date.format("%Y-%m-%d").to_string()),
            ])
        })
        .collect();

    let title = match state.filter {
        Some(status) => format!("Projects ({status})"),
        None => "Projects (All)".to_string(),
    };

    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .widths(&COLUMN_WIDTHS)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(table, area, &mut state.table_state);
}

fn render_side_panel<B: Backend>(frame: &mut Frame<B>, stats: &Statistics, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Length(8), Constraint::Min(3)].as_ref())
        .split(area);

    let summary = Paragraph::new(vec![
        Spans::from(format!("Total projects: {}", stats.total)),
        Spans::from(format!(
            "Planned {} | Active {} | Completed {}",
            stats.planned, stats.active, stats.completed
        )),
        Spans::from(format!("Average deviation: {:.1}%", stats.average_deviation)),
        Spans::from(format!("Average accuracy: {:.1}/100", stats.average_accuracy)),
        Spans::from(format!("Underestimated: {}", stats.underestimated)),
        Spans::from(format!("Overestimated: {}", stats.overestimated)),
    ])
    .block(Block::default().title("Statistics").borders(Borders::ALL));
    frame.render_widget(summary, chunks[0]);

    let mut bias_lines: Vec<Spans> = stats
        .bias
        .categories
        .iter()
        .map(|c| {
            Spans::from(format!(
                "{}: {} projects, {:.1}%",
                c.category.label(),
                c.count,
                c.mean_deviation
            ))
        })
        .collect();
    if stats.bias.has_data() {
        let worst = stats.bias.riskiest();
        bias_lines.push(Spans::from(Span::styled(
            format!("Riskiest: {} ({:.1}%)", worst.category.name(), worst.mean_deviation.abs()),
            Style::default().fg(Color::Magenta),
        )));
    }
    bias_lines.push(Spans::from(stats.bias.advice()));

    let bias = Paragraph::new(bias_lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Estimation bias").borders(Borders::ALL));
    frame.render_widget(bias, chunks[1]);

    let items: Vec<ListItem> = stats
        .recent_completed
        .iter()
        .map(|c| {
            let style = if c.is_overestimated() {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };
            ListItem::new(Spans::from(vec![
                Span::raw(format!("{}: ", c.name)),
                Span::styled(format!("{}h est / {}h actual", c.estimated_hours, c.actual_hours), style),
            ]))
        })
        .collect();

    let recent = List::new(items).block(
        Block::default()
            .title("Recent completed")
            .borders(Borders::ALL),
    );
    frame.render_widget(recent, chunks[2]);
}

fn render_delete_confirmation<B: Backend>(frame: &mut Frame<B>, size: Rect, name: &str) {
    let popup_area = centered_rect(50, 20, size);

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(format!("Delete the project '{name}'?")),
        Spans::from(""),
        Spans::from("<Y> Yes  <N> No"),
    ])
    .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

pub fn handle_input(state: &mut DashboardState) -> Result<Option<DashboardAction>> {
    if let Event::Key(key) = event::read()? {
        if state.show_delete_confirmation {
            match key.code {
                KeyCode::Char('y') => {
                    state.toggle_delete_confirmation();
                    if let Some(id) = state.selected_project_id() {
                        return Ok(Some(DashboardAction::DeleteProject(id)));
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => state.toggle_delete_confirmation(),
                _ => {}
            }
            return Ok(None);
        }

        state.message = None;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Some(DashboardAction::Quit)),
            KeyCode::Char('n') => return Ok(Some(DashboardAction::NewProject)),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(id) = state.selected_project_id() {
                    return Ok(Some(DashboardAction::EditProject(id)));
                }
            }
            KeyCode::Char('d') => {
                if state.selected_project().is_some() {
                    state.toggle_delete_confirmation();
                }
            }
            KeyCode::Char('f') => state.cycle_filter(),
            KeyCode::Char('x') => return Ok(Some(DashboardAction::ExportCsv)),
            KeyCode::Char('m') => return Ok(Some(DashboardAction::MonthlyReport)),
            KeyCode::Char('r') => return Ok(Some(DashboardAction::Reload)),
            KeyCode::Down => state.next(),
            KeyCode::Up => state.previous(),
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample;

    fn projects() -> Vec<Project> {
        ProjectStatus::ALL
            .into_iter()
            .enumerate()
            .map(|(i, status)| {
                let mut p = sample(10.0, 12.0, status);
                p.id = i as i64 + 1;
                p
            })
            .collect()
    }

    #[test]
    fn selection_wraps_around() {
        let mut state = DashboardState::new(projects());
        assert_eq!(state.selected_project_id(), Some(1));

        state.previous();
        assert_eq!(state.selected_project_id(), Some(3));
        state.next();
        assert_eq!(state.selected_project_id(), Some(1));
    }

    #[test]
    fn filter_cycles_through_statuses() {
        let mut state = DashboardState::new(projects());

        state.cycle_filter();
        assert_eq!(state.filter, Some(ProjectStatus::Planned));
        assert_eq!(state.selected_project_id(), Some(1));

        state.cycle_filter();
        state.cycle_filter();
        assert_eq!(state.filter, Some(ProjectStatus::Completed));
        assert_eq!(state.selected_project_id(), Some(3));

        state.cycle_filter();
        assert_eq!(state.filter, None);
    }

    #[test]
    fn reload_recomputes_statistics_and_clamps_selection() {
        let mut state = DashboardState::new(projects());
        state.next();
        state.next();

        state.reload(projects().into_iter().take(1).collect());

        assert_eq!(state.stats().total, 1);
        assert_eq!(state.selected_project_id(), Some(1));

        state.reload(Vec::new());
        assert_eq!(state.selected_project_id(), None);
    }
}
