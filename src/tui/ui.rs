use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use super::app::{App, FormField, InputMode};
use crate::models::{short_id, Priority};

fn priority_style(priority: Priority) -> Style {
    match priority {
        Priority::High => Style::default().fg(Color::Red),
        Priority::Normal => Style::default().fg(Color::Yellow),
        Priority::Low => Style::default().fg(Color::Green),
    }
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let error_height = if app.error.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Header
            Constraint::Length(error_height), // Error
            Constraint::Length(6),            // Form
            Constraint::Min(0),               // Table
            Constraint::Length(3),            // Help
        ])
        .split(f.area());

    let guest = if app.loading_auth {
        "Creating guest session…".to_string()
    } else if let Some(user) = &app.user_id {
        format!("Guest user: {}", short_id(user.as_str()))
    } else {
        "Not signed in.".to_string()
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(guest, Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", app.mode_label()),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Task Manager"));
    f.render_widget(header, chunks[0]);

    if let Some(error) = &app.error {
        let error = Paragraph::new(error.as_str())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(error, chunks[1]);
    }

    let editing = app.input_mode == InputMode::Editing;
    let label = |field: FormField, name: &'static str| {
        if editing && app.field == field {
            Span::styled(
                format!("> {:<12}", name),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::raw(format!("  {:<12}", name))
        }
    };
    let placeholder = |value: &str, hint: &'static str| {
        if value.is_empty() {
            Span::styled(hint, Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(value.to_string(), Style::default().fg(Color::Yellow))
        }
    };
    let form_lines = vec![
        Line::from(vec![
            label(FormField::Title, "Title"),
            placeholder(&app.form.title, "(required)"),
        ]),
        Line::from(vec![
            label(FormField::Description, "Description"),
            placeholder(&app.form.description, "(optional)"),
        ]),
        Line::from(vec![
            label(FormField::Priority, "Priority"),
            Span::styled(
                format!("< {} >", app.form.priority),
                priority_style(app.form.priority),
            ),
        ]),
        Line::from(vec![
            label(FormField::DueDate, "Due date"),
            placeholder(&app.form.due_date, "YYYY-MM-DD (optional)"),
        ]),
    ];
    let form_title = if app.creating {
        "Create task - Creating…"
    } else if app.can_submit() {
        "Create task - Enter: Add task"
    } else {
        "Create task"
    };
    let form = Paragraph::new(form_lines)
        .block(Block::default().borders(Borders::ALL).title(form_title));
    f.render_widget(form, chunks[2]);

    let rows: Vec<Row> = app
        .tasks
        .iter()
        .map(|t| {
            let updating = app.updating_id.as_ref() == Some(&t.id);
            let title_style = if t.is_complete {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default()
            };
            let status = if updating {
                "…"
            } else if t.is_complete {
                "Done"
            } else {
                "Pending"
            };
            Row::new(vec![
                Cell::from(if t.is_complete { "[x]" } else { "[ ]" }),
                Cell::from(t.title.clone()).style(title_style),
                Cell::from(t.description.clone().unwrap_or_default()),
                Cell::from(t.priority.as_str()).style(priority_style(t.priority)),
                Cell::from(t.due_date.map(|d| format!("due {}", d)).unwrap_or_default()),
                Cell::from(
                    t.created_at
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string(),
                ),
                Cell::from(status),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Min(20),
        Constraint::Min(10),
        Constraint::Length(8),
        Constraint::Length(14),
        Constraint::Length(16),
        Constraint::Length(8),
    ];

    let list_title = if app.loading_tasks {
        "Your tasks - Refreshing…"
    } else if app.tasks.is_empty() {
        "Your tasks - No tasks yet. Create one above."
    } else {
        "Your tasks"
    };
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["", "Title", "Description", "Priority", "Due", "Created", "Status"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title(list_title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, chunks[3], &mut app.state);

    let help_text = match app.input_mode {
        InputMode::Normal => {
            "q: Quit | a: Edit form | Space: Toggle complete | r: Refresh | g: New guest | j/k: Move"
        }
        InputMode::Editing => {
            "Enter: Add task | Tab/Shift-Tab: Field | Left/Right: Priority | Esc: Back to list"
        }
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[4]);
}
