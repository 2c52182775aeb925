//! Main render function and layout for the TUI.

use super::app::App;
use super::components::{auth_form, dashboard, landing};
use super::theme::Theme;
use ragmaster_auth::View;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

/// Render the entire application.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let theme = &app.theme;

    Clear.render(area, frame.buffer_mut());
    Block::default()
        .style(Style::default().bg(theme.bg))
        .render(area, frame.buffer_mut());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    match app.view() {
        View::Landing => landing::render(frame, app, chunks[1]),
        View::Auth => auth_form::render(frame, app, chunks[1]),
        View::Dashboard => dashboard::render(frame, app, chunks[1]),
    }
    render_status_bar(frame, app, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let mut spans = vec![Span::styled(
        " RAG Master ",
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD),
    )];

    if let Some(organization) = &app.state.organization {
        spans.push(Span::styled(
            format!("| {}", organization.name),
            Style::default().fg(theme.text_secondary),
        ));
    }
    if app.state.is_loading {
        spans.push(Span::styled(
            "  working...",
            Style::default().fg(theme.info),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.bg_panel));
    frame.render_widget(header, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let status_text = if let Some(msg) = &app.status_message {
        msg.clone()
    } else {
        build_status_text(app)
    };

    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(
            status_text,
            Style::default().fg(if app.status_message.is_some() {
                theme.warning
            } else {
                theme.text_muted
            }),
        ),
    ]))
    .style(Style::default().bg(theme.bg_panel));

    frame.render_widget(status, area);
}

/// Key hints for the current view.
fn build_status_text(app: &App) -> String {
    match app.view() {
        View::Landing => "Enter/s sign in | u create account | q quit".to_string(),
        View::Auth => "Tab next field | Enter submit | Ctrl+N switch mode | Esc back".to_string(),
        View::Dashboard => {
            let who = app
                .state
                .identity
                .as_ref()
                .and_then(|i| i.email.as_deref())
                .unwrap_or("Signed in");
            format!("{} | r reload profile | o sign out | q quit", who)
        }
    }
}

/// Helper to create a styled block for panels.
pub fn panel_block<'a>(title: &str, is_active: bool, theme: &Theme) -> Block<'a> {
    let border_color = if is_active {
        theme.border_active
    } else {
        theme.border
    };

    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(theme.bg_panel))
}

/// Center a `width` x `height` rectangle inside `area`.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;

    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
