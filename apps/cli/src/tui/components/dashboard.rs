//! Dashboard view for a signed-in user.

use crate::tui::app::App;
use crate::tui::theme::Theme;
use crate::tui::ui::{centered_rect, panel_block};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let panel = centered_rect(64, 14, area);
    let block = panel_block("Dashboard", true, theme);
    let inner = block.inner(panel);
    frame.render_widget(block, panel);

    let state = &app.state;
    let email = state
        .identity
        .as_ref()
        .and_then(|i| i.email.clone())
        .unwrap_or_else(|| "(no email)".to_string());

    let mut lines = Vec::new();
    match (&state.profile, &state.organization) {
        (Some(profile), Some(organization)) => {
            lines.push(Line::from(Span::styled(
                format!("Welcome back, {}", profile.full_name),
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
            lines.push(row("Email", &email, theme));
            lines.push(row("Organization", &organization.name, theme));
            lines.push(row("Role", profile.role.as_str(), theme));
            lines.push(row(
                "Member since",
                &profile.created_at.format("%Y-%m-%d").to_string(),
                theme,
            ));
        }
        _ => {
            lines.push(Line::from(Span::styled(
                format!("Signed in as {}", email),
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
            let text = if state.is_loading {
                "Loading profile..."
            } else {
                "Profile not loaded. Press r to retry."
            };
            lines.push(Line::from(Span::styled(
                text,
                Style::default().fg(theme.text_muted),
            )));
        }
    }

    if let Some(error) = &state.error {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(error.clone(), Style::default().fg(theme.error)),
            Span::styled("  [x] dismiss", Style::default().fg(theme.text_muted)),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn row(label: &str, value: &str, theme: &Theme) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{:<14}", format!("{}:", label)),
            Style::default().fg(theme.text_secondary),
        ),
        Span::styled(value.to_string(), Style::default().fg(theme.text)),
    ])
}
