//! Sign-in / sign-up form.

use crate::tui::app::{App, FormField, FormMode};
use crate::tui::theme::Theme;
use crate::tui::ui::{centered_rect, panel_block};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph, Wrap},
    Frame,
};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let title = match app.form.mode {
        FormMode::SignIn => "Sign in",
        FormMode::SignUp => "Create account",
    };

    let height = app.form.fields().len() as u16 * 2 + 8;
    let dialog = centered_rect(56, height, area);
    frame.render_widget(Clear, dialog);

    let block = panel_block(title, true, theme);
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let mut lines = Vec::new();
    for field in app.form.fields() {
        lines.push(field_line(app, *field, theme));
        lines.push(Line::from(""));
    }

    lines.extend(notice_lines(app, theme));

    let toggle_hint = match app.form.mode {
        FormMode::SignIn => " No account? Create one",
        FormMode::SignUp => " Have an account? Sign in",
    };
    lines.push(Line::from(vec![
        Span::styled("[Ctrl+N]", Style::default().fg(theme.text_muted)),
        Span::styled(toggle_hint, Style::default().fg(theme.text_secondary)),
    ]));

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn field_line(app: &App, field: FormField, theme: &Theme) -> Line<'static> {
    let focused = app.form.focused() == field;
    let value = app.form.value(field);
    let shown = match field {
        FormField::Password => "*".repeat(value.chars().count()),
        _ => value.to_string(),
    };
    let cursor = if focused { "_" } else { "" };

    let label_style = if focused {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text_secondary)
    };
    let value_style = if focused {
        Style::default().fg(theme.text).bg(theme.bg_selection)
    } else {
        Style::default().fg(theme.text)
    };

    Line::from(vec![
        Span::styled(format!("{:<14}", field.label()), label_style),
        Span::styled(format!("{}{}", shown, cursor), value_style),
    ])
}

/// Progress, error and confirmation notices under the fields.
fn notice_lines(app: &App, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if app.state.is_loading {
        let text = match app.form.mode {
            FormMode::SignIn => "Signing in...",
            FormMode::SignUp => "Creating account...",
        };
        lines.push(Line::from(Span::styled(text, Style::default().fg(theme.info))));
    }
    if let Some(error) = &app.state.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(theme.error),
        )));
    }
    if let Some(email) = &app.state.pending_verification {
        lines.push(Line::from(Span::styled(
            format!("Check {} to confirm your account, then sign in.", email),
            Style::default().fg(theme.success),
        )));
    }
    if !lines.is_empty() {
        lines.push(Line::from(""));
    }

    lines
}
