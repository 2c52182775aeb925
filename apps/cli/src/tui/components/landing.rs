//! Landing view shown before sign-in.

use crate::tui::app::App;
use crate::tui::ui::centered_rect;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let inner = centered_rect(60, 9, area);

    let lines = vec![
        Line::from(Span::styled(
            "RAG Master",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Retrieval-augmented generation for your team's documents.",
            Style::default().fg(theme.text_secondary),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("[Enter]", Style::default().fg(theme.text_muted)),
            Span::styled(" Sign in   ", Style::default().fg(theme.text)),
            Span::styled("[u]", Style::default().fg(theme.text_muted)),
            Span::styled(" Create account", Style::default().fg(theme.text)),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}
