//! Keyboard event handling for the TUI.

use super::app::{App, FormMode};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ragmaster_auth::View;
use std::time::Duration;

/// Handle input events. Returns true if the app should quit.
pub fn handle_events(app: &mut App) -> Result<bool> {
    if event::poll(Duration::from_millis(100))? {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.clear_status_message();
                handle_key_event(app, key);
            }
        }
    }

    Ok(app.should_quit)
}

/// Dispatch a key press to the handler for the current view.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }

    match app.view() {
        View::Landing => handle_landing(app, key),
        View::Auth => handle_auth_form(app, key),
        View::Dashboard => handle_dashboard(app, key),
    }
}

fn handle_landing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Enter | KeyCode::Char('s') => app.open_auth(FormMode::SignIn),
        KeyCode::Char('u') => app.open_auth(FormMode::SignUp),
        _ => {}
    }
}

fn handle_auth_form(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('n') {
            app.form.toggle_mode();
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.close_auth(),
        KeyCode::Enter => app.submit_form(),
        KeyCode::Tab | KeyCode::Down => app.form.next_field(),
        KeyCode::BackTab | KeyCode::Up => app.form.prev_field(),
        KeyCode::Backspace => app.form.backspace(),
        KeyCode::Char(c) => app.form.input(c),
        _ => {}
    }
}

fn handle_dashboard(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('o') => app.sign_out(),
        KeyCode::Char('r') => app.reload_profile(),
        KeyCode::Char('x') | KeyCode::Esc => app.clear_error(),
        _ => {}
    }
}
