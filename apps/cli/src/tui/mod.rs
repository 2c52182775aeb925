//! Ratatui-based terminal UI for RAG Master.
//!
//! Routes between three views from the session store snapshot:
//! - Landing: shown when signed out
//! - Auth: sign-in / sign-up form
//! - Dashboard: identity, profile and organization of the signed-in user

mod app;
mod components;
mod event;
pub mod theme;
mod ui;

use app::App;
pub use theme::ThemeMode;

use crate::context::AppContext;
use anyhow::Result;
use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, panic};
use tracing::{debug, info};

/// Restore terminal to normal state.
/// Called both on normal exit and on panic. Errors are ignored so a partially
/// set up terminal is still restored as far as possible.
fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
}

/// Install a panic hook that restores the terminal before displaying the panic message.
fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));
}

/// Run the TUI until the user quits.
pub async fn run(ctx: AppContext, theme_mode: ThemeMode) -> Result<()> {
    install_panic_hook();

    let result = run_with_terminal(&ctx, theme_mode).await;

    restore_terminal();
    ctx.store.flush().await;

    result
}

async fn run_with_terminal(ctx: &AppContext, theme_mode: ThemeMode) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let _auto_refresh = ctx.backend.start_auto_refresh();
    let mut app = App::new(ctx.store.clone(), theme_mode);
    run_app(&mut terminal, &mut app).await
}

/// Main application loop.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut events = app.store.subscribe_backend_events();
    info!("Terminal UI started");

    loop {
        let applied = app.store.drain_events(&mut events);
        if applied > 0 {
            debug!(count = applied, "Applied backend auth events");
        }

        app.sync_state();
        terminal.draw(|f| ui::render(f, app))?;

        if event::handle_events(app)? {
            break;
        }
    }

    events.close();
    info!("Terminal UI stopped");
    Ok(())
}
