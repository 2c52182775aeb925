//! RAG Master CLI - sign in, manage the local session and open the terminal UI.

mod commands;
mod context;
mod output;
mod tui;

use clap::{Parser, Subcommand};
use context::AppContext;
use std::path::PathBuf;
use tracing::debug;

/// RAG Master CLI - Authenticate and manage your workspace session.
#[derive(Parser)]
#[command(name = "ragmaster")]
#[command(about = "RAG Master CLI for authentication and session management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Use terminal-adaptive colors instead of the RAG Master theme (terminal UI only)
    #[arg(long)]
    terminal_colors: bool,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for configuration, session storage and logs
    #[arg(long, global = true, env = "RAGMASTER_HOME")]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with email and password
    Login,

    /// Create an account and its organization
    Signup {
        /// Your full name
        #[arg(short, long)]
        name: String,

        /// Organization name (defaults to "Personal")
        #[arg(short, long)]
        organization: Option<String>,
    },

    /// Logout and clear session
    Logout,

    /// Check authentication status
    Status,

    /// Show your profile and organization
    Profile,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (paths, config) = match context::load_config(cli.base_dir.clone()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let level = ragmaster_config::parse_level(cli.log_level.as_deref().unwrap_or(&config.log_level))
        .to_string()
        .to_lowercase();

    // The terminal UI owns the screen, so it logs to the file only.
    let (service, also_stderr) = if cli.command.is_some() {
        ("cli", true)
    } else {
        ("tui", false)
    };
    ragmaster_config::init_logging(service, &level, &paths, also_stderr);
    debug!(base_dir = %paths.base_dir().display(), "Starting");

    let ctx = match AppContext::open(&paths, &config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Login) => commands::login(&ctx.store, &cli.format).await,
        Some(Commands::Signup { name, organization }) => {
            commands::signup(&ctx.store, &name, organization.as_deref(), &cli.format).await
        }
        Some(Commands::Logout) => commands::logout(&ctx.store, &cli.format).await,
        Some(Commands::Status) => commands::status(&ctx.store, &cli.format).await,
        Some(Commands::Profile) => commands::profile(&ctx.store, &cli.format).await,
        None => {
            let theme_mode = if cli.terminal_colors {
                tui::ThemeMode::Terminal
            } else {
                tui::ThemeMode::RagMaster
            };
            tui::run(ctx, theme_mode).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
