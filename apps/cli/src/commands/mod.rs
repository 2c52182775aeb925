//! CLI command implementations.

mod auth;
mod profile;

pub use auth::{login, logout, signup, status};
pub use profile::profile;

use anyhow::{bail, Result};
use std::io::{self, Write};

/// Prompt for a line of input on stdin.
fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

/// Prompt for email and hidden password.
fn prompt_credentials() -> Result<(String, String)> {
    let email = prompt_line("Email")?;
    if email.is_empty() {
        bail!("Email is required");
    }

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }

    Ok((email, password))
}
