//! Authentication commands.

use super::prompt_credentials;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use ragmaster_auth::{AuthState, SessionStore, SignUpOutcome};
use serde_json::json;

fn display_name(state: &AuthState) -> String {
    state
        .identity
        .as_ref()
        .and_then(|identity| identity.email.clone().or_else(|| Some(identity.id.clone())))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Sign in with email and password.
pub async fn login(store: &SessionStore, format: &OutputFormat) -> Result<()> {
    let state = store.snapshot();
    if state.has_identity() {
        output::print_success(
            &format!("Already signed in as {}", display_name(&state)),
            format,
        );
        return Ok(());
    }

    let (email, password) = match prompt_credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            output::print_error(&e.to_string(), format);
            return Ok(());
        }
    };

    println!("Signing in...");
    let result = store.sign_in(&email, &password).await;
    store.flush().await;

    match result {
        Ok(()) => {
            let state = store.snapshot();
            let mut message = format!("Signed in as {}", display_name(&state));
            if let Some(organization) = &state.organization {
                message.push_str(&format!(" ({})", organization.name));
            }
            output::print_success(&message, format);
            if let Some(error) = &state.error {
                output::print_error(error, format);
            }
        }
        Err(e) => output::print_error(&e.user_message(), format),
    }

    Ok(())
}

/// Create an account.
pub async fn signup(
    store: &SessionStore,
    name: &str,
    organization: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    if store.snapshot().has_identity() {
        output::print_error("Already signed in. Run 'ragmaster logout' first.", format);
        return Ok(());
    }

    let (email, password) = match prompt_credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            output::print_error(&e.to_string(), format);
            return Ok(());
        }
    };

    println!("Creating account...");
    let result = store.sign_up(&email, &password, name, organization).await;
    store.flush().await;

    match result {
        Ok(SignUpOutcome::Created) => output::print_success(
            &format!("Account created. Signed in as {}", display_name(&store.snapshot())),
            format,
        ),
        Ok(SignUpOutcome::PendingVerification) => output::print_success(
            &format!(
                "Check {} to confirm your account, then run 'ragmaster login'",
                email
            ),
            format,
        ),
        Err(e) => output::print_error(&e.user_message(), format),
    }

    Ok(())
}

/// Sign out and clear the local session.
pub async fn logout(store: &SessionStore, format: &OutputFormat) -> Result<()> {
    if !store.snapshot().has_identity() {
        output::print_success("Not signed in", format);
        return Ok(());
    }

    let result = store.sign_out().await;
    store.flush().await;

    match result {
        Ok(()) => output::print_success("Signed out successfully", format),
        Err(e) => output::print_error(&e.user_message(), format),
    }

    Ok(())
}

/// Show the local session.
pub async fn status(store: &SessionStore, format: &OutputFormat) -> Result<()> {
    let state = store.snapshot();
    let expires_at = state
        .session
        .as_ref()
        .and_then(|s| s.expires_at_utc())
        .map(|t| t.to_rfc3339());

    match format {
        OutputFormat::Text => {
            let Some(identity) = &state.identity else {
                println!("Auth:          not signed in");
                return Ok(());
            };
            println!("Auth:          signed in");
            println!("User ID:       {}", identity.id);
            println!(
                "Email:         {}",
                identity.email.as_deref().unwrap_or("(none)")
            );
            println!(
                "Expires:       {}",
                expires_at.as_deref().unwrap_or("unknown")
            );
            match (&state.organization, &state.profile) {
                (Some(organization), Some(profile)) => {
                    println!("Organization:  {}", organization.name);
                    println!("Role:          {}", profile.role);
                }
                _ => println!("Organization:  not loaded"),
            }
        }
        OutputFormat::Json => {
            let value = json!({
                "signed_in": state.has_identity(),
                "user_id": state.identity.as_ref().map(|i| &i.id),
                "email": state.identity.as_ref().and_then(|i| i.email.as_ref()),
                "expires_at": expires_at,
                "organization": state.organization.as_ref().map(|o| &o.name),
                "role": state.profile.as_ref().map(|p| p.role),
            });
            output::print_json(&value);
        }
    }

    Ok(())
}
