//! Profile command.

use crate::output::{self, OutputFormat};
use anyhow::Result;
use ragmaster_auth::SessionStore;
use serde_json::json;

/// Load and print the profile and organization of the signed-in user.
pub async fn profile(store: &SessionStore, format: &OutputFormat) -> Result<()> {
    if !store.snapshot().has_identity() {
        output::print_error("Not signed in. Run 'ragmaster login' first.", format);
        return Ok(());
    }

    let result = store.load_profile().await;
    store.flush().await;

    if let Err(e) = result {
        output::print_error(&e.user_message(), format);
        return Ok(());
    }

    let state = store.snapshot();
    let (Some(profile), Some(organization)) = (&state.profile, &state.organization) else {
        output::print_error("Profile not available", format);
        return Ok(());
    };

    match format {
        OutputFormat::Text => {
            output::print_heading("Profile");
            output::print_row("Name", &profile.full_name);
            output::print_row("Role", profile.role.as_str());
            if let Some(avatar_url) = &profile.avatar_url {
                output::print_row("Avatar", avatar_url);
            }
            output::print_row("Member since", &profile.created_at.format("%Y-%m-%d").to_string());

            output::print_heading("Organization");
            output::print_row("Name", &organization.name);
            output::print_row("Slug", &organization.slug);
            output::print_row("ID", &organization.id);
        }
        OutputFormat::Json => output::print_json(&json!({
            "profile": profile,
            "organization": organization,
        })),
    }

    Ok(())
}
