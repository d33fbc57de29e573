//! Credential commands: login, logout.

use anyhow::{Context, Result};
use console::style;
use dialoguer::Password;
use secrecy::SecretString;

use crate::state::AppState;

/// Store an API token in the OS keychain.
///
/// # Examples
///
/// ```bash
/// # Secure prompt (recommended)
/// sme login
///
/// # Script/automation mode
/// sme login --token sme_...
/// ```
pub fn login(state: &AppState, token: Option<String>, json: bool) -> Result<()> {
    let token = match token {
        Some(t) => t,
        None => Password::new()
            .with_prompt(format!("API token for {}", style(&state.config.api_base_url).bold()))
            .interact()?,
    };
    let token = token.trim().to_string();
    if token.is_empty() {
        anyhow::bail!("Token is empty; nothing stored");
    }

    let masked = mask_token(&token);
    state
        .keychain
        .store(&SecretString::from(token))
        .context("Failed to store token in the OS keychain")?;

    if json {
        println!(
            "{}",
            serde_json::json!({"stored": true, "service": state.keychain.service_name(), "masked": masked})
        );
    } else {
        println!(
            "  {} Token stored in keychain '{}' ({})",
            style("✓").green().bold(),
            style(state.keychain.service_name()).bold(),
            masked
        );
    }

    Ok(())
}

/// Remove the stored API token.
pub fn logout(state: &AppState, json: bool) -> Result<()> {
    let removed = state
        .keychain
        .clear()
        .context("Failed to clear token from the OS keychain")?;

    if json {
        println!("{}", serde_json::json!({"removed": removed}));
    } else if removed {
        println!("  {} Token removed.", style("✓").green().bold());
    } else {
        println!("  {} No stored token.", style("i").blue().bold());
    }

    Ok(())
}

/// Show only the last four characters of a token.
pub fn mask_token(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        "****".to_string()
    } else {
        let tail: String = value.chars().skip(count - 4).collect();
        format!("****{tail}")
    }
}
