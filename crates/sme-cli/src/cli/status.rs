//! Status command: configuration, credentials, and service health.

use anyhow::Result;
use console::style;

use sme_core::credential::CredentialSource;
use sme_types::api::HealthStatus;
use sme_infra::config::config_path;
use sme_infra::credential::EnvCredentialSource;

use crate::state::AppState;

/// Display configuration, credential status, and the service's detailed
/// health report.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let config_file = config_path(&state.data_dir);
    let config_exists = tokio::fs::try_exists(&config_file).await.unwrap_or(false);

    let credential_present = state.credentials.bearer_token().is_some();
    let keychain_present = state.keychain.bearer_token().is_some();
    let env_present = EnvCredentialSource::new().bearer_token().is_some();

    let server = state.controller.health(true).await;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "config_file": config_file.display().to_string(),
            "config_file_exists": config_exists,
            "api_base_url": state.config.api_base_url,
            "default_source_type": state.config.default_source_type,
            "credential": {
                "present": credential_present,
                "keychain": keychain_present,
                "env": env_present,
            },
            "server": match &server {
                Ok(health) => serde_json::json!({"reachable": true, "health": health}),
                Err(e) => serde_json::json!({"reachable": false, "error": e.to_string()}),
            },
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let check_mark = |ok: bool| {
        if ok {
            format!("{}", style("✓").green())
        } else {
            format!("{}", style("✗").red())
        }
    };

    println!();
    println!("  {} SME Chat v{}", style("?").cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("  {}", style("── Config ──").dim());
    println!("  Data dir: {}", style(state.data_dir.display()).dim());
    println!(
        "  Config:   {} {}",
        style(config_file.display()).dim(),
        if config_exists { "" } else { "(defaults)" }
    );
    println!("  Server:   {}", style(&state.config.api_base_url).cyan());
    println!(
        "  Source:   {}",
        state.config.default_source_type.as_deref().unwrap_or("all")
    );
    println!();

    println!("  {}", style("── Credentials ──").dim());
    println!("  {} Token available", check_mark(credential_present));
    println!("  {} Keychain ({})", check_mark(keychain_present), state.keychain.service_name());
    println!("  {} SME_API_TOKEN", check_mark(env_present));
    println!();

    println!("  {}", style("── Server ──").dim());
    match &server {
        Ok(health) => {
            for (ok, line) in health_lines(health) {
                println!("  {} {line}", check_mark(ok));
            }
        }
        Err(e) => println!("  {} Unreachable: {e}", check_mark(false)),
    }
    println!();

    Ok(())
}

/// One `(ok, text)` row for the service and one for its vector store.
fn health_lines(health: &HealthStatus) -> Vec<(bool, String)> {
    let mut service = format!("Service {}", health.status);
    if let Some(version) = &health.version {
        service.push_str(&format!(" (v{version})"));
    }
    let mut lines = vec![(health.is_healthy(), service)];

    if let Some(db) = &health.vector_db {
        let db_status = db.status.as_deref().unwrap_or("unknown");
        let mut text = format!(
            "Vector store {} {db_status}",
            db.kind.as_deref().unwrap_or("(unknown type)")
        );
        if let Some(documents) = db.documents {
            text.push_str(&format!(", {documents} documents"));
        }
        if let Some(collection) = db.collection.as_deref().filter(|c| !c.is_empty()) {
            text.push_str(&format!(" in '{collection}'"));
        }
        if let Some(error) = &db.error {
            text.push_str(&format!(": {error}"));
        }
        lines.push((db_status == "connected", text));
    }
    lines
}
