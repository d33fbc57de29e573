//! Server-side conversation commands: list, show, delete.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use sme_types::api::ConversationSummary;
use sme_types::conversation::MessageRole;

use crate::state::AppState;

use super::chat::renderer::{source_lines, ChatRenderer};

/// List conversations stored on the server.
///
/// # Examples
///
/// ```bash
/// sme conversations
/// sme conversations --json
/// ```
pub async fn list_conversations(state: &mut AppState, json: bool) -> Result<()> {
    let conversations = state
        .controller
        .refresh_conversations()
        .await
        .context("Failed to list conversations")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }

    if conversations.is_empty() {
        println!();
        println!(
            "  {} No conversations yet. Start one with: {}",
            style("i").blue().bold(),
            style("sme chat").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for row in conversations.iter().map(summary_row) {
        let [id, title, messages, updated] = row;
        table.add_row(vec![
            Cell::new(id).fg(Color::Cyan),
            Cell::new(title),
            Cell::new(messages),
            Cell::new(updated).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} conversation{}",
        style(conversations.len()).bold(),
        if conversations.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Fetch a conversation and print its full history.
pub async fn show_conversation(state: &mut AppState, id: &str, json: bool) -> Result<()> {
    let local_id = state
        .controller
        .open_conversation(id)
        .await
        .with_context(|| format!("Failed to load conversation '{id}'"))?;
    let conversation = state
        .controller
        .store()
        .conversation(&local_id)
        .ok_or_else(|| anyhow::anyhow!("Conversation '{id}' missing after import"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(conversation)?);
        return Ok(());
    }

    let renderer = ChatRenderer::new(None);

    println!();
    println!(
        "  {} {}",
        style(conversation.display_title()).cyan().bold(),
        style(format!("({id})")).dim()
    );
    println!(
        "  {}",
        style(format!(
            "{} messages, updated {}",
            conversation.messages.len(),
            format_time(Some(conversation.updated_at))
        ))
        .dim()
    );

    for message in &conversation.messages {
        println!();
        match message.role {
            MessageRole::User => {
                println!("  {}", style("You").green().bold());
                for line in message.content.lines() {
                    println!("  {line}");
                }
            }
            MessageRole::Assistant => {
                println!("  {}", style("Assistant").cyan().bold());
                for line in renderer.render_markdown(&message.content).trim_end().lines() {
                    println!("  {line}");
                }
                for line in source_lines(message.sources.as_deref().unwrap_or_default()) {
                    println!("  {}", style(line).dim());
                }
            }
        }
    }
    println!();

    Ok(())
}

/// Delete a conversation after confirmation.
pub async fn delete_conversation(state: &mut AppState, id: &str, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete conversation '{}'?",
                style(id).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.red} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Deleting {id}..."));
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let result = state.controller.delete_conversation(id).await;
    spinner.finish_and_clear();
    result.with_context(|| format!("Failed to delete conversation '{id}'"))?;

    if json {
        println!("{}", serde_json::json!({"deleted": true, "id": id}));
    } else {
        println!("  {} Conversation '{}' deleted.", style("✓").red().bold(), id);
    }

    Ok(())
}

/// Table cells for one summary: id, title, message count, last update.
fn summary_row(summary: &ConversationSummary) -> [String; 4] {
    let title = summary
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("(untitled)");
    let title = if title.chars().count() > 40 {
        format!("{}...", title.chars().take(37).collect::<String>())
    } else {
        title.to_string()
    };

    [
        summary.id.clone(),
        title,
        summary
            .message_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string()),
        format_time(summary.updated_at.or(summary.created_at)),
    ]
}

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(title: Option<&str>) -> ConversationSummary {
        ConversationSummary {
            id: "conv-1".to_string(),
            title: title.map(str::to_string),
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()),
            updated_at: None,
            message_count: Some(4),
        }
    }

    #[test]
    fn test_summary_row_falls_back_to_created_at() {
        let row = summary_row(&summary(Some("Deploy checklist")));
        assert_eq!(row, [
            "conv-1".to_string(),
            "Deploy checklist".to_string(),
            "4".to_string(),
            "2024-05-01 09:30".to_string(),
        ]);
    }

    #[test]
    fn test_summary_row_untitled_and_long_titles() {
        assert_eq!(summary_row(&summary(Some("  ")))[1], "(untitled)");
        assert_eq!(summary_row(&summary(None))[1], "(untitled)");

        let long = "x".repeat(50);
        let title = &summary_row(&summary(Some(&long)))[1];
        assert_eq!(title.chars().count(), 40);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_format_time_missing() {
        assert_eq!(format_time(None), "-");
    }
}
