//! Main chat loop orchestration.
//!
//! Reads lines, handles slash commands, and runs each question as one
//! exchange: dispatch, then drive the response stream while rendering the
//! placeholder's updates from the store change feed. Ctrl+C while an answer
//! streams cancels that exchange only.

use std::time::{Duration, Instant};

use anyhow::Context;
use console::style;
use crossterm::style::Color;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use sme_core::session::ExchangeOutcome;
use sme_core::store::StoreChange;
use sme_types::conversation::{MessageId, MessageRole};
use sme_types::error::SubmitError;

use crate::state::AppState;

use super::banner::{print_welcome_banner, short_id};
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{ChatRenderer, LiveAnswer};

const ASSISTANT_LABEL: &str = "Assistant";

/// Run the interactive chat loop.
pub async fn run_chat_loop(
    state: &mut AppState,
    source: Option<String>,
    resume: Option<String>,
) -> anyhow::Result<()> {
    let mut source = source;

    let resumed = match resume.as_deref() {
        Some(remote_id) => {
            let local_id = state
                .controller
                .open_conversation(remote_id)
                .await
                .with_context(|| format!("Could not resume conversation '{remote_id}'"))?;
            let title = state
                .controller
                .store()
                .conversation(&local_id)
                .map(|c| c.display_title().to_string())
                .unwrap_or_default();
            Some((title, remote_id.to_string()))
        }
        None => None,
    };

    print_welcome_banner(
        &state.config.api_base_url,
        source.as_deref(),
        resumed.as_ref().map(|(title, id)| (title.as_str(), id.as_str())),
    );
    if resumed.is_some() {
        print_history(state);
    }

    let mut changes = state.controller.subscribe();
    let renderer = ChatRenderer::new(Some(Color::Cyan));

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }

                if let Some(cmd) = commands::parse(&text) {
                    match cmd {
                        ChatCommand::Help => commands::print_help(),
                        ChatCommand::Clear => chat_input.clear(),
                        ChatCommand::Exit => {
                            println!("\n  {}", style("Session ended.").dim());
                            break;
                        }
                        ChatCommand::New => match state.controller.start_new_conversation() {
                            Ok(()) => println!(
                                "\n  {} New conversation. Your next message starts it.\n",
                                style("*").cyan().bold()
                            ),
                            Err(e) => println!("\n  {} {e}\n", style("!").yellow().bold()),
                        },
                        ChatCommand::History => print_history(state),
                        ChatCommand::Source(kind) => {
                            source = kind;
                            println!(
                                "\n  {} Source filter: {}\n",
                                style("*").cyan().bold(),
                                style(source.as_deref().unwrap_or("all")).bold()
                            );
                        }
                        ChatCommand::ShowSource => {
                            println!(
                                "\n  Source filter: {}\n",
                                style(source.as_deref().unwrap_or("all")).bold()
                            );
                        }
                        ChatCommand::Unknown(detail) => {
                            println!(
                                "\n  {} Unknown command: {}. Type /help for available commands.\n",
                                style("?").yellow().bold(),
                                style(detail).dim()
                            );
                        }
                    }
                    continue;
                }

                run_exchange(
                    state,
                    &mut chat_input,
                    &mut changes,
                    &renderer,
                    &text,
                    source.as_deref(),
                )
                .await;
            }
        }
    }

    chat_input.flush();
    Ok(())
}

/// Run one question through the controller and render the result.
async fn run_exchange(
    state: &mut AppState,
    chat_input: &mut ChatInput,
    changes: &mut UnboundedReceiver<StoreChange>,
    renderer: &ChatRenderer,
    text: &str,
    source: Option<&str>,
) {
    let pending = match state.controller.dispatch(text, source) {
        Ok(pending) => pending,
        Err(SubmitError::EmptyInput) => return,
        Err(e @ SubmitError::Busy) => {
            println!("\n  {} {e}\n", style("!").yellow().bold());
            return;
        }
    };
    let message_id = pending.message_id();

    let spinner = thinking_spinner();
    let mut live = LiveAnswer::new(ASSISTANT_LABEL);
    let cancel = CancellationToken::new();
    let start_time = Instant::now();

    let outcome = {
        let drive = state.controller.drive(pending, cancel.clone());
        tokio::pin!(drive);

        loop {
            tokio::select! {
                biased;

                Some(change) = changes.recv() => {
                    show_change(&change, message_id, &mut live, &spinner);
                }
                outcome = &mut drive => break outcome,
                event = chat_input.read_line(), if !cancel.is_cancelled() => match event {
                    InputEvent::Interrupted | InputEvent::Eof => cancel.cancel(),
                    InputEvent::Message(_) => {
                        tracing::debug!("input ignored while an answer is streaming");
                    }
                },
                _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => cancel.cancel(),
            }
        }
    };

    while let Ok(change) = changes.try_recv() {
        show_change(&change, message_id, &mut live, &spinner);
    }
    spinner.finish_and_clear();

    let elapsed = start_time.elapsed();
    match &outcome {
        ExchangeOutcome::Completed { conversation_id, message_id } => {
            let message = state
                .controller
                .store()
                .conversation(conversation_id)
                .and_then(|c| c.message(message_id));
            if let Some(message) = message {
                renderer.finish_live(&live, &message.content);
                renderer.print_sources(message.sources.as_deref().unwrap_or_default());
            }
            print_footer(elapsed, source);
        }
        ExchangeOutcome::Failed { error, .. } => {
            if live.is_started() {
                println!();
            }
            let shown = state
                .controller
                .session()
                .error
                .unwrap_or_else(|| error.user_message());
            eprintln!("\n  {} {shown}", style("!").red().bold());
            if error.is_authentication() {
                eprintln!("  {}", style("Run `sme login` to store a new token.").dim());
            } else {
                eprintln!("  {}", style("Type a message to retry, /exit to quit.").dim());
            }
            println!();
        }
        ExchangeOutcome::Cancelled { .. } => {
            if live.is_started() {
                println!();
            }
            println!("\n  {}\n", style("Answer stopped.").dim());
        }
    }
}

/// Apply one store change to the live view of the streaming placeholder.
fn show_change(change: &StoreChange, target: MessageId, live: &mut LiveAnswer, spinner: &ProgressBar) {
    if let StoreChange::MessageUpdated { message, .. } = change {
        if message.id == target && !message.content.is_empty() {
            if !live.is_started() {
                spinner.finish_and_clear();
            }
            live.update(&message.content);
        }
    }
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("searching sources...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn print_footer(elapsed: Duration, source: Option<&str>) {
    println!(
        "\n  {} {:.1}s {} {}\n",
        style("|").dim(),
        style(elapsed.as_secs_f64()).dim(),
        style("\u{00b7}").dim(),
        style(source.unwrap_or("all sources")).dim(),
    );
}

/// Print the active conversation, one preview line per message.
fn print_history(state: &AppState) {
    let Some(conversation) = state.controller.store().active_conversation() else {
        println!("\n  {}\n", style("No messages yet.").dim());
        return;
    };

    let remote_id = state.controller.remote_id(&conversation.id);
    println!();
    println!(
        "  {} {}",
        style(conversation.display_title()).bold(),
        style(format!("({})", short_id(&remote_id))).dim()
    );
    for message in &conversation.messages {
        let label = match message.role {
            MessageRole::User => style("You").green().bold(),
            MessageRole::Assistant => style(ASSISTANT_LABEL).cyan().bold(),
        };
        println!("  {label} {}", preview(&message.content, 100));
    }
    println!();
}

/// Single-line preview of `content`, cut at `max_chars` on a char boundary.
fn preview(content: &str, max_chars: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}
