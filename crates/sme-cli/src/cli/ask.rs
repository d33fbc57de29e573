//! One-shot question: `sme ask "<question>"`.
//!
//! Streams the raw answer to stdout (pipe friendly), then lists sources.
//! With `--json` nothing is streamed; the finished message is printed as
//! JSON instead.
//!
//! If the server's final answer does not extend what was already streamed,
//! streaming stops and the final answer is printed in full once complete.

use std::io::Write;

use anyhow::Result;
use console::style;
use tokio_util::sync::CancellationToken;

use sme_core::session::ExchangeOutcome;
use sme_core::store::StoreChange;
use sme_types::conversation::MessageId;

use crate::state::AppState;

use super::chat::renderer::source_lines;

pub async fn ask(state: &mut AppState, question: &str, source: Option<String>, json: bool) -> Result<()> {
    let mut changes = state.controller.subscribe();
    let pending = state.controller.dispatch(question, source.as_deref())?;
    let message_id = pending.message_id();
    let cancel = CancellationToken::new();
    let mut echo = AnswerEcho::default();

    let outcome = {
        let drive = state.controller.drive(pending, cancel.clone());
        tokio::pin!(drive);

        loop {
            tokio::select! {
                biased;

                Some(change) = changes.recv() => {
                    if !json {
                        echo.observe(&change, message_id);
                    }
                }
                outcome = &mut drive => break outcome,
                _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => cancel.cancel(),
            }
        }
    };
    if !json {
        while let Ok(change) = changes.try_recv() {
            echo.observe(&change, message_id);
        }
        if !echo.printed.is_empty() {
            println!();
        }
    }

    let remote_id = state.controller.remote_id(&outcome.conversation_id());
    match outcome {
        ExchangeOutcome::Completed { conversation_id, message_id } => {
            let message = state
                .controller
                .store()
                .conversation(&conversation_id)
                .and_then(|c| c.message(&message_id))
                .ok_or_else(|| anyhow::anyhow!("answer missing from the conversation store"))?;

            if json {
                let body = serde_json::json!({
                    "conversation_id": remote_id,
                    "answer": message.content,
                    "sources": message.sources.clone().unwrap_or_default(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
                return Ok(());
            }

            if let Some(text) = echo.correction(&message.content) {
                if !echo.printed.is_empty() {
                    println!();
                }
                println!("{text}");
            }

            let sources = message.sources.as_deref().unwrap_or_default();
            if !sources.is_empty() {
                println!();
                println!("{}", style("Sources").bold());
                for line in source_lines(sources) {
                    println!("{line}");
                }
            }
            eprintln!("{}", style(format!("conversation: {remote_id}")).dim());
            Ok(())
        }
        ExchangeOutcome::Failed { error, .. } => Err(anyhow::anyhow!(error.user_message())),
        ExchangeOutcome::Cancelled { .. } => anyhow::bail!("Answer cancelled"),
    }
}

/// The part of the answer already written to stdout.
#[derive(Debug, Default)]
struct AnswerEcho {
    printed: String,
    /// The answer was rewritten so it no longer starts with `printed`.
    diverged: bool,
}

impl AnswerEcho {
    /// Print the new part of the target message, if the change carries one.
    fn observe(&mut self, change: &StoreChange, target: MessageId) {
        let StoreChange::MessageUpdated { message, .. } = change else {
            return;
        };
        if message.id != target {
            return;
        }
        if let Some(delta) = self.advance(&message.content) {
            print!("{delta}");
            let _ = std::io::stdout().flush();
        }
    }

    /// Record a new snapshot of the answer and return the text still to print.
    fn advance(&mut self, content: &str) -> Option<String> {
        if self.diverged {
            return None;
        }
        match content.strip_prefix(self.printed.as_str()) {
            Some("") => None,
            Some(delta) => {
                let delta = delta.to_string();
                self.printed.push_str(&delta);
                Some(delta)
            }
            None => {
                tracing::debug!("answer rewritten mid-stream; printing it in full at the end");
                self.diverged = true;
                None
            }
        }
    }

    /// The final answer, when what was streamed does not match it.
    fn correction<'a>(&self, final_text: &'a str) -> Option<&'a str> {
        (self.printed != final_text).then_some(final_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sme_types::conversation::{ConversationId, Message, MessageRole};

    fn updated(id: MessageId, content: &str) -> StoreChange {
        StoreChange::MessageUpdated {
            conversation_id: ConversationId::new(),
            message: Message {
                id,
                role: MessageRole::Assistant,
                content: content.to_string(),
                sources: None,
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_growing_answer_prints_only_new_text() {
        let mut echo = AnswerEcho::default();
        assert_eq!(echo.advance("Rep").as_deref(), Some("Rep"));
        assert_eq!(echo.advance("Replica").as_deref(), Some("lica"));
        assert_eq!(echo.advance("Replica"), None);
        assert_eq!(echo.advance("Replication").as_deref(), Some("tion"));
        assert_eq!(echo.correction("Replication"), None);
    }

    #[test]
    fn test_rewritten_answer_is_printed_in_full_at_the_end() {
        let mut echo = AnswerEcho::default();
        for content in ["Rep", "Replica", "Replication"] {
            echo.advance(content);
        }
        assert_eq!(echo.advance("Copies data."), None);
        assert_eq!(echo.printed, "Replication");
        assert_eq!(echo.correction("Copies data."), Some("Copies data."));
    }

    #[test]
    fn test_nothing_more_is_streamed_after_a_rewrite() {
        let mut echo = AnswerEcho::default();
        echo.advance("Hello world");
        echo.advance("Bye");
        assert_eq!(echo.advance("Bye now"), None);
        assert_eq!(echo.correction("Bye now"), Some("Bye now"));
    }

    #[test]
    fn test_observe_ignores_other_messages() {
        let target = MessageId::new();
        let mut echo = AnswerEcho::default();
        echo.observe(&updated(MessageId::new(), "someone else"), target);
        assert!(echo.printed.is_empty());
        echo.observe(&updated(target, "mine"), target);
        assert_eq!(echo.printed, "mine");
    }
}
