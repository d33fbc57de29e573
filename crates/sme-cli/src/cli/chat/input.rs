//! Async readline input for the chat loop.
//!
//! Wraps `rustyline_async::Readline` so EOF (Ctrl+D) and interrupt (Ctrl+C)
//! arrive as events. The reader stays usable while an answer streams, which
//! is how Ctrl+C reaches the running exchange.

use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

#[derive(Debug, PartialEq)]
pub enum InputEvent {
    /// A submitted line, already trimmed.
    Message(String),
    /// Ctrl+D, or the terminal went away.
    Eof,
    /// Ctrl+C.
    Interrupted,
}

pub struct ChatInput {
    rl: Readline,
}

impl ChatInput {
    /// Returns the reader and a `SharedWriter` that prints without
    /// clobbering the prompt.
    pub fn new(prompt: String) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, stdout) = Readline::new(prompt)?;
        Ok((Self { rl }, stdout))
    }

    /// Read one line. Cancel-safe: dropping the future loses no typed input.
    pub async fn read_line(&mut self) -> InputEvent {
        let event = self.rl.readline().await;
        let event = into_input_event(event);
        if let InputEvent::Message(line) = &event {
            if !line.is_empty() {
                self.rl.add_history_entry(line.clone());
            }
        }
        event
    }

    pub fn clear(&mut self) {
        let _ = self.rl.clear();
    }

    /// Restore the terminal before exiting.
    pub fn flush(&mut self) {
        let _ = self.rl.flush();
    }
}

fn into_input_event(event: Result<ReadlineEvent, ReadlineError>) -> InputEvent {
    match event {
        Ok(ReadlineEvent::Line(line)) => InputEvent::Message(line.trim().to_string()),
        Ok(ReadlineEvent::Eof) => InputEvent::Eof,
        Ok(ReadlineEvent::Interrupted) => InputEvent::Interrupted,
        Err(e) => {
            tracing::debug!(error = %e, "readline failed; treating as EOF");
            InputEvent::Eof
        }
    }
}
