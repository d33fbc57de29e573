//! Push decoder for `data: <json>` line streams.
//!
//! Bytes arrive in arbitrary chunks. The decoder keeps the undecoded UTF-8
//! tail and the unterminated line between calls, so the events produced are
//! the same no matter where the transport split the body.

use sme_types::event::StreamEvent;

const DATA_PREFIX: &str = "data:";

/// Incremental decoder for one exchange's response body.
///
/// Not reusable: create a fresh decoder per exchange.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes of a multi-byte character still waiting for its continuation.
    utf8_tail: Vec<u8>,
    /// Decoded text of the current, not yet terminated line.
    line: String,
    /// Prefix of `line` already known to hold no newline.
    scanned: usize,
    malformed: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk and return the events it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.decode_utf8(chunk);

        let Some(offset) = self.line[self.scanned..].rfind('\n') else {
            self.scanned = self.line.len();
            return Vec::new();
        };
        let rest = self.line.split_off(self.scanned + offset + 1);
        let complete = std::mem::replace(&mut self.line, rest);
        self.scanned = self.line.len();

        // `lines` strips the `\n` and one `\r` before it.
        complete
            .lines()
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    /// End of stream: any unterminated line or dangling partial character is
    /// discarded.
    pub fn finish(&mut self) {
        if !self.line.is_empty() || !self.utf8_tail.is_empty() {
            tracing::debug!(
                partial_line_bytes = self.line.len(),
                partial_char_bytes = self.utf8_tail.len(),
                "discarding unterminated data at end of stream"
            );
        }
        self.line.clear();
        self.scanned = 0;
        self.utf8_tail.clear();
    }

    /// Number of `data:` lines whose payload failed to parse.
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    /// Append `chunk` to the line buffer, holding back an incomplete trailing
    /// character and replacing invalid sequences with U+FFFD.
    fn decode_utf8(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.line.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.line.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(invalid) => {
                            self.line.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[invalid..];
                        }
                        None => {
                            self.utf8_tail = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn parse_line(&mut self, line: &str) -> Option<StreamEvent> {
        let payload = line.strip_prefix(DATA_PREFIX)?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        if payload.trim().is_empty() {
            return None;
        }

        match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                self.malformed += 1;
                tracing::warn!(
                    error = %e,
                    payload_len = payload.len(),
                    "dropping malformed stream event"
                );
                None
            }
        }
    }
}
