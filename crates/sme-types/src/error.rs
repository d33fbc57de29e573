use thiserror::Error;

/// Text placed in an assistant placeholder that failed before receiving any content.
pub const APOLOGY_TEXT: &str =
    "Sorry, I encountered an error while generating a response. Please try again.";

/// Text placed in an assistant placeholder whose exchange was cancelled before any content.
pub const CANCELLED_TEXT: &str = "Response cancelled.";

/// Errors from talking to the generation service.
///
/// Only these reach the session's user-visible error field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("authentication rejected (HTTP {status})")]
    AuthenticationRejected { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("conversation not found")]
    NotFound,

    #[error("configuration error: {0}")]
    Config(String),

    /// A conversation operation was attempted while an answer is streaming.
    #[error("an answer is already being generated")]
    Busy,
}

impl ChatError {
    /// Map a non-success HTTP status to the right error class.
    ///
    /// A 404 stays a plain [`ChatError::Status`]; only conversation lookups
    /// treat it as [`ChatError::NotFound`] (see [`ChatError::conversation_lookup`]).
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ChatError::AuthenticationRejected { status },
            _ => ChatError::Status { status, body },
        }
    }

    /// Reclassify a 404 from a conversation route as a missing conversation.
    pub fn conversation_lookup(self) -> Self {
        match self {
            ChatError::Status { status: 404, .. } => ChatError::NotFound,
            other => other,
        }
    }

    /// Whether this failure should invalidate the stored credential.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            ChatError::AuthenticationRequired | ChatError::AuthenticationRejected { .. }
        )
    }

    /// Human-readable message for the session error field.
    pub fn user_message(&self) -> String {
        if self.is_authentication() {
            "Your session has expired or you are not signed in. Please sign in again.".to_string()
        } else {
            format!("Failed to get a response: {self}")
        }
    }
}

/// Reasons a submission is rejected before anything is dispatched.
///
/// These never mutate state and never reach the session error field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyInput,

    #[error("an answer is already being generated")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert_eq!(
            ChatError::from_status(401, String::new()),
            ChatError::AuthenticationRejected { status: 401 }
        );
        assert!(ChatError::from_status(403, String::new()).is_authentication());
        assert_eq!(
            ChatError::from_status(404, "Not Found".to_string()),
            ChatError::Status {
                status: 404,
                body: "Not Found".to_string()
            }
        );
        assert_eq!(
            ChatError::from_status(500, "boom".to_string()).to_string(),
            "HTTP 500: boom"
        );
    }

    #[test]
    fn test_conversation_lookup_only_touches_404() {
        assert_eq!(
            ChatError::from_status(404, String::new()).conversation_lookup(),
            ChatError::NotFound
        );
        assert_eq!(
            ChatError::from_status(500, "boom".to_string()).conversation_lookup(),
            ChatError::from_status(500, "boom".to_string())
        );
        assert!(
            ChatError::from_status(401, String::new())
                .conversation_lookup()
                .is_authentication()
        );
    }

    #[test]
    fn test_user_message() {
        assert!(
            ChatError::AuthenticationRequired
                .user_message()
                .contains("sign in again")
        );
        assert_eq!(
            ChatError::Stream("model overloaded".to_string()).user_message(),
            "Failed to get a response: stream error: model overloaded"
        );
    }

    #[test]
    fn test_submit_error_display() {
        assert_eq!(SubmitError::EmptyInput.to_string(), "message is empty");
    }
}
