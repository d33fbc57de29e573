//! Slash command parsing for the chat loop.

use console::style;

use sme_types::config::{is_known_source_type, KNOWN_SOURCE_TYPES};

#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    Clear,
    Exit,
    /// Start a fresh conversation on the next message.
    New,
    /// Show the messages of the active conversation.
    History,
    /// Change the source filter. `None` clears it.
    Source(Option<String>),
    /// Print the current source filter.
    ShowSource,
    /// Unknown command or bad argument, with an explanation.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd.to_lowercase(), Some(arg.trim())),
        None => (trimmed.to_lowercase(), None),
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/new" => ChatCommand::New,
        "/history" => ChatCommand::History,
        "/source" => parse_source(arg),
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

fn parse_source(arg: Option<&str>) -> ChatCommand {
    let Some(arg) = arg.filter(|a| !a.is_empty()) else {
        return ChatCommand::ShowSource;
    };
    let kind = arg.to_lowercase();
    if kind == "all" {
        ChatCommand::Source(None)
    } else if is_known_source_type(&kind) {
        ChatCommand::Source(Some(kind))
    } else {
        ChatCommand::Unknown(format!(
            "/source expects one of: {}, all",
            KNOWN_SOURCE_TYPES.join(", ")
        ))
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}     {}", style("/help").cyan(), "Show this help message");
    println!("  {}      {}", style("/new").cyan(), "Start a new conversation");
    println!("  {}  {}", style("/history").cyan(), "Show this conversation so far");
    println!(
        "  {}   {}",
        style("/source").cyan(),
        "Filter sources: confluence, github, or all"
    );
    println!("  {}    {}", style("/clear").cyan(), "Clear the screen");
    println!("  {}     {}", style("/exit").cyan(), "End the chat session");
    println!();
    println!(
        "  {}",
        style("Ctrl+C stops the current answer, Ctrl+D exits").dim()
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(parse("/h"), Some(ChatCommand::Help));
        assert_eq!(parse("/QUIT"), Some(ChatCommand::Exit));
        assert_eq!(parse("/cls"), Some(ChatCommand::Clear));
        assert_eq!(parse("  /new  "), Some(ChatCommand::New));
        assert_eq!(parse("/history"), Some(ChatCommand::History));
    }

    #[test]
    fn test_parse_source() {
        assert_eq!(
            parse("/source GitHub"),
            Some(ChatCommand::Source(Some("github".to_string())))
        );
        assert_eq!(parse("/source all"), Some(ChatCommand::Source(None)));
        assert_eq!(parse("/source"), Some(ChatCommand::ShowSource));
        assert!(matches!(parse("/source jira"), Some(ChatCommand::Unknown(_))));
    }

    #[test]
    fn test_parse_not_command() {
        assert_eq!(parse("how does replication work?"), None);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(parse("/foo bar"), Some(ChatCommand::Unknown("/foo".to_string())));
    }
}
