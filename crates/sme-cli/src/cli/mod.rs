//! CLI command definitions for the `sme` binary.
//!
//! Uses clap derive macros for argument parsing. Every command except
//! `completions` runs against an initialized [`crate::state::AppState`].

pub mod ask;
pub mod auth;
pub mod chat;
pub mod conversation;
pub mod status;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Ask questions against your team's knowledge sources.
#[derive(Parser)]
#[command(name = "sme", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Base URL of the chat service (overrides config.toml).
    #[arg(long, global = true, env = "SME_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token for this invocation only (never persisted).
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session.
    Chat {
        /// Restrict retrieval to one source kind (confluence, github).
        #[arg(long, short)]
        source: Option<String>,

        /// Resume a server-side conversation by ID.
        #[arg(long)]
        resume: Option<String>,
    },

    /// Ask a single question and stream the answer.
    Ask {
        /// The question to ask.
        question: String,

        /// Restrict retrieval to one source kind (confluence, github).
        #[arg(long, short)]
        source: Option<String>,
    },

    /// List conversations stored on the server.
    #[command(alias = "ls")]
    Conversations,

    /// Show a conversation's full history.
    Show {
        /// Conversation ID.
        id: String,
    },

    /// Delete a conversation.
    #[command(alias = "rm")]
    Delete {
        /// Conversation ID.
        id: String,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Store an API token in the OS keychain.
    ///
    /// Takes the token from the global `--token`, or prompts for it.
    Login,

    /// Remove the stored API token.
    Logout,

    /// Show configuration and credential status.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Validate a `--source` value, lowercasing it.
///
/// `all` (or no value) means no filter.
pub fn parse_source_filter(value: Option<&str>) -> anyhow::Result<Option<String>> {
    let Some(value) = value.map(|v| v.trim().to_lowercase()) else {
        return Ok(None);
    };
    if value.is_empty() || value == "all" {
        return Ok(None);
    }
    if !sme_types::config::is_known_source_type(&value) {
        anyhow::bail!(
            "Unknown source '{value}'. Expected one of: {}, or all",
            sme_types::config::KNOWN_SOURCE_TYPES.join(", ")
        );
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_chat_with_flags() {
        let cli = Cli::try_parse_from(["sme", "-vv", "chat", "--source", "github"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Chat { source, resume } => {
                assert_eq!(source.as_deref(), Some("github"));
                assert!(resume.is_none());
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sme", "conversations", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Conversations));
    }

    #[test]
    fn test_login_takes_global_token() {
        let cli = Cli::try_parse_from(["sme", "login", "--token", "tok-123"]).unwrap();
        assert!(matches!(cli.command, Commands::Login));
        assert_eq!(cli.token.as_deref(), Some("tok-123"));
    }

    #[test]
    fn test_source_filter_validation() {
        assert_eq!(parse_source_filter(None).unwrap(), None);
        assert_eq!(parse_source_filter(Some("ALL")).unwrap(), None);
        assert_eq!(
            parse_source_filter(Some(" Confluence ")).unwrap().as_deref(),
            Some("confluence")
        );
        assert!(parse_source_filter(Some("jira")).is_err());
    }
}
