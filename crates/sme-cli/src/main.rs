//! SME chat client entry point.
//!
//! Binary name: `sme`
//!
//! Parses CLI arguments, sets up tracing, wires the session controller, then
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use sme_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = verbosity_filter(cli.verbose, cli.quiet);
    if let Err(e) = init_tracing(filter, cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "sme", &mut std::io::stdout());
        return Ok(());
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut state = AppState::init(cli.api_url.clone(), cli.token.clone()).await?;

    match cli.command {
        Commands::Chat { source, resume } => {
            let source = resolve_source(&state, source)?;
            cli::chat::loop_runner::run_chat_loop(&mut state, source, resume).await?;
        }

        Commands::Ask { question, source } => {
            let source = resolve_source(&state, source)?;
            cli::ask::ask(&mut state, &question, source, cli.json).await?;
        }

        Commands::Conversations => {
            cli::conversation::list_conversations(&mut state, cli.json).await?;
        }

        Commands::Show { id } => {
            cli::conversation::show_conversation(&mut state, &id, cli.json).await?;
        }

        Commands::Delete { id, force } => {
            cli::conversation::delete_conversation(&mut state, &id, force, cli.json).await?;
        }

        Commands::Login => {
            cli::auth::login(&state, cli.token, cli.json)?;
        }

        Commands::Logout => {
            cli::auth::logout(&state, cli.json)?;
        }

        Commands::Status => {
            cli::status::status(&state, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// An explicit `--source` wins; otherwise the configured default applies.
fn resolve_source(state: &AppState, flag: Option<String>) -> anyhow::Result<Option<String>> {
    match flag {
        Some(value) => cli::parse_source_filter(Some(&value)),
        None => Ok(state.config.default_source_type.clone()),
    }
}
