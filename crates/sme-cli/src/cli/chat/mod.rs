//! Interactive chat session.
//!
//! Streams answers live from the store change feed, renders the final
//! answer as markdown, and handles slash commands. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
