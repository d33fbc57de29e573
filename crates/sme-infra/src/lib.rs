//! Infrastructure layer for the SME chat client.
//!
//! Implements the ports defined in `sme-core` against real systems: the
//! generation service over HTTP (reqwest), bearer tokens from the
//! environment and the OS keychain, and `config.toml` on disk.

pub mod config;
pub mod credential;
pub mod http;
