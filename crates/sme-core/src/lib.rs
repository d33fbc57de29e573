//! Core logic for the SME chat client.
//!
//! This crate owns the conversation model and the streaming exchange state
//! machine. It defines the "ports" (`ChatBackend`, `CredentialSource`) that
//! the infrastructure layer implements and depends only on `sme-types` --
//! never on `sme-infra` or any HTTP/OS crate.

pub mod backend;
pub mod credential;
pub mod session;
pub mod store;
pub mod stream;
