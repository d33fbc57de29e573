//! Shared domain types for the SME chat client.
//!
//! This crate contains the data shapes used across the workspace:
//! conversations, messages, source references, streamed events, wire DTOs
//! for the generation service, client configuration, and error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod event;
pub mod session;
