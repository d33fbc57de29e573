//! Observability setup for the SME chat client.

pub mod tracing_setup;
