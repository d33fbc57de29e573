//! Exchange orchestration on top of the conversation store.

pub mod controller;
pub mod history;

pub use controller::{ExchangeOutcome, PendingExchange, SessionController};
