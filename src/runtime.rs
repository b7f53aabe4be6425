//! Runtime for executing the chat session
//!
//! Drives the pure state machine: applies events, runs the effects, and
//! feeds reply stream events back in.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;
pub use traits::*;

/// Runtime wired to a configured provider
pub type ProductionRuntime = ChatRuntime<ServiceLlmClient>;
