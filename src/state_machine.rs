//! Core chat state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! The reconciler that folds streamed chunks into the conversation lives
//! in [`reconcile`].

mod effect;
pub mod event;
pub mod reconcile;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, StreamId};
pub use state::{ChatState, Message};
pub use transition::transition;
