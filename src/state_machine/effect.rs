//! Effects produced by state transitions

use super::event::StreamId;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start streaming a reply to `prompt` (spawns as background task)
    StartStream { stream: StreamId, prompt: String },

    /// Cancel the stream task; it must not produce further state changes
    AbortStream { stream: StreamId },

    /// The conversation grew; the view should jump to the newest message
    ScrollToLatest,
}

impl Effect {
    pub fn start_stream(stream: StreamId, prompt: impl Into<String>) -> Self {
        Effect::StartStream {
            stream,
            prompt: prompt.into(),
        }
    }
}
