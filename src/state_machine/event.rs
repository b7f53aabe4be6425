//! Events that can occur in a chat session

use std::fmt;

/// Identifies one generation stream
///
/// Stream events carry the id of the stream that produced them so that
/// late events from a cancelled stream can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    InputChanged {
        text: String,
    },
    Submit {
        text: String,
    },

    // Stream events
    StreamChunk {
        stream: StreamId,
        /// Chunk payload; `None` when the service sent a chunk without text
        text: Option<String>,
    },
    StreamComplete {
        stream: StreamId,
    },
    StreamFailed {
        stream: StreamId,
        message: String,
    },

    // Session teardown
    Shutdown,
}

impl Event {
    /// Stream this event belongs to, if it came from one
    pub fn stream(&self) -> Option<StreamId> {
        match self {
            Event::StreamChunk { stream, .. }
            | Event::StreamComplete { stream }
            | Event::StreamFailed { stream, .. } => Some(*stream),
            _ => None,
        }
    }
}
