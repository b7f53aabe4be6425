//! Chat state types

use super::event::StreamId;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Message identity
// ============================================================================

/// Identity key for a message, minted once at creation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Mint a fresh, globally unique id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Messages
// ============================================================================

/// A single entry in the conversation
///
/// Assistant replies move through `InProgress` while chunks arrive and end
/// in exactly one of `Success` or `Failure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    User {
        id: MessageId,
        text: String,
    },
    InProgress {
        id: MessageId,
        text: String,
    },
    Success {
        id: MessageId,
        text: String,
    },
    Failure {
        id: MessageId,
        text: String,
        /// Error reported by the generation service
        reason: String,
    },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::User {
            id: MessageId::generate(),
            text: text.into(),
        }
    }

    pub fn id(&self) -> &MessageId {
        match self {
            Message::User { id, .. }
            | Message::InProgress { id, .. }
            | Message::Success { id, .. }
            | Message::Failure { id, .. } => id,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Message::User { text, .. }
            | Message::InProgress { text, .. }
            | Message::Success { text, .. }
            | Message::Failure { text, .. } => text,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Message::User { .. })
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Message::InProgress { .. })
    }

    /// True for assistant replies that can no longer change
    pub fn is_resolved(&self) -> bool {
        matches!(self, Message::Success { .. } | Message::Failure { .. })
    }
}

// ============================================================================
// Conversation
// ============================================================================

/// Broken structural rule, reported by [`Conversation::check_invariants`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{count} in-progress replies present, at most one allowed")]
    MultipleInProgress { count: usize },
    #[error("in-progress reply at index {index} is not the last message")]
    InProgressNotLast { index: usize },
    #[error("message id {id} appears more than once")]
    DuplicateId { id: MessageId },
}

/// Ordered, copy-on-write list of messages
///
/// Clones share storage, so a render pass holding a clone keeps seeing a
/// consistent snapshot while the owner builds the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Arc<Vec<Message>>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    /// Whether the trailing message is a reply still being streamed
    pub fn has_reply_in_progress(&self) -> bool {
        self.last().is_some_and(Message::is_in_progress)
    }

    /// New conversation with `message` appended
    #[must_use]
    pub fn with_appended(&self, message: Message) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.messages).push(message);
        next
    }

    /// New conversation with the last element swapped for `message`
    ///
    /// Appends instead when the conversation is empty.
    #[must_use]
    pub fn with_last_replaced(&self, message: Message) -> Self {
        let mut next = self.clone();
        let messages = Arc::make_mut(&mut next.messages);
        messages.pop();
        messages.push(message);
        next
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let in_progress: Vec<usize> = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_in_progress())
            .map(|(i, _)| i)
            .collect();

        if in_progress.len() > 1 {
            return Err(InvariantViolation::MultipleInProgress {
                count: in_progress.len(),
            });
        }
        if let Some(&index) = in_progress.first() {
            if index + 1 != self.messages.len() {
                return Err(InvariantViolation::InProgressNotLast { index });
            }
        }

        let mut seen = std::collections::HashSet::new();
        for message in self.messages.iter() {
            if !seen.insert(message.id()) {
                return Err(InvariantViolation::DuplicateId {
                    id: message.id().clone(),
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<Message> for Conversation {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Chat State
// ============================================================================

/// Everything the state store owns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    /// Text currently in the input box
    pub input: String,
    pub messages: Conversation,
    /// Stream whose events are currently accepted
    pub active_stream: Option<StreamId>,
    /// Number of streams started so far, used to mint stream ids
    pub streams_started: u64,
    /// Set once the session is torn down; every later event is ignored
    pub closed: bool,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a generation stream is outstanding
    pub fn is_streaming(&self) -> bool {
        self.active_stream.is_some()
    }

    /// The send-gate: would submitting `prompt` be accepted right now
    pub fn can_submit(&self, prompt: &str) -> bool {
        !self.closed
            && !prompt.trim().is_empty()
            && !self.is_streaming()
            && !self.messages.has_reply_in_progress()
    }

    /// The send-gate evaluated against the current input buffer
    pub fn is_send_enabled(&self) -> bool {
        self.can_submit(&self.input)
    }
}
