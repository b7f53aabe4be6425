//! Folding streamed reply chunks into the conversation
//!
//! Both functions are pure: they never modify the conversation they are
//! given, and they make no assumption about chunk size.

use super::state::{Conversation, Message, MessageId};

/// How a reply stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure { reason: String },
}

/// Fold one chunk into the conversation
///
/// Extends the trailing in-progress reply, or starts a new one with a
/// fresh id when the conversation is empty or ends in anything else.
pub fn apply_chunk(conversation: &Conversation, chunk: Option<&str>) -> Conversation {
    let chunk = chunk.unwrap_or_default();

    match conversation.last() {
        Some(Message::InProgress { id, text }) => {
            let mut grown = String::with_capacity(text.len() + chunk.len());
            grown.push_str(text);
            grown.push_str(chunk);
            conversation.with_last_replaced(Message::InProgress {
                id: id.clone(),
                text: grown,
            })
        }
        _ => conversation.with_appended(Message::InProgress {
            id: MessageId::generate(),
            text: chunk.to_string(),
        }),
    }
}

/// Resolve the trailing in-progress reply, keeping its id and text
///
/// Returns an unchanged conversation when no reply is in progress.
pub fn finish(conversation: &Conversation, outcome: Outcome) -> Conversation {
    let Some(Message::InProgress { id, text }) = conversation.last() else {
        return conversation.clone();
    };

    let resolved = match outcome {
        Outcome::Success => Message::Success {
            id: id.clone(),
            text: text.clone(),
        },
        Outcome::Failure { reason } => Message::Failure {
            id: id.clone(),
            text: text.clone(),
            reason,
        },
    };
    conversation.with_last_replaced(resolved)
}
