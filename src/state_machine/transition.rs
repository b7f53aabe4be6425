//! Pure state transition function

use super::reconcile::{self, Outcome};
use super::{ChatState, Effect, Event, Message, StreamId};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons an event is refused
///
/// None of these are shown to the user: a refused submit is a disabled
/// send button, and a stale stream event is expected after teardown.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Prompt is blank")]
    BlankPrompt,
    #[error("A reply is still streaming")]
    ReplyInProgress,
    #[error("Event from {stream} which is not the active stream")]
    StaleStream { stream: StreamId },
    #[error("Session is closed")]
    SessionClosed,
}

/// Pure transition function
///
/// Given the same inputs it produces the same outputs, except for the
/// fresh message ids minted for new messages. No I/O happens here.
pub fn transition(state: &ChatState, event: Event) -> Result<TransitionResult, TransitionError> {
    if state.closed {
        return Err(TransitionError::SessionClosed);
    }

    if let Some(stream) = event.stream() {
        if state.active_stream != Some(stream) {
            return Err(TransitionError::StaleStream { stream });
        }
    }

    match event {
        Event::InputChanged { text } => Ok(TransitionResult::new(ChatState {
            input: text,
            ..state.clone()
        })),

        Event::Submit { text } => {
            if text.trim().is_empty() {
                return Err(TransitionError::BlankPrompt);
            }
            if !state.can_submit(&text) {
                return Err(TransitionError::ReplyInProgress);
            }

            let stream = StreamId(state.streams_started + 1);
            let messages = state.messages.with_appended(Message::user(text.clone()));

            Ok(TransitionResult::new(ChatState {
                input: String::new(),
                messages,
                active_stream: Some(stream),
                streams_started: stream.0,
                closed: false,
            })
            .with_effect(Effect::ScrollToLatest)
            .with_effect(Effect::start_stream(stream, text)))
        }

        Event::StreamChunk { text, .. } => {
            let messages = reconcile::apply_chunk(&state.messages, text.as_deref());
            let grew = messages.len() != state.messages.len();
            let result = TransitionResult::new(ChatState {
                messages,
                ..state.clone()
            });
            Ok(if grew {
                result.with_effect(Effect::ScrollToLatest)
            } else {
                result
            })
        }

        Event::StreamComplete { .. } => Ok(TransitionResult::new(ChatState {
            messages: reconcile::finish(&state.messages, Outcome::Success),
            active_stream: None,
            ..state.clone()
        })),

        Event::StreamFailed { message, .. } => Ok(TransitionResult::new(ChatState {
            messages: reconcile::finish(&state.messages, Outcome::Failure { reason: message }),
            active_stream: None,
            ..state.clone()
        })),

        // Teardown: cancel the stream, leave every message as it is
        Event::Shutdown => {
            let result = TransitionResult::new(ChatState {
                active_stream: None,
                closed: true,
                ..state.clone()
            });
            Ok(match state.active_stream {
                Some(stream) => result.with_effect(Effect::AbortStream { stream }),
                None => result,
            })
        }
    }
}
