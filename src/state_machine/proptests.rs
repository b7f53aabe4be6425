//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::reconcile::{apply_chunk, finish, Outcome};
use super::state::Conversation;
use super::transition::TransitionError;
use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_chunk() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        1 => Just(None),
        8 => "[a-zA-Z0-9 .,!?\n]{0,12}".prop_map(Some),
        1 => "\\PC{1,4}".prop_map(Some),
    ]
}

fn arb_prompt() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-zA-Z ]{1,20}",
        1 => Just(String::new()),
        1 => "[ \t\n]{1,4}",
    ]
}

/// What the outside world can do to the store, with stream ids left abstract
#[derive(Debug, Clone)]
enum Action {
    Type(String),
    Submit(String),
    Chunk(Option<String>),
    Complete,
    Fail(String),
    /// Event from a stream that is not the active one
    StaleChunk(String),
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        1 => "[a-z ]{0,10}".prop_map(Action::Type),
        2 => arb_prompt().prop_map(Action::Submit),
        5 => arb_chunk().prop_map(Action::Chunk),
        1 => Just(Action::Complete),
        1 => "[a-z ]{1,10}".prop_map(Action::Fail),
        1 => "[a-z]{1,5}".prop_map(Action::StaleChunk),
    ]
}

/// Resolve an abstract action against the current state
fn to_event(state: &ChatState, action: Action) -> Event {
    let stream = state
        .active_stream
        .unwrap_or(StreamId(state.streams_started + 1));
    match action {
        Action::Type(text) => Event::InputChanged { text },
        Action::Submit(text) => Event::Submit { text },
        Action::Chunk(text) => Event::StreamChunk { stream, text },
        Action::Complete => Event::StreamComplete { stream },
        Action::Fail(message) => Event::StreamFailed { stream, message },
        Action::StaleChunk(text) => Event::StreamChunk {
            stream: StreamId(state.streams_started + 100),
            text: Some(text),
        },
    }
}

fn apply(state: &ChatState, event: Event) -> ChatState {
    match transition(state, event) {
        Ok(result) => result.new_state,
        Err(_) => state.clone(),
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_chunks_concatenate_into_one_reply(
        resolved_first in any::<bool>(),
        chunks in proptest::collection::vec(arb_chunk(), 1..20),
    ) {
        let mut conv = Conversation::new().with_appended(Message::user("q"));
        if resolved_first {
            conv = finish(&apply_chunk(&conv, Some("earlier")), Outcome::Success);
        }
        let before = conv.len();

        for chunk in &chunks {
            conv = apply_chunk(&conv, chunk.as_deref());
        }

        let expected: String = chunks.iter().flatten().map(String::as_str).collect();
        prop_assert_eq!(conv.len(), before + 1);
        let last = conv.last().unwrap();
        prop_assert!(last.is_in_progress());
        prop_assert_eq!(last.text(), expected.as_str());
        prop_assert!(conv.check_invariants().is_ok());
    }

    #[test]
    fn prop_finishing_never_changes_id(
        chunks in proptest::collection::vec(arb_chunk(), 1..10),
        succeed in any::<bool>(),
    ) {
        let mut conv = Conversation::new();
        for chunk in &chunks {
            conv = apply_chunk(&conv, chunk.as_deref());
        }
        let id = conv.last().unwrap().id().clone();
        let text = conv.last().unwrap().text().to_string();

        let outcome = if succeed {
            Outcome::Success
        } else {
            Outcome::Failure { reason: "err".to_string() }
        };
        let done = finish(&conv, outcome);
        let last = done.last().unwrap();

        prop_assert_eq!(last.id(), &id);
        prop_assert_eq!(last.text(), text.as_str());
        prop_assert!(last.is_resolved());
    }

    #[test]
    fn prop_invariants_hold_for_any_event_sequence(
        actions in proptest::collection::vec(arb_action(), 0..60),
    ) {
        let mut state = ChatState::new();
        for action in actions {
            let event = to_event(&state, action);
            state = apply(&state, event);
            prop_assert!(state.messages.check_invariants().is_ok());
        }
    }

    #[test]
    fn prop_resolved_messages_never_change(
        actions in proptest::collection::vec(arb_action(), 0..60),
    ) {
        let mut state = ChatState::new();
        for action in actions {
            let event = to_event(&state, action);
            let next = apply(&state, event);

            for (before, after) in state.messages.iter().zip(next.messages.iter()) {
                if before.is_resolved() || before.is_user() {
                    prop_assert_eq!(before, after);
                }
            }
            prop_assert!(next.messages.len() >= state.messages.len());
            state = next;
        }
    }

    #[test]
    fn prop_send_gate_leaves_state_untouched(
        prompt in arb_prompt(),
        chunks in proptest::collection::vec(arb_chunk(), 0..5),
        input in "[a-z]{0,8}",
    ) {
        // A stream is outstanding, with or without a reply on screen yet
        let mut state = apply(&ChatState::new(), Event::Submit { text: "first".to_string() });
        for chunk in chunks {
            state = apply(&state, Event::StreamChunk { stream: StreamId(1), text: chunk });
        }
        state = apply(&state, Event::InputChanged { text: input });

        let result = transition(&state, Event::Submit { text: prompt });
        prop_assert!(result.is_err());
    }

    #[test]
    fn prop_blank_submit_rejected_when_idle(blank in "[ \t\n]{0,6}") {
        let state = ChatState::new();
        let result = transition(&state, Event::Submit { text: blank });
        prop_assert_eq!(result.unwrap_err(), TransitionError::BlankPrompt);
    }

    #[test]
    fn prop_nothing_changes_after_shutdown(
        actions in proptest::collection::vec(arb_action(), 0..20),
    ) {
        let mut state = apply(&ChatState::new(), Event::Submit { text: "hi".to_string() });
        state = apply(&state, Event::Shutdown);
        let frozen = state.clone();

        for action in actions {
            let event = to_event(&state, action);
            prop_assert_eq!(transition(&state, event).unwrap_err(), TransitionError::SessionClosed);
        }
        prop_assert_eq!(state, frozen);
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn scenario_full_reply_lifecycle() {
    // A: submit
    let state = apply(&ChatState::new(), Event::InputChanged { text: "Hi".to_string() });
    let state = apply(&state, Event::Submit { text: "Hi".to_string() });
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.messages.as_slice()[0].text(), "Hi");
    assert_eq!(state.input, "");

    // B: two chunks
    let stream = state.active_stream.unwrap();
    let state = apply(
        &state,
        Event::StreamChunk {
            stream,
            text: Some("Hel".to_string()),
        },
    );
    let state = apply(
        &state,
        Event::StreamChunk {
            stream,
            text: Some("lo".to_string()),
        },
    );
    let reply = state.messages.last().unwrap().clone();
    assert!(reply.is_in_progress());
    assert_eq!(reply.text(), "Hello");

    // C: complete
    let done = apply(&state, Event::StreamComplete { stream });
    assert!(matches!(done.messages.last(), Some(Message::Success { .. })));
    assert_eq!(done.messages.last().unwrap().id(), reply.id());

    // D: error instead
    let failed = apply(
        &state,
        Event::StreamFailed {
            stream,
            message: "e".to_string(),
        },
    );
    assert!(matches!(failed.messages.last(), Some(Message::Failure { .. })));
    assert_eq!(failed.messages.last().unwrap().id(), reply.id());
    assert_eq!(failed.messages.last().unwrap().text(), "Hello");
}

#[test]
fn scenario_empty_submit_appends_nothing() {
    let state = apply(&ChatState::new(), Event::Submit { text: String::new() });
    assert!(state.messages.is_empty());
    assert!(state.active_stream.is_none());
}
