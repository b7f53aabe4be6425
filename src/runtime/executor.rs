//! Chat runtime executor

use super::traits::LlmClient;

use crate::state_machine::{transition, ChatState, Effect, Event, StreamId};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Owner of the chat state
///
/// Every state change goes through [`ChatRuntime::dispatch`], so the UI loop
/// that owns the runtime is the single writer. Stream tasks only ever send
/// events back through the channel drained by [`ChatRuntime::next_event`].
pub struct ChatRuntime<L>
where
    L: LlmClient + 'static,
{
    state: ChatState,
    llm_client: Arc<L>,
    event_tx: mpsc::Sender<Event>,
    event_rx: mpsc::Receiver<Event>,
    /// Token to cancel the running reply stream
    stream_cancel_token: Option<CancellationToken>,
    scroll_requested: bool,
    /// Reason the most recent stream failed, cleared by the next submit
    last_error: Option<String>,
}

impl<L> ChatRuntime<L>
where
    L: LlmClient + 'static,
{
    pub fn new(llm_client: L) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: ChatState::new(),
            llm_client: Arc::new(llm_client),
            event_tx,
            event_rx,
            stream_cancel_token: None,
            scroll_requested: false,
            last_error: None,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn model_id(&self) -> &str {
        self.llm_client.model_id()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply one event and run its effects. Returns whether it was accepted.
    ///
    /// Must be called from within a Tokio runtime; starting a stream spawns.
    pub fn dispatch(&mut self, event: Event) -> bool {
        let failure = if let Event::StreamFailed { message, .. } = &event {
            Some(message.clone())
        } else {
            None
        };
        let is_submit = matches!(event, Event::Submit { .. });

        let result = match transition(&self.state, event) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(error = %e, "Event rejected");
                return false;
            }
        };

        self.state = result.new_state;
        debug_assert!(
            self.state.messages.check_invariants().is_ok(),
            "conversation invariant broken"
        );

        if is_submit {
            self.last_error = None;
        }
        if failure.is_some() {
            self.last_error = failure;
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }
        true
    }

    /// Wait for the next event produced by a stream task
    pub async fn next_event(&mut self) -> Option<Event> {
        self.event_rx.recv().await
    }

    /// Whether the view should jump to the newest message; resets the flag
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    /// Close the session, cancelling any outstanding stream
    pub fn shutdown(&mut self) {
        if !self.state.closed {
            self.dispatch(Event::Shutdown);
        }
        if let Some(token) = self.stream_cancel_token.take() {
            token.cancel();
        }
        tracing::info!(
            messages = self.state.messages.len(),
            streams = self.state.streams_started,
            "Chat runtime shut down"
        );
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::StartStream { stream, prompt } => {
                if let Some(previous) = self.stream_cancel_token.take() {
                    previous.cancel();
                }
                let cancel_token = CancellationToken::new();
                self.stream_cancel_token = Some(cancel_token.clone());

                let llm_client = self.llm_client.clone();
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tracing::info!(%stream, prompt_chars = prompt.chars().count(), "Starting reply stream");

                    // Race the stream against cancellation
                    tokio::select! {
                        biased;

                        () = cancel_token.cancelled() => {
                            tracing::info!(%stream, "Reply stream cancelled");
                        }

                        () = pump_stream(llm_client.as_ref(), stream, &prompt, &event_tx) => {}
                    }
                });
            }

            Effect::AbortStream { stream } => {
                if let Some(token) = self.stream_cancel_token.take() {
                    tracing::info!(%stream, "Aborting reply stream");
                    token.cancel();
                }
            }

            Effect::ScrollToLatest => {
                self.scroll_requested = true;
            }
        }
    }
}

impl<L> Drop for ChatRuntime<L>
where
    L: LlmClient + 'static,
{
    fn drop(&mut self) {
        if let Some(token) = self.stream_cancel_token.take() {
            token.cancel();
        }
    }
}

/// Forward a reply stream as events, ending with exactly one terminal event
async fn pump_stream<L>(llm_client: &L, stream: StreamId, prompt: &str, event_tx: &mpsc::Sender<Event>)
where
    L: LlmClient + ?Sized,
{
    let mut chunks = match llm_client.generate(prompt).await {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::warn!(%stream, error = %e, "Reply stream failed to start");
            let _ = event_tx
                .send(Event::StreamFailed {
                    stream,
                    message: e.message,
                })
                .await;
            return;
        }
    };

    while let Some(item) = chunks.next().await {
        let event = match item {
            Ok(chunk) => Event::StreamChunk {
                stream,
                text: chunk.text,
            },
            Err(e) => {
                tracing::warn!(%stream, error = %e, "Reply stream failed");
                let _ = event_tx
                    .send(Event::StreamFailed {
                        stream,
                        message: e.message,
                    })
                    .await;
                return;
            }
        };
        if event_tx.send(event).await.is_err() {
            return; // runtime dropped
        }
    }

    let _ = event_tx.send(Event::StreamComplete { stream }).await;
}
