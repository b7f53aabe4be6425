//! Mock implementations for testing
//!
//! These mocks enable runtime testing without real I/O.

use super::traits::*;
use crate::llm::{LlmError, TextChunk, TextStream};
use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock LLM Client
// ============================================================================

/// How one queued reply behaves
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Yield these items, then end
    Items(Vec<Result<TextChunk, LlmError>>),
    /// Fail before any chunk is produced
    Refuse(LlmError),
    /// Yield these chunks, then never finish
    Hang(Vec<TextChunk>),
}

/// Counts a reply stream as open until the stream is dropped
struct OpenStream(Arc<AtomicUsize>);

impl OpenStream {
    fn new(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count.clone())
    }
}

impl Drop for OpenStream {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock LLM client that plays back queued replies
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    model_id: String,
    /// Record of all prompts sent
    pub prompts: Mutex<Vec<String>>,
    open_streams: Arc<AtomicUsize>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            prompts: Mutex::new(Vec::new()),
            open_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a reply made of text chunks that completes normally
    pub fn queue_chunks(&self, chunks: &[&str]) {
        let items = chunks.iter().map(|c| Ok(TextChunk::text(*c))).collect();
        self.queue(MockReply::Items(items));
    }

    pub fn queue(&self, reply: MockReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Get recorded prompts
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Reply streams handed out and not yet dropped
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, prompt: &str) -> Result<TextStream, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockReply::Refuse(LlmError::network("No mock reply queued")));

        let items: TextStream = match reply {
            MockReply::Items(items) => Box::pin(stream::iter(items)),
            MockReply::Refuse(e) => return Err(e),
            MockReply::Hang(chunks) => {
                Box::pin(stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending()))
            }
        };

        let open = OpenStream::new(&self.open_streams);
        Ok(Box::pin(items.map(move |item| {
            let _ = &open;
            item
        })))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ChatRuntime;
    use crate::state_machine::{Event, Message};
    use std::time::Duration;

    fn runtime() -> (ChatRuntime<Arc<MockLlmClient>>, Arc<MockLlmClient>) {
        let client = Arc::new(MockLlmClient::new("mock-model"));
        (ChatRuntime::new(client.clone()), client)
    }

    fn submit(rt: &mut ChatRuntime<Arc<MockLlmClient>>, text: &str) -> bool {
        rt.dispatch(Event::InputChanged {
            text: text.to_string(),
        });
        rt.dispatch(Event::Submit {
            text: text.to_string(),
        })
    }

    /// Feed stream events back until the stream settles
    async fn drain(rt: &mut ChatRuntime<Arc<MockLlmClient>>) {
        while rt.state().is_streaming() {
            let event = tokio::time::timeout(Duration::from_secs(5), rt.next_event())
                .await
                .expect("stream stalled")
                .expect("channel closed");
            rt.dispatch(event);
        }
    }

    /// Let stream tasks run until every reply stream has been dropped
    async fn wait_for_streams_closed(client: &MockLlmClient) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while client.open_streams() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("reply stream was never dropped");
    }

    #[tokio::test]
    async fn test_full_reply_lifecycle() {
        let (mut rt, client) = runtime();
        client.queue_chunks(&["Hel", "lo"]);

        assert!(submit(&mut rt, "Hi"));
        assert_eq!(rt.state().input, "");
        assert!(rt.take_scroll_request());
        assert!(!rt.take_scroll_request());

        drain(&mut rt).await;

        let messages = rt.state().messages.as_slice();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_user());
        assert_eq!(messages[0].text(), "Hi");
        assert!(matches!(&messages[1], Message::Success { text, .. } if text == "Hello"));
        assert!(rt.take_scroll_request());
        assert_eq!(client.recorded_prompts(), vec!["Hi".to_string()]);
        assert!(rt.last_error().is_none());
    }

    #[tokio::test]
    async fn test_failure_mid_stream_keeps_partial_text() {
        let (mut rt, client) = runtime();
        client.queue(MockReply::Items(vec![
            Ok(TextChunk::text("par")),
            Err(LlmError::network("connection reset")),
        ]));

        submit(&mut rt, "Hi");
        drain(&mut rt).await;

        match rt.state().messages.last().unwrap() {
            Message::Failure { text, reason, .. } => {
                assert_eq!(text, "par");
                assert_eq!(reason, "connection reset");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(rt.last_error(), Some("connection reset"));
        assert!(!rt.state().is_streaming());
    }

    #[tokio::test]
    async fn test_refused_request_reopens_gate() {
        let (mut rt, client) = runtime();
        client.queue(MockReply::Refuse(LlmError::auth("bad key")));
        client.queue_chunks(&["ok"]);

        submit(&mut rt, "first");
        drain(&mut rt).await;

        assert_eq!(rt.state().messages.len(), 1);
        assert!(rt.state().messages.last().unwrap().is_user());
        assert_eq!(rt.last_error(), Some("bad key"));

        assert!(submit(&mut rt, "second"));
        assert!(rt.last_error().is_none());
        drain(&mut rt).await;
        assert_eq!(rt.state().messages.len(), 3);
    }

    #[tokio::test]
    async fn test_gate_closed_while_streaming() {
        let (mut rt, client) = runtime();
        client.queue(MockReply::Hang(vec![TextChunk::text("thinking")]));

        assert!(submit(&mut rt, "one"));
        // Before the first chunk arrives
        assert!(!submit(&mut rt, "two"));

        let event = rt.next_event().await.unwrap();
        assert!(rt.dispatch(event));
        assert!(rt.state().messages.last().unwrap().is_in_progress());
        assert!(!submit(&mut rt, "two"));
        assert_eq!(rt.state().input, "two");
        assert_eq!(client.recorded_prompts().len(), 1);

        rt.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_cancels_and_ignores_late_events() {
        let (mut rt, client) = runtime();
        client.queue(MockReply::Hang(vec![TextChunk::text("partial")]));

        submit(&mut rt, "q");
        let event = rt.next_event().await.unwrap();
        rt.dispatch(event);
        let before = rt.state().messages.clone();

        rt.shutdown();
        assert!(rt.state().closed);
        assert!(!rt.state().is_streaming());

        // A stray event from the dead stream changes nothing
        let late = Event::StreamChunk {
            stream: crate::state_machine::StreamId(1),
            text: Some("late".to_string()),
        };
        assert!(!rt.dispatch(late));
        assert!(!rt.dispatch(Event::Submit {
            text: "again".to_string()
        }));
        assert_eq!(rt.state().messages, before);
        assert_eq!(before.last().unwrap().text(), "partial");
    }

    #[tokio::test]
    async fn test_shutdown_drops_hanging_stream() {
        let (mut rt, client) = runtime();
        client.queue(MockReply::Hang(vec![TextChunk::text("partial")]));

        submit(&mut rt, "q");
        let event = rt.next_event().await.unwrap();
        rt.dispatch(event);
        assert_eq!(client.open_streams(), 1);

        rt.shutdown();
        wait_for_streams_closed(&client).await;
        assert_eq!(client.open_streams(), 0);
    }

    #[tokio::test]
    async fn test_dropping_runtime_drops_hanging_stream() {
        let (mut rt, client) = runtime();
        client.queue(MockReply::Hang(vec![TextChunk::text("partial")]));

        submit(&mut rt, "q");
        let event = rt.next_event().await.unwrap();
        rt.dispatch(event);
        assert_eq!(client.open_streams(), 1);

        // No shutdown, the owner just goes away
        drop(rt);
        wait_for_streams_closed(&client).await;
        assert_eq!(client.open_streams(), 0);
    }

    #[tokio::test]
    async fn test_finished_stream_is_released() {
        let (mut rt, client) = runtime();
        client.queue_chunks(&["done"]);

        submit(&mut rt, "q");
        drain(&mut rt).await;
        wait_for_streams_closed(&client).await;
    }

    #[tokio::test]
    async fn test_empty_chunk_then_blocked_stop() {
        let (mut rt, client) = runtime();
        client.queue(MockReply::Items(vec![
            Ok(TextChunk::empty()),
            Ok(TextChunk::text("x")),
            Err(LlmError::blocked("Response stopped: SAFETY")),
        ]));

        submit(&mut rt, "q");
        drain(&mut rt).await;

        let last = rt.state().messages.last().unwrap();
        assert_eq!(last.text(), "x");
        assert!(matches!(last, Message::Failure { reason, .. } if reason.contains("SAFETY")));
    }
}
