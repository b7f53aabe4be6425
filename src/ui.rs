//! Terminal chat front end
//!
//! The event loop owns the runtime, so keystrokes and stream events are
//! applied one at a time in arrival order.

mod input;
mod terminal;
mod view;

use crate::runtime::{ChatRuntime, LlmClient};
use crate::state_machine::Event;
use input::{Action, ViewState};
use std::io;
use terminal::{AppEvent, EventHandler, Tui};
use view::Header;

/// Run the chat until the user quits, then tear the session down
pub async fn run<L>(runtime: &mut ChatRuntime<L>, title: &str) -> io::Result<()>
where
    L: LlmClient + 'static,
{
    terminal::install_panic_hook();
    let mut tui = terminal::init()?;

    let result = event_loop(&mut tui, runtime, title).await;

    runtime.shutdown();
    terminal::restore()?;
    result
}

async fn event_loop<L>(tui: &mut Tui, runtime: &mut ChatRuntime<L>, title: &str) -> io::Result<()>
where
    L: LlmClient + 'static,
{
    let mut events = EventHandler::new();
    let mut view = ViewState::default();

    loop {
        if runtime.take_scroll_request() {
            view.follow_latest();
        }

        tui.draw(|frame| {
            let header = Header {
                title,
                last_error: runtime.last_error(),
            };
            view::render(frame, runtime.state(), &mut view, &header);
        })?;

        tokio::select! {
            Some(event) = events.next() => match event {
                AppEvent::Key(key) => {
                    let state = runtime.state();
                    match view.handle_key(key, &state.input, state.is_send_enabled()) {
                        Action::Edit(text) => {
                            runtime.dispatch(Event::InputChanged { text });
                        }
                        Action::Submit(text) => {
                            runtime.dispatch(Event::Submit { text });
                        }
                        Action::Quit => break,
                        Action::None => {}
                    }
                }
                AppEvent::Resize => {}
                AppEvent::Tick => view.tick(),
            },
            Some(event) = runtime.next_event() => {
                runtime.dispatch(event);
            }
            else => break,
        }
    }

    tracing::info!("User quit");
    Ok(())
}
