//! Key handling and per-session view state

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// What a key press asks the runtime to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    /// New contents of the input buffer
    Edit(String),
    Submit(String),
    Quit,
}

/// State that only the view cares about
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Cursor position in the input, in chars
    pub cursor: usize,
    /// First visible line of the conversation pane
    pub scroll: u16,
    /// Keep the newest line in view as the conversation grows
    pub follow: bool,
    /// Conversation pane height from the last frame
    pub viewport: u16,
    pub(super) spinner: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            cursor: 0,
            scroll: 0,
            follow: true,
            viewport: 0,
            spinner: 0,
        }
    }
}

impl ViewState {
    pub fn tick(&mut self) {
        self.spinner = (self.spinner + 1) % SPINNER_FRAMES.len();
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner]
    }

    pub fn follow_latest(&mut self) {
        self.follow = true;
    }

    fn scroll_up(&mut self, lines: u16) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    /// Render clamps this and resumes following once the bottom is reached
    fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    /// Translate a key press given the current input and send-gate
    pub fn handle_key(&mut self, key: KeyEvent, input: &str, send_enabled: bool) -> Action {
        let len = input.chars().count();
        self.cursor = self.cursor.min(len);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let page = self.viewport.saturating_sub(1).max(1);

        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Char('c') if ctrl => Action::Quit,

            KeyCode::Enter if send_enabled => {
                self.cursor = 0;
                self.follow = true;
                Action::Submit(input.to_string())
            }
            KeyCode::Char(c) if !ctrl => {
                let mut text = input.to_string();
                text.insert(byte_index(input, self.cursor), c);
                self.cursor += 1;
                Action::Edit(text)
            }
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                Action::Edit(remove_char(input, self.cursor))
            }
            KeyCode::Delete if self.cursor < len => Action::Edit(remove_char(input, self.cursor)),

            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                Action::None
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(len);
                Action::None
            }
            KeyCode::Home => {
                self.cursor = 0;
                Action::None
            }
            KeyCode::End => {
                self.cursor = len;
                Action::None
            }

            KeyCode::Up => {
                self.scroll_up(1);
                Action::None
            }
            KeyCode::Down => {
                self.scroll_down(1);
                Action::None
            }
            KeyCode::PageUp => {
                self.scroll_up(page);
                Action::None
            }
            KeyCode::PageDown => {
                self.scroll_down(page);
                Action::None
            }

            _ => Action::None,
        }
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

fn remove_char(s: &str, char_idx: usize) -> String {
    s.chars()
        .enumerate()
        .filter_map(|(i, c)| (i != char_idx).then_some(c))
        .collect()
}
