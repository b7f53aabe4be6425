//! Frame rendering

use super::input::ViewState;
use crate::state_machine::{ChatState, Message};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

/// Session details shown around the conversation
pub struct Header<'a> {
    pub title: &'a str,
    pub last_error: Option<&'a str>,
}

pub fn render(frame: &mut Frame, state: &ChatState, view: &mut ViewState, header: &Header<'_>) {
    let [chat_area, input_area, status_area] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_conversation(frame, chat_area, state, view, header.title);
    render_input(frame, input_area, state, view);
    render_status(frame, status_area, state, header.last_error);
}

fn render_conversation(frame: &mut Frame, area: Rect, state: &ChatState, view: &mut ViewState, title: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {title} "));
    let inner = block.inner(area);

    let paragraph = Paragraph::new(conversation_text(state, view.spinner())).wrap(Wrap { trim: false });

    // Keep the scroll offset inside the wrapped text
    let total = u16::try_from(paragraph.line_count(inner.width)).unwrap_or(u16::MAX);
    let max_scroll = total.saturating_sub(inner.height);
    view.viewport = inner.height;
    if view.follow || view.scroll >= max_scroll {
        view.scroll = max_scroll;
        view.follow = true;
    }

    frame.render_widget(block, area);
    frame.render_widget(paragraph.scroll((view.scroll, 0)), inner);
}

fn conversation_text<'a>(state: &'a ChatState, spinner: &'static str) -> Text<'a> {
    if state.messages.is_empty() && !state.is_streaming() {
        return Text::from(Span::styled(
            "Type a message and press Enter",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let label = |name: &'static str, color: Color| {
        Span::styled(name, Style::default().fg(color).add_modifier(Modifier::BOLD))
    };
    let mut lines: Vec<Line> = Vec::new();

    for message in &state.messages {
        match message {
            Message::User { text, .. } => {
                lines.push(Line::from(label("You", Color::Cyan)).alignment(Alignment::Right));
                lines.extend(
                    text.split('\n')
                        .map(|l| Line::styled(l, Style::default().fg(Color::Cyan)).alignment(Alignment::Right)),
                );
            }
            Message::InProgress { text, .. } => {
                lines.push(Line::from(vec![label("AI", Color::Yellow), Span::raw(" "), Span::raw(spinner)]));
                lines.extend(text.split('\n').map(Line::from));
            }
            Message::Success { text, .. } => {
                lines.push(Line::from(label("AI", Color::Yellow)));
                lines.extend(text.split('\n').map(Line::from));
            }
            Message::Failure { text, reason, .. } => {
                lines.push(Line::from(label("AI", Color::Yellow)));
                if !text.is_empty() {
                    lines.extend(text.split('\n').map(Line::from));
                }
                lines.push(Line::styled(
                    format!("✗ {reason}"),
                    Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
                ));
            }
        }
        lines.push(Line::default());
    }

    // Waiting for the first chunk
    if state.is_streaming() && !state.messages.has_reply_in_progress() {
        lines.push(Line::from(vec![
            label("AI", Color::Yellow),
            Span::raw(" "),
            Span::styled(spinner, Style::default().fg(Color::DarkGray)),
        ]));
    }

    Text::from(lines)
}

fn render_input(frame: &mut Frame, area: Rect, state: &ChatState, view: &ViewState) {
    let send = if state.is_send_enabled() {
        Span::styled(" Send ⏎ ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::styled(" Send ⏎ ", Style::default().fg(Color::DarkGray))
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title_top(" Message ")
        .title_top(Line::from(send).right_aligned());

    let inner_width = usize::from(area.width.saturating_sub(2));
    let (visible, x) = input_window(&state.input, view.cursor, inner_width);

    frame.render_widget(Paragraph::new(visible).block(block), area);

    if !state.closed {
        frame.set_cursor_position((area.x + 1 + x, area.y + 1));
    }
}

/// Visible part of the input and the cursor column, both in terminal cells
///
/// Scrolls horizontally so the cell under the cursor stays in view. Wide
/// characters such as CJK take two cells.
fn input_window(input: &str, cursor: usize, width: usize) -> (String, u16) {
    let widths: Vec<usize> = input.chars().map(|c| c.width().unwrap_or(0)).collect();
    let cursor = cursor.min(widths.len());

    let mut offset = 0;
    let mut before: usize = widths[..cursor].iter().sum();
    while offset < cursor && before >= width {
        before -= widths[offset];
        offset += 1;
    }

    let mut used = 0;
    let visible = input
        .chars()
        .zip(&widths)
        .skip(offset)
        .take_while(|&(_, &w)| {
            used += w;
            used <= width
        })
        .map(|(c, _)| c)
        .collect();
    (visible, u16::try_from(before).unwrap_or(u16::MAX))
}

fn render_status(frame: &mut Frame, area: Rect, state: &ChatState, last_error: Option<&str>) {
    let detail = if state.is_streaming() {
        Span::styled(" Generating…", Style::default().fg(Color::Yellow))
    } else if let Some(error) = last_error {
        Span::styled(format!(" Error: {error}"), Style::default().fg(Color::Red))
    } else {
        Span::raw("")
    };
    let hint = Span::styled(
        " Esc quit · ↑↓ PgUp PgDn scroll",
        Style::default().fg(Color::DarkGray),
    );

    frame.render_widget(Paragraph::new(Line::from(vec![detail, hint])), area);
}
