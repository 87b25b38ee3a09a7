//! Chat pane: messages with live timestamps.

use chat_timestamps::{ContentId, Segment};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, ChatMessage};

fn message_line<'a>(app: &'a App, message: &'a ChatMessage) -> Line<'a> {
    let mut spans = vec![Span::styled(
        format!("<{}> ", message.author),
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    )];

    match &message.rendered {
        Some(content) => {
            for segment in &content.segments {
                match segment {
                    Segment::Text(text) => spans.push(Span::raw(text.as_str())),
                    Segment::Timestamp(id) => {
                        let text = app.element_text.get(id).map(|s| s.as_str()).unwrap_or("…");
                        spans.push(Span::styled(
                            text,
                            Style::default().fg(Color::Black).bg(Color::Cyan),
                        ));
                    }
                }
            }
        }
        // Not materialized yet; show the raw token text.
        None => spans.push(Span::styled(message.raw.as_str(), Style::default().fg(Color::DarkGray))),
    }
    Line::from(spans)
}

/// Draws the pane and returns the messages that ended up on screen.
pub fn draw_chat(f: &mut Frame, app: &App, area: Rect) -> Vec<ContentId> {
    let channel = app.current_channel();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Live Chat // #{}", channel.name))
        .border_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return Vec::new();
    }

    if app.is_loading() {
        f.render_widget(
            Paragraph::new(Span::styled("Loading messages...", Style::default().fg(Color::Yellow))),
            inner,
        );
        return Vec::new();
    }

    let rows = inner.height as usize;
    let end = channel.messages.len().saturating_sub(app.scroll_offset);
    let start = end.saturating_sub(rows);
    let shown = &channel.messages[start..end];

    let lines: Vec<Line> = shown.iter().map(|m| message_line(app, m)).collect();
    f.render_widget(Paragraph::new(lines), inner);

    shown.iter().map(|m| m.id).collect()
}

/// Tooltip of the newest timestamp on screen, if any.
pub fn newest_tooltip<'a>(app: &'a App, shown: &[ContentId]) -> Option<&'a str> {
    app.current_channel()
        .messages
        .iter()
        .rev()
        .filter(|m| shown.contains(&m.id))
        .filter_map(|m| m.rendered.as_ref())
        .flat_map(|content| content.element_ids())
        .find_map(|id| app.element_tooltip.get(&id))
        .map(|s| s.as_str())
}
