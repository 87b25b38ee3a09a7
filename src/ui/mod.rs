//! Main UI module. Lays out the chat pane and footer.

pub mod chat;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Style},
    text::Span,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::ui::chat::{draw_chat, newest_tooltip};

pub fn ui(f: &mut Frame, app: &mut App) {
    let size = f.area();
    let chunks = Layout::default()
        .constraints([
            Constraint::Min(0),    // Chat
            Constraint::Length(3), // Footer
        ])
        .split(size);

    let shown = draw_chat(f, app, chunks[0]);

    let footer_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);

    f.render_widget(
        Paragraph::new("[↑↓] Scroll | [PgUp/PgDn] Page\n[Tab] Next channel | [q] Quit")
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::TOP)),
        footer_chunks[0],
    );

    let status = newest_tooltip(app, &shown).unwrap_or("").to_string();
    f.render_widget(
        Paragraph::new(Span::styled(status, Style::default().fg(Color::Yellow)))
            .alignment(Alignment::Right)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::TOP)),
        footer_chunks[1],
    );

    app.report_visible(&shown);
}
