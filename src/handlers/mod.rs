use crate::app::App;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

const PAGE: usize = 10;

/// Main input handler dispatcher
pub fn handle_key_event(key: KeyEvent, app: &mut App, visible_rows: usize) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.should_quit = true,
        KeyCode::Tab => app.next_channel(),
        KeyCode::Up => app.scroll_up(1, visible_rows),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(PAGE, visible_rows),
        KeyCode::PageDown => app.scroll_down(PAGE),
        _ => {}
    }
}
