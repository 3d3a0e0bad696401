//! Terminal key events → dispatcher commands.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use triage_core::command::Command;

/// Quit keys are handled by the app itself, before command mapping, so `q`
/// shadows sibling labels starting with it just like the transport keys do.
pub fn is_quit(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Map one key press to a command. Arrow keys alias the seek pair; everything
/// printable goes through [`Command::from_char`]. Release/repeat events from
/// the kitty protocol are ignored.
pub fn command_for_key(key: &KeyEvent, divisions: u32) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    match key.code {
        KeyCode::Right => Some(Command::SeekForward),
        KeyCode::Left => Some(Command::SeekBackward),
        KeyCode::Char(c) => Command::from_char(c, divisions),
        _ => None,
    }
}
