//! Key mapping from terminal events to input commands.

use crate::types::ActionKind;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    /// Forward to the server.
    Action(ActionKind),
    /// Stop the loop, `start_game`, restart the loop at the returned level.
    StartGame,
    /// Stop the loop and reset; the loop is not restarted.
    Reset,
    TogglePause,
    /// Local recovery that works with the server down.
    EmergencyReset,
    Quit,
}

/// Map keyboard input to a command.
pub fn map_key(key: KeyEvent) -> Option<InputCommand> {
    if should_quit(key) {
        return Some(InputCommand::Quit);
    }

    match key.code {
        // Shift+Esc only arrives with keyboard enhancement; Ctrl-X works on
        // legacy terminals too.
        KeyCode::Esc if key.modifiers.contains(KeyModifiers::SHIFT) => {
            Some(InputCommand::EmergencyReset)
        }
        KeyCode::Char('x') | KeyCode::Char('X')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Some(InputCommand::EmergencyReset)
        }

        // Movement
        KeyCode::Left => Some(InputCommand::Action(ActionKind::MoveLeft)),
        KeyCode::Right => Some(InputCommand::Action(ActionKind::MoveRight)),
        KeyCode::Down => Some(InputCommand::Action(ActionKind::MoveDown)),
        KeyCode::Up => Some(InputCommand::Action(ActionKind::Rotate)),
        KeyCode::Char(' ') => Some(InputCommand::Action(ActionKind::HardDrop)),

        // Session
        KeyCode::Char('s') | KeyCode::Char('S') => Some(InputCommand::StartGame),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(InputCommand::Reset),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(InputCommand::TogglePause),

        _ => None,
    }
}

/// Check if key should quit the game.
pub fn should_quit(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn test_movement_keys() {
        assert_eq!(
            map_key(KeyEvent::from(KeyCode::Left)),
            Some(InputCommand::Action(ActionKind::MoveLeft))
        );
        assert_eq!(
            map_key(KeyEvent::from(KeyCode::Right)),
            Some(InputCommand::Action(ActionKind::MoveRight))
        );
        assert_eq!(
            map_key(KeyEvent::from(KeyCode::Down)),
            Some(InputCommand::Action(ActionKind::MoveDown))
        );
        assert_eq!(
            map_key(KeyEvent::from(KeyCode::Up)),
            Some(InputCommand::Action(ActionKind::Rotate))
        );
        assert_eq!(
            map_key(KeyEvent::from(KeyCode::Char(' '))),
            Some(InputCommand::Action(ActionKind::HardDrop))
        );
    }

    #[test]
    fn test_session_keys() {
        assert_eq!(
            map_key(KeyEvent::from(KeyCode::Char('s'))),
            Some(InputCommand::StartGame)
        );
        assert_eq!(
            map_key(KeyEvent::from(KeyCode::Char('R'))),
            Some(InputCommand::Reset)
        );
        assert_eq!(
            map_key(KeyEvent::from(KeyCode::Char('p'))),
            Some(InputCommand::TogglePause)
        );
    }

    #[test]
    fn test_emergency_keys() {
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::SHIFT)),
            Some(InputCommand::EmergencyReset)
        );
        assert_eq!(map_key(KeyEvent::from(KeyCode::Esc)), None);

        // What a legacy terminal can actually send.
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL)),
            Some(InputCommand::EmergencyReset)
        );
        assert_eq!(map_key(KeyEvent::from(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_quit_keys() {
        assert!(should_quit(KeyEvent::from(KeyCode::Char('q'))));
        assert!(should_quit(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
        assert!(!should_quit(KeyEvent::from(KeyCode::Char('x'))));
        assert_eq!(
            map_key(KeyEvent::from(KeyCode::Char('Q'))),
            Some(InputCommand::Quit)
        );
    }
}
