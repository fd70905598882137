//! Event handling for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Key action that can be performed in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    // Navigation
    MoveUp,
    MoveDown,
    JumpToTop,
    JumpToBottom,
    PageUp,
    PageDown,

    // Tree operations
    Expand,
    Collapse,

    /// Toggle the checkbox on the current item (Space).
    ToggleCheck,

    ToggleHelp,

    /// Print the selection and exit.
    Confirm,
    /// Exit without printing anything.
    Cancel,

    // No action
    None,
}

impl KeyAction {
    /// Convert a key event to an action.
    pub fn from_key_event(event: KeyEvent) -> Self {
        match (event.code, event.modifiers) {
            // Cancel
            (KeyCode::Char('q'), KeyModifiers::NONE) => KeyAction::Cancel,
            (KeyCode::Esc, _) => KeyAction::Cancel,
            (KeyCode::Char('q'), KeyModifiers::CONTROL) => KeyAction::Cancel,
            (KeyCode::Char('w'), KeyModifiers::CONTROL) => KeyAction::Cancel,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => KeyAction::Cancel,

            // Confirm
            (KeyCode::Enter, _) => KeyAction::Confirm,
            (KeyCode::Char('y'), KeyModifiers::NONE) => KeyAction::Confirm,

            // Navigation - vim style
            (KeyCode::Char('j'), KeyModifiers::NONE) => KeyAction::MoveDown,
            (KeyCode::Char('k'), KeyModifiers::NONE) => KeyAction::MoveUp,
            (KeyCode::Char('h'), KeyModifiers::NONE) => KeyAction::Collapse,
            (KeyCode::Char('l'), KeyModifiers::NONE) => KeyAction::Expand,

            // Navigation - arrow keys
            (KeyCode::Down, _) => KeyAction::MoveDown,
            (KeyCode::Up, _) => KeyAction::MoveUp,
            (KeyCode::Left, _) => KeyAction::Collapse,
            (KeyCode::Right, _) => KeyAction::Expand,

            // Jump
            (KeyCode::Char('g'), KeyModifiers::NONE) => KeyAction::JumpToTop,
            (KeyCode::Char('G'), KeyModifiers::SHIFT) => KeyAction::JumpToBottom,
            (KeyCode::Char('G'), KeyModifiers::NONE) => KeyAction::JumpToBottom,
            (KeyCode::Home, _) => KeyAction::JumpToTop,
            (KeyCode::End, _) => KeyAction::JumpToBottom,

            // Page navigation
            (KeyCode::PageUp, _) => KeyAction::PageUp,
            (KeyCode::PageDown, _) => KeyAction::PageDown,
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => KeyAction::PageUp,
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => KeyAction::PageDown,

            (KeyCode::Char(' '), KeyModifiers::NONE) => KeyAction::ToggleCheck,
            (KeyCode::Char('?'), _) => KeyAction::ToggleHelp,

            _ => KeyAction::None,
        }
    }
}

/// A section of key bindings for the help display.
pub struct HelpSection {
    pub title: &'static str,
    pub bindings: Vec<KeyBinding>,
}

/// Key binding for display in help.
pub struct KeyBinding {
    pub keys: &'static str,
    pub description: &'static str,
}

/// Get all key bindings organized by section for help display.
pub fn get_help_sections() -> Vec<HelpSection> {
    vec![
        HelpSection {
            title: "Navigation",
            bindings: vec![
                KeyBinding { keys: "j/k ↑/↓", description: "Move up/down" },
                KeyBinding { keys: "l →", description: "Expand directory" },
                KeyBinding { keys: "h ←", description: "Collapse / go to parent" },
                KeyBinding { keys: "g/G", description: "Jump to top/bottom" },
                KeyBinding { keys: "Ctrl-u/d", description: "Page up/down" },
            ],
        },
        HelpSection {
            title: "Selection",
            bindings: vec![
                KeyBinding { keys: "Space", description: "Toggle checkbox" },
                KeyBinding { keys: "Enter/y", description: "Print selection and exit" },
                KeyBinding { keys: "q/Esc", description: "Exit without printing" },
                KeyBinding { keys: "?", description: "Show this help" },
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_confirm_and_cancel_keys() {
        assert_eq!(
            KeyAction::from_key_event(key(KeyCode::Enter, KeyModifiers::CONTROL)),
            KeyAction::Confirm
        );
        assert_eq!(
            KeyAction::from_key_event(key(KeyCode::Char('w'), KeyModifiers::CONTROL)),
            KeyAction::Cancel
        );
        assert_eq!(
            KeyAction::from_key_event(key(KeyCode::Esc, KeyModifiers::NONE)),
            KeyAction::Cancel
        );
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(
            KeyAction::from_key_event(key(KeyCode::Char('l'), KeyModifiers::NONE)),
            KeyAction::Expand
        );
        assert_eq!(
            KeyAction::from_key_event(key(KeyCode::Left, KeyModifiers::NONE)),
            KeyAction::Collapse
        );
        assert_eq!(
            KeyAction::from_key_event(key(KeyCode::Char(' '), KeyModifiers::NONE)),
            KeyAction::ToggleCheck
        );
        assert_eq!(
            KeyAction::from_key_event(key(KeyCode::Char('z'), KeyModifiers::NONE)),
            KeyAction::None
        );
    }
}
