use crate::domain::KeyBindMap;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Represents the result of handling a key event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Quit the application
    Quit,
    /// Show the next image
    Next,
    /// Show the previous image
    Previous,
    /// Move the current image into the bound folder
    MoveTo(String),
    /// Turn background caching on or off
    ToggleCache,
    /// Prompt for another folder to browse
    SelectFolder,
    /// Open the current image in the system viewer
    Open,
    /// Toggle help overlay
    Help,
    /// Toggle key bind overlay
    KeyBinds,
    /// No action
    None,
}

/// Maps keyboard events to actions.
///
/// A key bound to a folder shadows the single-letter commands; Esc and Ctrl+C always quit.
pub fn handle_key_event(key: KeyEvent, binds: &KeyBindMap) -> KeyAction {
    if let (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) = (key.code, key.modifiers)
    {
        if let Some(folder) = binds.folder_for_key(c) {
            return KeyAction::MoveTo(folder.to_string());
        }
    }

    match (key.code, key.modifiers) {
        // Quit: q, Esc or Ctrl+C
        (KeyCode::Char('q'), KeyModifiers::NONE) => KeyAction::Quit,
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => KeyAction::Quit,
        (KeyCode::Esc, KeyModifiers::NONE) => KeyAction::Quit,

        // Navigation
        (KeyCode::Right, KeyModifiers::NONE) => KeyAction::Next,
        (KeyCode::Down, KeyModifiers::NONE) => KeyAction::Next,
        (KeyCode::Char(' '), KeyModifiers::NONE) => KeyAction::Next,
        (KeyCode::Left, KeyModifiers::NONE) => KeyAction::Previous,
        (KeyCode::Up, KeyModifiers::NONE) => KeyAction::Previous,
        (KeyCode::Backspace, KeyModifiers::NONE) => KeyAction::Previous,

        (KeyCode::Char('c'), KeyModifiers::NONE) => KeyAction::ToggleCache,
        (KeyCode::Char('f'), KeyModifiers::NONE) => KeyAction::SelectFolder,
        (KeyCode::Char('o'), KeyModifiers::NONE) => KeyAction::Open,
        (KeyCode::Enter, KeyModifiers::NONE) => KeyAction::Open,

        (KeyCode::Char('?'), KeyModifiers::NONE | KeyModifiers::SHIFT) => KeyAction::Help,
        (KeyCode::Tab, KeyModifiers::NONE) => KeyAction::KeyBinds,

        _ => KeyAction::None,
    }
}

/// Result of a key press while the folder prompt is open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAction {
    /// Open the typed folder
    Submit(String),
    Cancel,
    /// The input line changed or the key was ignored
    Edit,
}

/// Edits the prompt `input` with `key`
pub fn handle_prompt_input(key: KeyEvent, input: &mut String) -> PromptAction {
    match (key.code, key.modifiers) {
        (KeyCode::Enter, _) => PromptAction::Submit(input.trim().to_string()),
        (KeyCode::Esc, _) => PromptAction::Cancel,
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => PromptAction::Cancel,
        (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
            input.clear();
            PromptAction::Edit
        }
        (KeyCode::Backspace, _) => {
            input.pop();
            PromptAction::Edit
        }
        (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
            input.push(c);
            PromptAction::Edit
        }
        _ => PromptAction::Edit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_binds() -> KeyBindMap {
        KeyBindMap::new()
    }

    #[test]
    fn test_key_quit() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::Quit);

        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::Quit);

        let key = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::Quit);
    }

    #[test]
    fn test_key_navigation() {
        let key = KeyEvent::new(KeyCode::Right, KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::Next);

        let key = KeyEvent::new(KeyCode::Down, KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::Next);

        let key = KeyEvent::new(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::Previous);

        let key = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::Previous);
    }

    #[test]
    fn test_key_commands() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::ToggleCache);

        let key = KeyEvent::new(KeyCode::Char('f'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::SelectFolder);

        let key = KeyEvent::new(KeyCode::Char('o'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::Open);

        let key = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::KeyBinds);

        let key = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::Help);
    }

    #[test]
    fn test_bound_key_moves() {
        let mut binds = KeyBindMap::new();
        binds.put('k', "Keep");
        binds.put('D', "Discard");

        let key = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::NONE);
        assert_eq!(
            handle_key_event(key, &binds),
            KeyAction::MoveTo("Keep".to_string())
        );

        let key = KeyEvent::new(KeyCode::Char('D'), KeyModifiers::SHIFT);
        assert_eq!(
            handle_key_event(key, &binds),
            KeyAction::MoveTo("Discard".to_string())
        );
    }

    #[test]
    fn test_bound_key_shadows_command() {
        let mut binds = KeyBindMap::new();
        binds.put('q', "Queue");

        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(
            handle_key_event(key, &binds),
            KeyAction::MoveTo("Queue".to_string())
        );

        // Esc still quits
        let key = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &binds), KeyAction::Quit);
    }

    #[test]
    fn test_key_none() {
        let key = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &no_binds()), KeyAction::None);
    }

    #[test]
    fn test_prompt_editing() {
        let mut input = String::new();
        for c in "/tmp/pics".chars() {
            let key = KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
            assert_eq!(handle_prompt_input(key, &mut input), PromptAction::Edit);
        }
        assert_eq!(input, "/tmp/pics");

        let key = KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE);
        handle_prompt_input(key, &mut input);
        assert_eq!(input, "/tmp/pic");

        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(
            handle_prompt_input(key, &mut input),
            PromptAction::Submit("/tmp/pic".to_string())
        );
    }

    #[test]
    fn test_prompt_cancel_and_clear() {
        let mut input = "abc".to_string();

        let key = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        handle_prompt_input(key, &mut input);
        assert!(input.is_empty());

        let key = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(handle_prompt_input(key, &mut input), PromptAction::Cancel);
    }
}
