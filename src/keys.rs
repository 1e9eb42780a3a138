// src/keys.rs - Vim key notation ("3dd<Esc>", "<C-v>") to key events

use crate::error::EditorError;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Parse a key-notation string into key events.
///
/// Plain characters map to themselves. Angle-bracket names cover special keys:
/// `<Esc>`, `<CR>`/`<Enter>`, `<BS>`, `<Tab>`, `<Del>`, `<Space>`, `<lt>`,
/// `<Up>`/`<Down>`/`<Left>`/`<Right>` and `<C-x>` for control chords.
/// A `<` that does not start a known name is taken literally.
pub fn parse_keys(notation: &str) -> Result<Vec<KeyEvent>, EditorError> {
    let mut keys = Vec::new();
    let mut rest = notation;
    while let Some(c) = rest.chars().next() {
        if c == '<'
            && let Some(close) = rest.find('>')
            && close > 1
        {
            let name = &rest[1..close];
            if let Some(key) = named_key(name)? {
                keys.push(key);
                rest = &rest[close + 1..];
                continue;
            }
        }
        keys.push(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        rest = &rest[c.len_utf8()..];
    }
    Ok(keys)
}

/// Render one key event in the notation [`parse_keys`] reads.
pub fn key_notation(key: &KeyEvent) -> String {
    let name = match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return format!("<C-{}>", c);
        }
        KeyCode::Char('<') => "lt",
        KeyCode::Char(' ') => "Space",
        KeyCode::Char(c) => return c.to_string(),
        KeyCode::Esc => "Esc",
        KeyCode::Enter => "CR",
        KeyCode::Backspace => "BS",
        KeyCode::Tab => "Tab",
        KeyCode::Delete => "Del",
        KeyCode::Up => "Up",
        KeyCode::Down => "Down",
        KeyCode::Left => "Left",
        KeyCode::Right => "Right",
        other => return format!("<{:?}>", other),
    };
    format!("<{}>", name)
}

fn named_key(name: &str) -> Result<Option<KeyEvent>, EditorError> {
    let plain = |code| Some(KeyEvent::new(code, KeyModifiers::NONE));
    let key = match name.to_ascii_lowercase().as_str() {
        "esc" => plain(KeyCode::Esc),
        "cr" | "enter" | "return" => plain(KeyCode::Enter),
        "bs" | "backspace" => plain(KeyCode::Backspace),
        "tab" => plain(KeyCode::Tab),
        "del" | "delete" => plain(KeyCode::Delete),
        "space" => plain(KeyCode::Char(' ')),
        "lt" => plain(KeyCode::Char('<')),
        "up" => plain(KeyCode::Up),
        "down" => plain(KeyCode::Down),
        "left" => plain(KeyCode::Left),
        "right" => plain(KeyCode::Right),
        lower => match lower.strip_prefix("c-") {
            Some(chord) => {
                let mut chars = chord.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)),
                    _ => return Err(EditorError::InvalidCommand(format!("<{}>", name))),
                }
            }
            None => None,
        },
    };
    Ok(key)
}
