use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{Key as WinitKey, NamedKey};

use super::input::Key;

/// Map a winit key event to a viewer key. Releases and auto-repeats are ignored.
pub fn key_from_event(event: &KeyEvent) -> Option<Key> {
    if event.state != ElementState::Pressed || event.repeat {
        return None;
    }
    key_from_logical(&event.logical_key)
}

/// Map a winit logical key to a viewer key
pub fn key_from_logical(key: &WinitKey) -> Option<Key> {
    match key {
        WinitKey::Character(text) => match text.as_str() {
            " " => Some(Key::Space),
            text => text.chars().next().map(|c| Key::Char(c.to_ascii_lowercase())),
        },
        WinitKey::Named(NamedKey::Escape) => Some(Key::Escape),
        WinitKey::Named(NamedKey::Space) => Some(Key::Space),
        WinitKey::Named(NamedKey::Enter) => Some(Key::Enter),
        _ => None,
    }
}
