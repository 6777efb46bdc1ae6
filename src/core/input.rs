use std::fmt;

/// Key identifier, independent of the windowing backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable key, lowercased
    Char(char),
    Escape,
    Space,
    Enter,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::Escape => write!(f, "esc"),
            Key::Space => write!(f, "space"),
            Key::Enter => write!(f, "enter"),
        }
    }
}

/// What a key press asks the viewer to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    TogglePlay,
    /// Step while paused (threaded viewer) or next image (slideshow)
    Next,
    Previous,
    Help,
    /// Key consumed by a pending `wait_key`
    Captured(Key),
    /// Key handled by a caller-supplied binding
    Custom(Key),
    Unbound(Key),
}

impl Command {
    fn describe(self) -> &'static str {
        match self {
            Command::Quit => "close window",
            Command::TogglePlay => "toggle play",
            Command::Next => "next image",
            Command::Previous => "previous image",
            Command::Help => "show help",
            Command::Captured(_) | Command::Custom(_) | Command::Unbound(_) => "",
        }
    }
}

/// Translates key presses into viewer commands
#[derive(Debug, Clone)]
pub struct InputHandler {
    bindings: Vec<(Key, Command)>,
}

impl InputHandler {
    /// Bindings of the threaded viewer: h, q, n, s (+ esc to quit)
    pub fn threaded() -> Self {
        Self {
            bindings: vec![
                (Key::Char('h'), Command::Help),
                (Key::Char('q'), Command::Quit),
                (Key::Char('n'), Command::Next),
                (Key::Char('s'), Command::TogglePlay),
                (Key::Escape, Command::Quit),
            ],
        }
    }

    /// Bindings for a single still image: h, q (+ esc)
    pub fn still() -> Self {
        Self {
            bindings: vec![
                (Key::Char('h'), Command::Help),
                (Key::Char('q'), Command::Quit),
                (Key::Escape, Command::Quit),
            ],
        }
    }

    /// Bindings of the slideshow viewer: adds p for previous
    pub fn slideshow() -> Self {
        let mut handler = Self::threaded();
        handler.bind(Key::Char('p'), Command::Previous);
        handler
    }

    /// Bind or rebind a key
    pub fn bind(&mut self, key: Key, command: Command) {
        match self.bindings.iter_mut().find(|(bound, _)| *bound == key) {
            Some(entry) => entry.1 = command,
            None => self.bindings.push((key, command)),
        }
    }

    pub fn handle(&self, key: Key) -> Command {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|&(_, command)| command)
            .unwrap_or(Command::Unbound(key))
    }

    /// Help text listing the bindings
    pub fn usage(&self) -> String {
        let mut text = String::from("Usage:");
        for (key, command) in &self.bindings {
            if *key == Key::Escape {
                continue;
            }
            text.push_str(&format!("\n\t{key}: {}", command.describe()));
        }
        text
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::threaded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threaded_bindings() {
        let input = InputHandler::threaded();
        assert_eq!(input.handle(Key::Char('q')), Command::Quit);
        assert_eq!(input.handle(Key::Escape), Command::Quit);
        assert_eq!(input.handle(Key::Char('s')), Command::TogglePlay);
        assert_eq!(input.handle(Key::Char('n')), Command::Next);
        assert_eq!(input.handle(Key::Char('h')), Command::Help);
        assert_eq!(input.handle(Key::Char('p')), Command::Unbound(Key::Char('p')));
    }

    #[test]
    fn test_still_image_only_quits_and_helps() {
        let input = InputHandler::still();
        assert_eq!(input.handle(Key::Char('q')), Command::Quit);
        assert_eq!(input.handle(Key::Char('h')), Command::Help);
        assert_eq!(input.handle(Key::Char('n')), Command::Unbound(Key::Char('n')));
        assert_eq!(input.handle(Key::Char('s')), Command::Unbound(Key::Char('s')));
    }

    #[test]
    fn test_slideshow_adds_previous() {
        let input = InputHandler::slideshow();
        assert_eq!(input.handle(Key::Char('p')), Command::Previous);
        assert_eq!(input.handle(Key::Char('n')), Command::Next);
    }

    #[test]
    fn test_rebinding_replaces() {
        let mut input = InputHandler::threaded();
        input.bind(Key::Space, Command::TogglePlay);
        input.bind(Key::Char('q'), Command::Help);
        assert_eq!(input.handle(Key::Space), Command::TogglePlay);
        assert_eq!(input.handle(Key::Char('q')), Command::Help);
    }

    #[test]
    fn test_usage_lists_bindings() {
        let usage = InputHandler::slideshow().usage();
        assert!(usage.starts_with("Usage:"));
        assert!(usage.contains("h: show help"));
        assert!(usage.contains("q: close window"));
        assert!(usage.contains("n: next image"));
        assert!(usage.contains("s: toggle play"));
        assert!(usage.contains("p: previous image"));
        assert!(!usage.contains("esc"));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::Char('x').to_string(), "x");
        assert_eq!(Key::Escape.to_string(), "esc");
    }
}
