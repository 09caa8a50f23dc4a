use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::scene::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    W,
    A,
    S,
    D,
    Up,
    Down,
    Left,
    Right,
    Escape,
}

const KEY_COUNT: usize = 9;

impl Key {
    pub const ALL: [Key; KEY_COUNT] = [
        Key::W,
        Key::A,
        Key::S,
        Key::D,
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
        Key::Escape,
    ];

    const fn index(self) -> usize {
        match self {
            Key::W => 0,
            Key::A => 1,
            Key::S => 2,
            Key::D => 3,
            Key::Up => 4,
            Key::Down => 5,
            Key::Left => 6,
            Key::Right => 7,
            Key::Escape => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Key::W => "W",
            Key::A => "A",
            Key::S => "S",
            Key::D => "D",
            Key::Up => "UP",
            Key::Down => "DOWN",
            Key::Left => "LEFT",
            Key::Right => "RIGHT",
            Key::Escape => "ESCAPE",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key name '{0}'")]
pub struct UnknownKeyError(pub String);

/// Key names are matched case-insensitively; arrow keys also accept the
/// `Arrow*` spelling.
impl FromStr for Key {
    type Err = UnknownKeyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "W" => Ok(Key::W),
            "A" => Ok(Key::A),
            "S" => Ok(Key::S),
            "D" => Ok(Key::D),
            "UP" | "ARROWUP" => Ok(Key::Up),
            "DOWN" | "ARROWDOWN" => Ok(Key::Down),
            "LEFT" | "ARROWLEFT" => Ok(Key::Left),
            "RIGHT" | "ARROWRIGHT" => Ok(Key::Right),
            "ESCAPE" | "ESC" => Ok(Key::Escape),
            _ => Err(UnknownKeyError(raw.to_string())),
        }
    }
}

impl TryFrom<String> for Key {
    type Error = UnknownKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.name().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct KeyStates {
    down: [bool; KEY_COUNT],
}

impl KeyStates {
    pub(crate) fn set(&mut self, key: Key, is_down: bool) {
        self.down[key.index()] = is_down;
    }

    pub(crate) fn is_down(&self, key: Key) -> bool {
        self.down[key.index()]
    }

    pub(crate) fn clear(&mut self) {
        self.down = [false; KEY_COUNT];
    }
}

/// Accumulates raw key transitions between ticks and hands out one
/// `InputSnapshot` per simulation tick.
#[derive(Debug, Default)]
pub struct InputCollector {
    quit_requested: bool,
    keys: KeyStates,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn handle_key(&mut self, key: Key, is_pressed: bool) {
        self.keys.set(key, is_pressed);
        if key == Key::Escape && is_pressed {
            self.mark_quit_requested();
        }
    }

    pub fn release_all(&mut self) {
        self.keys.clear();
    }

    pub fn snapshot_for_tick(&mut self) -> InputSnapshot {
        InputSnapshot::new(self.quit_requested, self.keys)
    }
}
