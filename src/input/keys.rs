//! Key encoding
//!
//! Turns a key event from the display layer into the bytes a program
//! running under a VT-style terminal expects on its input.

use serde::{Deserialize, Serialize};

/// Ctrl+C (ETX)
pub const CTRL_C: u8 = 0x03;
/// Ctrl+D (EOT)
pub const CTRL_D: u8 = 0x04;
/// Ctrl+L (FF)
pub const CTRL_L: u8 = 0x0c;
/// Ctrl+Z (SUB)
pub const CTRL_Z: u8 = 0x1a;

const ESC: u8 = 0x1b;
const DEL: u8 = 0x7f;

/// Keyboard modifiers held during a key event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        shift: false,
        alt: false,
    };

    pub const ALT: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: true,
    };

    pub fn any(&self) -> bool {
        self.ctrl || self.shift || self.alt
    }
}

/// A key as reported by the display layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Enter,
    Backspace,
    Tab,
    Escape,
    /// Function key F1..F12
    F(u8),
    /// A key that produces a character, identified by that character
    Char(char),
    /// Anything else; only its literal text, if any, is sent
    Other,
}

/// Encode a key event
///
/// `text` is the literal text the platform produced for the event. Never
/// fails; an event that maps to nothing yields an empty vector.
pub fn encode(key: Key, modifiers: Modifiers, text: &str) -> Vec<u8> {
    if let Some(bytes) = encode_special(key) {
        return bytes;
    }

    if modifiers.ctrl {
        if let Some(code) = control_code(key) {
            return alt_prefixed(vec![code], modifiers.alt);
        }
    }

    if text.is_empty() {
        return Vec::new();
    }
    alt_prefixed(text.as_bytes().to_vec(), modifiers.alt)
}

/// Encode pasted text: its raw UTF-8 bytes, nothing added
pub fn encode_paste(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Encode text submitted as a unit
///
/// Returns the text and the Enter key separately. Some programs treat a
/// carriage return arriving in the same read as pasted text as part of
/// the paste, so callers send the second part after a short delay.
pub fn encode_submission(text: &str) -> (Vec<u8>, Vec<u8>) {
    (
        encode_paste(text),
        encode(Key::Enter, Modifiers::NONE, ""),
    )
}

fn encode_special(key: Key) -> Option<Vec<u8>> {
    let bytes: &[u8] = match key {
        Key::Up => b"\x1b[A",
        Key::Down => b"\x1b[B",
        Key::Right => b"\x1b[C",
        Key::Left => b"\x1b[D",
        Key::Home => b"\x1b[H",
        Key::End => b"\x1b[F",
        Key::Insert => b"\x1b[2~",
        Key::Delete => b"\x1b[3~",
        Key::PageUp => b"\x1b[5~",
        Key::PageDown => b"\x1b[6~",
        Key::Enter => b"\r",
        Key::Backspace => &[DEL],
        Key::Tab => b"\t",
        Key::Escape => &[ESC],
        Key::F(n) => return function_key(n),
        Key::Char(_) | Key::Other => return None,
    };
    Some(bytes.to_vec())
}

fn function_key(n: u8) -> Option<Vec<u8>> {
    let bytes: &[u8] = match n {
        1 => b"\x1bOP",
        2 => b"\x1bOQ",
        3 => b"\x1bOR",
        4 => b"\x1bOS",
        5 => b"\x1b[15~",
        6 => b"\x1b[17~",
        7 => b"\x1b[18~",
        8 => b"\x1b[19~",
        9 => b"\x1b[20~",
        10 => b"\x1b[21~",
        11 => b"\x1b[23~",
        12 => b"\x1b[24~",
        _ => return None,
    };
    Some(bytes.to_vec())
}

/// Control byte for Ctrl+`key`, if `key` is a letter
fn control_code(key: Key) -> Option<u8> {
    let Key::Char(c) = key else {
        return None;
    };
    if !c.is_ascii_alphabetic() {
        return None;
    }
    let upper = c.to_ascii_uppercase();

    // These four are what users reach for most; keep them explicit
    Some(match upper {
        'C' => CTRL_C,
        'D' => CTRL_D,
        'Z' => CTRL_Z,
        'L' => CTRL_L,
        _ => upper as u8 - b'A' + 1,
    })
}

fn alt_prefixed(mut bytes: Vec<u8>, alt: bool) -> Vec<u8> {
    if alt {
        bytes.insert(0, ESC);
    }
    bytes
}
