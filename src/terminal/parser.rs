//! Escape sequence parser
//!
//! A byte-at-a-time state machine over the VT/xterm control grammar. The
//! parser keeps its state between `advance` calls, so a sequence split
//! across several reads is only dispatched once all of its bytes arrived.
//! Nothing here fails: bytes that cannot start or continue a sequence are
//! dropped and parsing resumes at the next byte.

use log::trace;

/// Maximum number of CSI parameters kept; extra ones are ignored
pub const MAX_PARAMS: usize = 32;

/// Maximum OSC/DCS payload kept; the rest is consumed and dropped
pub const MAX_STRING_LEN: usize = 4096;

const REPLACEMENT: char = '\u{FFFD}';

/// Receiver of parsed actions
///
/// Mirrors the split used by VT parsers: printable characters, C0 controls,
/// and complete CSI/ESC/OSC sequences.
pub trait Perform {
    /// A printable character in the ground state
    fn print(&mut self, c: char);

    /// A C0 control byte
    fn execute(&mut self, byte: u8);

    /// A complete control sequence (`ESC [ ... action`)
    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], action: char);

    /// A complete escape sequence (`ESC intermediates byte`)
    fn esc_dispatch(&mut self, intermediates: &[u8], byte: u8);

    /// A complete operating system command payload
    fn osc_dispatch(&mut self, _data: &[u8]) {}
}

/// Parser state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParserState {
    #[default]
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    /// Malformed CSI; consume until its final byte
    CsiIgnore,
    OscString,
    /// ESC seen inside an OSC string, waiting for `\`
    OscEscape,
    /// DCS/SOS/PM/APC payload, consumed and dropped
    StringIgnore,
    StringEscape,
}

/// Numeric parameters of a control sequence
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    values: Vec<u16>,
    private: Option<u8>,
}

impl Params {
    /// Raw parameter, `None` if absent
    pub fn get(&self, index: usize) -> Option<u16> {
        self.values.get(index).copied()
    }

    /// Parameter with a default for absent or zero values (count semantics)
    pub fn count(&self, index: usize, default: u16) -> u16 {
        match self.get(index) {
            None | Some(0) => default,
            Some(n) => n,
        }
    }

    /// Parameter with a default for absent values only (selector semantics)
    pub fn mode(&self, index: usize, default: u16) -> u16 {
        self.get(index).unwrap_or(default)
    }

    /// Private marker byte (`?`, `>`, `<`, `=`) if present
    pub fn private(&self) -> Option<u8> {
        self.private
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn clear(&mut self) {
        self.values.clear();
        self.private = None;
    }
}

#[derive(Default)]
struct Utf8Decoder {
    buf: [u8; 4],
    len: usize,
    need: usize,
}

impl Utf8Decoder {
    fn in_progress(&self) -> bool {
        self.need > 0
    }

    /// Start a multibyte sequence; returns false for bytes that cannot lead one
    fn start(&mut self, byte: u8) -> bool {
        let need = match byte {
            0xC2..=0xDF => 1,
            0xE0..=0xEF => 2,
            0xF0..=0xF4 => 3,
            _ => return false,
        };
        self.buf[0] = byte;
        self.len = 1;
        self.need = need;
        true
    }

    /// Add a continuation byte; yields the char once complete
    fn push(&mut self, byte: u8) -> Option<char> {
        self.buf[self.len] = byte;
        self.len += 1;
        self.need -= 1;
        if self.need > 0 {
            return None;
        }
        let decoded = std::str::from_utf8(&self.buf[..self.len])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(REPLACEMENT);
        self.reset();
        Some(decoded)
    }

    fn reset(&mut self) {
        self.len = 0;
        self.need = 0;
    }
}

/// VT escape sequence state machine
#[derive(Default)]
pub struct Parser {
    state: ParserState,
    params: Params,
    /// Digits of the parameter being collected; `None` before the first digit
    current: Option<u32>,
    /// Whether any parameter bytes were seen in this sequence
    saw_param: bool,
    intermediates: Vec<u8>,
    osc: Vec<u8>,
    utf8: Utf8Decoder,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Drop any partially collected sequence and return to ground
    pub fn reset(&mut self) {
        self.state = ParserState::Ground;
        self.clear_sequence();
        self.osc.clear();
        self.utf8.reset();
    }

    /// Feed bytes through the state machine
    pub fn advance<P: Perform>(&mut self, performer: &mut P, bytes: &[u8]) {
        for &byte in bytes {
            self.advance_byte(performer, byte);
        }
    }

    fn advance_byte<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        if self.utf8.in_progress() {
            if (0x80..=0xBF).contains(&byte) {
                if let Some(c) = self.utf8.push(byte) {
                    performer.print(c);
                }
                return;
            }
            // Truncated sequence: emit a replacement and reprocess this byte
            self.utf8.reset();
            performer.print(REPLACEMENT);
        }

        match byte {
            // CAN and SUB abort whatever sequence is in progress
            0x18 | 0x1A => {
                if self.state != ParserState::Ground {
                    trace!("Sequence aborted by 0x{:02x} in {:?}", byte, self.state);
                }
                self.state = ParserState::Ground;
                self.osc.clear();
                return;
            }
            0x1B => {
                match self.state {
                    ParserState::OscString => self.state = ParserState::OscEscape,
                    ParserState::StringIgnore => self.state = ParserState::StringEscape,
                    ParserState::OscEscape => {
                        self.dispatch_osc(performer);
                        self.enter_escape();
                    }
                    _ => self.enter_escape(),
                }
                return;
            }
            _ => {}
        }

        match self.state {
            ParserState::Ground => self.ground(performer, byte),
            ParserState::Escape => self.escape(performer, byte),
            ParserState::EscapeIntermediate => self.escape_intermediate(performer, byte),
            ParserState::CsiEntry => self.csi_entry(performer, byte),
            ParserState::CsiParam => self.csi_param(performer, byte),
            ParserState::CsiIntermediate => self.csi_intermediate(performer, byte),
            ParserState::CsiIgnore => self.csi_ignore(performer, byte),
            ParserState::OscString => self.osc_string(performer, byte),
            ParserState::OscEscape => self.osc_escape(performer, byte),
            ParserState::StringIgnore => {
                if byte == 0x07 {
                    self.state = ParserState::Ground;
                }
            }
            ParserState::StringEscape => {
                if byte == b'\\' {
                    self.state = ParserState::Ground;
                } else {
                    self.enter_escape();
                    self.escape(performer, byte);
                }
            }
        }
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.intermediates.clear();
        self.current = None;
        self.saw_param = false;
    }

    fn enter_escape(&mut self) {
        self.state = ParserState::Escape;
        self.clear_sequence();
    }

    fn ground<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        match byte {
            0x00..=0x1F => performer.execute(byte),
            0x20..=0x7E => performer.print(byte as char),
            0x7F => {}
            _ => {
                if !self.utf8.start(byte) {
                    performer.print(REPLACEMENT);
                }
            }
        }
    }

    fn escape<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        match byte {
            0x00..=0x1F => performer.execute(byte),
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::EscapeIntermediate;
            }
            b'[' => {
                self.clear_sequence();
                self.state = ParserState::CsiEntry;
            }
            b']' => {
                self.osc.clear();
                self.state = ParserState::OscString;
            }
            b'P' | b'X' | b'^' | b'_' => self.state = ParserState::StringIgnore,
            0x30..=0x7E => {
                performer.esc_dispatch(&[], byte);
                self.state = ParserState::Ground;
            }
            0x7F => {}
            _ => self.state = ParserState::Ground,
        }
    }

    fn escape_intermediate<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        match byte {
            0x00..=0x1F => performer.execute(byte),
            0x20..=0x2F => {
                if self.intermediates.len() < 2 {
                    self.intermediates.push(byte);
                }
            }
            0x30..=0x7E => {
                performer.esc_dispatch(&self.intermediates, byte);
                self.state = ParserState::Ground;
            }
            0x7F => {}
            _ => self.state = ParserState::Ground,
        }
    }

    fn csi_entry<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        match byte {
            0x3C..=0x3F => {
                self.params.private = Some(byte);
                self.state = ParserState::CsiParam;
            }
            b'0'..=b'9' | b';' | b':' => {
                self.state = ParserState::CsiParam;
                self.csi_param(performer, byte);
            }
            _ => self.csi_common(performer, byte),
        }
    }

    fn csi_param<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        match byte {
            b'0'..=b'9' => {
                self.saw_param = true;
                let digit = (byte - b'0') as u32;
                let value = self.current.unwrap_or(0).saturating_mul(10).saturating_add(digit);
                self.current = Some(value.min(u16::MAX as u32));
            }
            // Sub-parameters are flattened into the main list
            b';' | b':' => {
                self.saw_param = true;
                self.finish_param();
            }
            0x3C..=0x3F => self.state = ParserState::CsiIgnore,
            _ => self.csi_common(performer, byte),
        }
    }

    fn csi_intermediate<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        match byte {
            0x30..=0x3F => self.state = ParserState::CsiIgnore,
            _ => self.csi_common(performer, byte),
        }
    }

    /// Transitions shared by every CSI collecting state
    fn csi_common<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        match byte {
            0x00..=0x1F => performer.execute(byte),
            0x20..=0x2F => {
                if self.intermediates.len() < 2 {
                    self.intermediates.push(byte);
                }
                self.state = ParserState::CsiIntermediate;
            }
            0x40..=0x7E => {
                if self.saw_param {
                    self.finish_param();
                }
                performer.csi_dispatch(&self.params, &self.intermediates, byte as char);
                self.state = ParserState::Ground;
            }
            0x7F => {}
            _ => self.state = ParserState::CsiIgnore,
        }
    }

    fn csi_ignore<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        match byte {
            0x00..=0x1F => performer.execute(byte),
            0x40..=0x7E => {
                trace!("Dropped malformed CSI ending in '{}'", byte as char);
                self.state = ParserState::Ground;
            }
            _ => {}
        }
    }

    fn finish_param(&mut self) {
        let value = self.current.take().unwrap_or(0) as u16;
        if self.params.values.len() < MAX_PARAMS {
            self.params.values.push(value);
        }
    }

    fn osc_string<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        match byte {
            0x07 => {
                self.dispatch_osc(performer);
                self.state = ParserState::Ground;
            }
            0x00..=0x1F => {}
            _ => {
                if self.osc.len() < MAX_STRING_LEN {
                    self.osc.push(byte);
                }
            }
        }
    }

    fn osc_escape<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        self.dispatch_osc(performer);
        if byte == b'\\' {
            self.state = ParserState::Ground;
        } else {
            self.enter_escape();
            self.escape(performer, byte);
        }
    }

    fn dispatch_osc<P: Perform>(&mut self, performer: &mut P) {
        performer.osc_dispatch(&self.osc);
        self.osc.clear();
    }
}
