//! Terminal emulator
//!
//! Couples the escape-sequence parser with the screen model. Bytes from
//! the child go in through `feed`; the screen is the only thing they change.

use super::parser::{Parser, ParserState};
use super::performer::ScreenPerformer;
use super::screen::Cursor;
use super::Screen;
use log::{debug, trace};

/// Terminal emulator that processes escape sequences into a screen buffer
///
/// Parser state survives between `feed` calls, so it does not matter how
/// the byte stream was chunked by the pipe.
pub struct Emulator {
    screen: Screen,

    parser: Parser,

    /// Bytes the terminal must send back to the child (DSR/DA replies)
    replies: Vec<u8>,
}

impl Emulator {
    /// Create a new terminal emulator
    pub fn new(cols: u16, rows: u16, max_scrollback: usize) -> Self {
        debug!(
            "Creating emulator with {}x{} dimensions, {} lines of scrollback",
            cols, rows, max_scrollback
        );
        Self {
            screen: Screen::new(cols, rows, max_scrollback),
            parser: Parser::new(),
            replies: Vec::new(),
        }
    }

    /// Process bytes from the PTY
    ///
    /// Never fails: unknown or malformed sequences are dropped and parsing
    /// resumes with the next byte.
    pub fn feed(&mut self, bytes: &[u8]) {
        trace!("Processing {} bytes from PTY", bytes.len());

        let mut performer = ScreenPerformer {
            screen: &mut self.screen,
            replies: &mut self.replies,
        };
        self.parser.advance(&mut performer, bytes);
    }

    /// Take any replies queued for the child since the last call
    pub fn take_replies(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.replies)
    }

    /// Resize the emulator
    pub fn resize(&mut self, cols: u16, rows: u16) {
        debug!("Resizing emulator to {}x{}", cols, rows);
        self.screen.resize(cols, rows);
    }

    /// Abandon any half-parsed sequence (stream resynchronization)
    pub fn reset_parser(&mut self) {
        if self.parser.state() != ParserState::Ground {
            debug!("Resetting parser from {:?}", self.parser.state());
        }
        self.parser.reset();
    }

    pub fn parser_state(&self) -> ParserState {
        self.parser.state()
    }

    pub fn cursor(&self) -> Cursor {
        self.screen.cursor()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }
}
