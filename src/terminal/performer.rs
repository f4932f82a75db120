//! Performer implementation
//!
//! Separated from Emulator to avoid borrow checker issues: the parser is
//! borrowed mutably while it drives the performer, which in turn borrows
//! the screen.

use super::parser::{Params, Perform};
use super::screen::{Erase, Motion};
use super::{Color, Screen};
use log::trace;

/// Performer that updates the screen buffer in response to terminal sequences
///
/// Replies the terminal owes the child (cursor position reports, device
/// attributes) are appended to `replies` for the session to write back.
pub struct ScreenPerformer<'a> {
    pub screen: &'a mut Screen,
    pub replies: &'a mut Vec<u8>,
}

impl<'a> ScreenPerformer<'a> {
    /// Select Graphic Rendition
    fn sgr(&mut self, params: &Params) {
        let values = params.as_slice();
        if values.is_empty() {
            self.screen.pen_mut().reset();
            return;
        }

        let mut i = 0;
        while i < values.len() {
            let pen = self.screen.pen_mut();
            match values[i] {
                0 => pen.reset(),
                1 => pen.bold = true,
                4 => pen.underline = true,
                7 => pen.inverse = true,
                22 => pen.bold = false,
                24 => pen.underline = false,
                27 => pen.inverse = false,
                n @ 30..=37 => pen.fg = Color::Indexed((n - 30) as u8),
                38 => {
                    let (color, used) = extended_color(&values[i + 1..]);
                    if let Some(color) = color {
                        pen.fg = color;
                    }
                    i += used;
                }
                39 => pen.fg = Color::Default,
                n @ 40..=47 => pen.bg = Color::Indexed((n - 40) as u8),
                48 => {
                    let (color, used) = extended_color(&values[i + 1..]);
                    if let Some(color) = color {
                        pen.bg = color;
                    }
                    i += used;
                }
                49 => pen.bg = Color::Default,
                n @ 90..=97 => pen.fg = Color::Indexed((n - 90 + 8) as u8),
                n @ 100..=107 => pen.bg = Color::Indexed((n - 100 + 8) as u8),
                other => trace!("Unhandled SGR {}", other),
            }
            i += 1;
        }
    }

    /// DEC private modes (CSI ? n h / CSI ? n l)
    fn set_private_modes(&mut self, params: &Params, enable: bool) {
        for &mode in params.as_slice() {
            match mode {
                7 => self.screen.set_autowrap(enable),
                25 => self.screen.set_cursor_visible(enable),
                47 | 1047 => {
                    if enable {
                        self.screen.enter_alternate_screen();
                    } else {
                        self.screen.leave_alternate_screen();
                    }
                }
                1049 => {
                    if enable {
                        self.screen.save_cursor();
                        self.screen.enter_alternate_screen();
                        self.screen.erase(Erase::Display);
                    } else {
                        self.screen.leave_alternate_screen();
                        self.screen.restore_cursor();
                    }
                }
                other => trace!("Ignoring private mode {} = {}", other, enable),
            }
        }
    }

    fn reply(&mut self, bytes: &[u8]) {
        self.replies.extend_from_slice(bytes);
    }
}

/// Parse the tail of an extended color (`38;5;n` or `38;2;r;g;b`)
///
/// Returns the color, if any, and how many parameters were consumed.
/// 24-bit colors are consumed and mapped to the default color.
fn extended_color(rest: &[u16]) -> (Option<Color>, usize) {
    match rest.first() {
        Some(5) => match rest.get(1) {
            Some(&n) => (Some(Color::Indexed(n.min(255) as u8)), 2),
            None => (None, 1),
        },
        Some(2) => (Some(Color::Default), rest.len().min(4)),
        _ => (None, 0),
    }
}

impl<'a> Perform for ScreenPerformer<'a> {
    fn print(&mut self, c: char) {
        self.screen.put_char(c);
    }

    /// Execute a control character (e.g., \n, \r, \t)
    fn execute(&mut self, byte: u8) {
        match byte {
            // LF, VT and FF all move down one line; CR is separate
            b'\n' | 0x0B | 0x0C => self.screen.linefeed(),
            b'\r' => self.screen.carriage_return(),
            b'\t' => self.screen.tab(),
            0x08 => self.screen.backspace(),
            0x07 => {}
            _ => trace!("Unhandled execute: 0x{:02x}", byte),
        }
    }

    /// Handle CSI sequences
    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], action: char) {
        if !intermediates.is_empty() {
            match (intermediates, action) {
                // DECSTR - soft terminal reset
                ([b'!'], 'p') => self.screen.soft_reset(),
                _ => trace!("Unhandled CSI {:?} {}", intermediates, action),
            }
            return;
        }

        match params.private() {
            None => {}
            Some(b'?') => {
                match action {
                    'h' => self.set_private_modes(params, true),
                    'l' => self.set_private_modes(params, false),
                    _ => trace!("Unhandled private CSI ? {}", action),
                }
                return;
            }
            Some(b'>') if action == 'c' => {
                // Secondary device attributes
                self.reply(b"\x1b[>1;10;0c");
                return;
            }
            Some(marker) => {
                trace!("Unhandled CSI {} {}", marker as char, action);
                return;
            }
        }

        let screen = &mut *self.screen;
        match action {
            // Cursor movement
            'A' => screen.move_cursor(Motion::Up(params.count(0, 1))),
            'B' | 'e' => screen.move_cursor(Motion::Down(params.count(0, 1))),
            'C' | 'a' => screen.move_cursor(Motion::Right(params.count(0, 1))),
            'D' => screen.move_cursor(Motion::Left(params.count(0, 1))),
            'E' => {
                screen.move_cursor(Motion::Down(params.count(0, 1)));
                screen.move_cursor(Motion::LineStart);
            }
            'F' => {
                screen.move_cursor(Motion::Up(params.count(0, 1)));
                screen.move_cursor(Motion::LineStart);
            }
            'G' | '`' => screen.move_cursor(Motion::Col(params.count(0, 1) - 1)),
            'd' => screen.move_cursor(Motion::Row(params.count(0, 1) - 1)),
            'H' | 'f' => screen.move_cursor(Motion::To {
                row: params.count(0, 1) - 1,
                col: params.count(1, 1) - 1,
            }),

            // Erasing
            'J' => match params.mode(0, 0) {
                0 => screen.erase(Erase::DisplayToEnd),
                1 => screen.erase(Erase::DisplayToStart),
                2 => screen.erase(Erase::Display),
                3 => screen.clear_scrollback(),
                other => trace!("Unhandled ED mode {}", other),
            },
            'K' => match params.mode(0, 0) {
                0 => screen.erase(Erase::LineToEnd),
                1 => screen.erase(Erase::LineToStart),
                2 => screen.erase(Erase::Line),
                other => trace!("Unhandled EL mode {}", other),
            },
            'X' => screen.erase_chars(params.count(0, 1)),

            // Scrolling and editing
            'S' => screen.scroll_up(params.count(0, 1)),
            'T' => screen.scroll_down(params.count(0, 1)),
            'L' => screen.insert_lines(params.count(0, 1)),
            'M' => screen.delete_lines(params.count(0, 1)),
            '@' => screen.insert_chars(params.count(0, 1)),
            'P' => screen.delete_chars(params.count(0, 1)),
            'r' => screen.set_scroll_region(params.mode(0, 1), params.mode(1, 0)),

            'm' => self.sgr(params),

            // SCOSC / SCORC
            's' => screen.save_cursor(),
            'u' => screen.restore_cursor(),

            // Device status reports
            'n' => match params.mode(0, 0) {
                5 => self.reply(b"\x1b[0n"),
                6 => {
                    let cursor = screen.cursor();
                    let report = format!("\x1b[{};{}R", cursor.row + 1, cursor.col + 1);
                    self.reply(report.as_bytes());
                }
                other => trace!("Unhandled DSR {}", other),
            },
            'c' if params.mode(0, 0) == 0 => self.reply(b"\x1b[?62;c"),

            _ => trace!("Unhandled CSI: {} with {:?}", action, params.as_slice()),
        }
    }

    /// Handle ESC sequences
    ///
    /// - ESC 7 (DECSC) / ESC 8 (DECRC): save / restore cursor
    /// - ESC D (IND): index
    /// - ESC E (NEL): next line
    /// - ESC M (RI): reverse index
    /// - ESC c (RIS): full reset
    fn esc_dispatch(&mut self, intermediates: &[u8], byte: u8) {
        // Charset designations and DEC line attributes are consumed
        if !intermediates.is_empty() {
            trace!("ESC with intermediates {:?} byte {}", intermediates, byte);
            return;
        }

        match byte {
            b'7' => self.screen.save_cursor(),
            b'8' => self.screen.restore_cursor(),
            b'D' => self.screen.linefeed(),
            b'E' => {
                self.screen.carriage_return();
                self.screen.linefeed();
            }
            b'M' => self.screen.reverse_index(),
            b'c' => self.screen.reset(),
            _ => trace!("Unhandled ESC: 0x{:02x} ('{}')", byte, byte as char),
        }
    }

    fn osc_dispatch(&mut self, data: &[u8]) {
        trace!("Discarding OSC ({} bytes)", data.len());
    }
}
