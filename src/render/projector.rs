//! Text projection of the screen
//!
//! Flattens scrollback and the visible grid into the plain text a display
//! surface shows, and remembers the last result so unchanged frames can be
//! skipped.

use crate::terminal::{line_text, Cursor, Screen};
use log::trace;
use serde::Serialize;

/// Result of one projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection<'a> {
    /// Scrollback then grid, one line per row, trailing blanks removed
    pub text: &'a str,

    /// False when `text` is byte-identical to the previous projection
    pub changed: bool,

    /// Rows were scrolled off or the line count grew since last time
    pub appended: bool,

    pub line_count: usize,
}

/// Caching projector; one per session
#[derive(Debug, Default)]
pub struct Projector {
    last_text: String,
    line_count: usize,
    lines_scrolled: u64,
    projected_once: bool,
}

impl Projector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project `screen` to text
    ///
    /// When nothing visible changed the cached text is returned with
    /// `changed` false.
    pub fn project(&mut self, screen: &Screen) -> Projection<'_> {
        let (text, line_count) = flatten(screen);
        let changed = !self.projected_once || text != self.last_text;

        if changed {
            let appended = screen.lines_scrolled() > self.lines_scrolled
                || line_count > self.line_count;
            trace!(
                "Projection changed: {} lines, appended={}",
                line_count,
                appended
            );

            self.last_text = text;
            self.line_count = line_count;
            self.lines_scrolled = screen.lines_scrolled();
            self.projected_once = true;

            return Projection {
                text: &self.last_text,
                changed: true,
                appended,
                line_count,
            };
        }

        self.lines_scrolled = screen.lines_scrolled();
        Projection {
            text: &self.last_text,
            changed: false,
            appended: false,
            line_count: self.line_count,
        }
    }

    /// Text of the most recent projection
    pub fn last_text(&self) -> &str {
        &self.last_text
    }

    /// Forget the cache so the next projection reports a change
    pub fn invalidate(&mut self) {
        self.projected_once = false;
    }
}

/// Flatten scrollback (oldest first) and grid rows into text
///
/// Each row is right-trimmed and trailing empty rows are dropped.
pub fn flatten(screen: &Screen) -> (String, usize) {
    let mut lines: Vec<String> = screen
        .scrollback()
        .chain(screen.visible_rows())
        .map(line_text)
        .collect();

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    let count = lines.len();
    (lines.join("\n"), count)
}

/// Serializable view of a screen, for headless consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenSnapshot {
    pub text: String,
    pub cursor: Cursor,
    pub cols: u16,
    pub rows: u16,
    pub scrollback_lines: usize,
    pub alternate_screen: bool,
    pub cursor_visible: bool,
}

impl ScreenSnapshot {
    pub fn capture(screen: &Screen) -> Self {
        let (text, _) = flatten(screen);
        Self {
            text,
            cursor: screen.cursor(),
            cols: screen.cols(),
            rows: screen.rows(),
            scrollback_lines: screen.scrollback_len(),
            alternate_screen: screen.is_alternate(),
            cursor_visible: screen.cursor_visible(),
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
