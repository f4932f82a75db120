//! Terminal screen buffer
//!
//! The screen holds the authoritative terminal state: a fixed `rows x cols`
//! grid of cells, the cursor, the current pen, and a bounded scrollback of
//! rows that were scrolled off the top of the grid.

use super::{Attributes, Cell};
use log::{debug, trace};
use serde::Serialize;
use std::collections::VecDeque;
use std::iter;
use unicode_width::UnicodeWidthChar;

/// One line of cells
pub type Row = Vec<Cell>;

/// Cursor position, always inside `[0, rows) x [0, cols)`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Cursor {
    pub row: u16,
    pub col: u16,
}

/// Cursor movement request. Out-of-range targets are clamped, never rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    Up(u16),
    Down(u16),
    Left(u16),
    Right(u16),
    /// Absolute position, 0-based
    To { row: u16, col: u16 },
    Row(u16),
    Col(u16),
    Home,
    LineStart,
    LineEnd,
}

/// Erase target, relative to the cursor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Erase {
    LineToEnd,
    LineToStart,
    Line,
    DisplayToEnd,
    DisplayToStart,
    Display,
}

#[derive(Clone, Copy, Debug)]
struct SavedCursor {
    cursor: Cursor,
    attrs: Attributes,
    wrap_pending: bool,
}

/// Terminal screen buffer
pub struct Screen {
    /// Visible grid: buffer[row][col]
    buffer: VecDeque<Row>,

    cursor: Cursor,

    /// Terminal dimensions (cols, rows)
    size: (u16, u16),

    /// Rendition applied to newly printed characters
    pen: Attributes,

    /// Set after printing into the last column; the next printable wraps first
    wrap_pending: bool,

    /// DECAWM
    autowrap: bool,

    /// DECTCEM
    cursor_visible: bool,

    /// Scroll region (top, bottom), 0-based and inclusive.
    /// `None` means the whole screen.
    scroll_region: Option<(u16, u16)>,

    saved_cursor: Option<SavedCursor>,

    /// Primary grid stashed while the alternate screen is shown
    primary: Option<VecDeque<Row>>,

    /// Rows evicted off the top, oldest first
    scrollback: VecDeque<Row>,

    max_scrollback: usize,

    /// Total rows ever pushed into scrollback (monotonic, survives eviction)
    lines_scrolled: u64,
}

fn blank_row(cols: u16) -> Row {
    vec![Cell::new(); cols as usize]
}

fn blank_grid(cols: u16, rows: u16) -> VecDeque<Row> {
    (0..rows).map(|_| blank_row(cols)).collect()
}

fn resize_grid(grid: &mut VecDeque<Row>, cols: u16, rows: u16) {
    grid.truncate(rows as usize);
    while grid.len() < rows as usize {
        grid.push_back(blank_row(cols));
    }
    for row in grid.iter_mut() {
        row.resize(cols as usize, Cell::new());
    }
}

/// Render a row of cells as text, skipping wide-character continuations
/// and stripping trailing blanks.
pub fn line_text(cells: &[Cell]) -> String {
    let line: String = cells
        .iter()
        .filter(|cell| !cell.is_wide_continuation)
        .map(|cell| cell.data)
        .collect();
    line.trim_end_matches(' ').to_string()
}

impl Screen {
    /// Create a new screen buffer. Zero dimensions are raised to 1.
    pub fn new(cols: u16, rows: u16, max_scrollback: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);

        Self {
            buffer: blank_grid(cols, rows),
            cursor: Cursor::default(),
            size: (cols, rows),
            pen: Attributes::default(),
            wrap_pending: false,
            autowrap: true,
            cursor_visible: true,
            scroll_region: None,
            saved_cursor: None,
            primary: None,
            scrollback: VecDeque::new(),
            max_scrollback,
            lines_scrolled: 0,
        }
    }

    pub fn cols(&self) -> u16 {
        self.size.0
    }

    pub fn rows(&self) -> u16 {
        self.size.1
    }

    /// Terminal dimensions as (cols, rows)
    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn pen(&self) -> Attributes {
        self.pen
    }

    pub fn pen_mut(&mut self) -> &mut Attributes {
        &mut self.pen
    }

    /// Replace the current pen (SGR state)
    pub fn set_attributes(&mut self, attrs: Attributes) {
        self.pen = attrs;
    }

    pub fn wrap_pending(&self) -> bool {
        self.wrap_pending
    }

    pub fn autowrap(&self) -> bool {
        self.autowrap
    }

    pub fn set_autowrap(&mut self, enabled: bool) {
        self.autowrap = enabled;
        if !enabled {
            self.wrap_pending = false;
        }
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    pub fn scroll_region(&self) -> Option<(u16, u16)> {
        self.scroll_region
    }

    pub fn is_alternate(&self) -> bool {
        self.primary.is_some()
    }

    /// Visible row by index
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        self.buffer.get(y as usize).map(Vec::as_slice)
    }

    /// Visible rows, top to bottom
    pub fn visible_rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.buffer.iter().map(Vec::as_slice)
    }

    /// Scrollback rows, oldest first
    pub fn scrollback(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.scrollback.iter().map(Vec::as_slice)
    }

    pub fn scrollback_len(&self) -> usize {
        self.scrollback.len()
    }

    pub fn max_scrollback(&self) -> usize {
        self.max_scrollback
    }

    /// Rows scrolled off the top of the primary screen so far, stored or not
    pub fn lines_scrolled(&self) -> u64 {
        self.lines_scrolled
    }

    /// Get character at position (x = column, y = row)
    pub fn get_char(&self, x: u16, y: u16) -> Option<char> {
        self.buffer
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .map(|cell| cell.data)
    }

    /// Get cell at position (x = column, y = row)
    pub fn get_cell(&self, x: u16, y: u16) -> Option<&Cell> {
        self.buffer.get(y as usize).and_then(|row| row.get(x as usize))
    }

    /// Get entire line as string, padded to the screen width
    pub fn get_line(&self, y: u16) -> String {
        if let Some(row) = self.buffer.get(y as usize) {
            row.iter()
                .filter(|cell| !cell.is_wide_continuation)
                .map(|cell| cell.data)
                .collect()
        } else {
            String::new()
        }
    }

    /// Get line with trailing blanks removed
    pub fn get_line_trimmed(&self, y: u16) -> String {
        self.buffer
            .get(y as usize)
            .map(|row| line_text(row))
            .unwrap_or_default()
    }

    fn region(&self) -> (u16, u16) {
        self.scroll_region.unwrap_or((0, self.size.1 - 1))
    }

    // ========== Printing ==========

    /// Place a character at the cursor with the current pen and advance
    ///
    /// Wraps at the right edge when autowrap is on. Wide characters take two
    /// cells; zero-width characters are dropped.
    pub fn put_char(&mut self, c: char) {
        let cols = self.size.0;
        let width = match c.width() {
            Some(0) | None => {
                trace!("Dropping zero-width char U+{:04X}", c as u32);
                return;
            }
            Some(w) if w >= 2 && cols >= 2 => 2,
            Some(_) => 1,
        };

        if self.wrap_pending {
            self.cursor.col = 0;
            self.linefeed();
        }

        if width == 2 && self.cursor.col + 1 >= cols {
            if self.autowrap {
                self.cursor.col = 0;
                self.linefeed();
            } else {
                self.cursor.col = cols - 2;
            }
        }

        let x = self.cursor.col as usize;
        let pen = self.pen;
        let line = &mut self.buffer[self.cursor.row as usize];

        // Never leave half of a wide character behind
        if line[x].is_wide_continuation && x > 0 {
            line[x - 1].clear();
        }
        let tail = x + width as usize;
        if tail < line.len() && line[tail].is_wide_continuation {
            line[tail].clear();
        }

        line[x] = Cell::with_char(c, pen);
        if width == 2 {
            line[x + 1] = Cell::wide_continuation(pen);
        }

        let next = self.cursor.col + width;
        if next >= cols {
            self.cursor.col = cols - 1;
            self.wrap_pending = self.autowrap;
        } else {
            self.cursor.col = next;
        }
    }

    // ========== Cursor ==========

    /// Move the cursor, clamping to the grid
    ///
    /// Relative vertical motion stops at the scroll region margin when the
    /// cursor starts inside the region.
    pub fn move_cursor(&mut self, motion: Motion) {
        let max_row = self.size.1 - 1;
        let max_col = self.size.0 - 1;
        let (top, bottom) = self.region();
        let Cursor { row, col } = self.cursor;
        let in_region = row >= top && row <= bottom;

        self.wrap_pending = false;
        self.cursor = match motion {
            Motion::Up(n) => {
                let floor = if in_region { top } else { 0 };
                Cursor {
                    row: row.saturating_sub(n).max(floor),
                    col,
                }
            }
            Motion::Down(n) => {
                let ceiling = if in_region { bottom } else { max_row };
                Cursor {
                    row: row.saturating_add(n).min(ceiling),
                    col,
                }
            }
            Motion::Left(n) => Cursor {
                row,
                col: col.saturating_sub(n),
            },
            Motion::Right(n) => Cursor {
                row,
                col: col.saturating_add(n).min(max_col),
            },
            Motion::To { row, col } => Cursor {
                row: row.min(max_row),
                col: col.min(max_col),
            },
            Motion::Row(r) => Cursor {
                row: r.min(max_row),
                col,
            },
            Motion::Col(c) => Cursor {
                row,
                col: c.min(max_col),
            },
            Motion::Home => Cursor::default(),
            Motion::LineStart => Cursor { row, col: 0 },
            Motion::LineEnd => Cursor { row, col: max_col },
        };
    }

    /// Line feed: move down one row, scrolling at the bottom of the region
    pub fn linefeed(&mut self) {
        self.wrap_pending = false;
        let (_, bottom) = self.region();
        if self.cursor.row == bottom {
            self.scroll_up(1);
        } else if self.cursor.row + 1 < self.size.1 {
            self.cursor.row += 1;
        }
    }

    /// Reverse index: move up one row, scrolling down at the top of the region
    pub fn reverse_index(&mut self) {
        self.wrap_pending = false;
        let (top, _) = self.region();
        if self.cursor.row == top {
            self.scroll_down(1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
    }

    pub fn carriage_return(&mut self) {
        self.wrap_pending = false;
        self.cursor.col = 0;
    }

    pub fn backspace(&mut self) {
        self.wrap_pending = false;
        self.cursor.col = self.cursor.col.saturating_sub(1);
    }

    /// Advance to the next tab stop (every 8 columns)
    pub fn tab(&mut self) {
        self.wrap_pending = false;
        let next = (self.cursor.col / 8 + 1).saturating_mul(8);
        self.cursor.col = next.min(self.size.0 - 1);
    }

    /// Save cursor position and pen (DECSC)
    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some(SavedCursor {
            cursor: self.cursor,
            attrs: self.pen,
            wrap_pending: self.wrap_pending,
        });
    }

    /// Restore cursor position and pen (DECRC); homes the cursor if nothing was saved
    pub fn restore_cursor(&mut self) {
        match self.saved_cursor {
            Some(saved) => {
                self.move_cursor(Motion::To {
                    row: saved.cursor.row,
                    col: saved.cursor.col,
                });
                self.pen = saved.attrs;
                self.wrap_pending = saved.wrap_pending && self.cursor == saved.cursor;
            }
            None => {
                self.move_cursor(Motion::Home);
                self.pen.reset();
            }
        }
    }

    // ========== Erasing ==========

    /// Erase part of the line or display relative to the cursor
    pub fn erase(&mut self, region: Erase) {
        let x = self.cursor.col as usize;
        let y = self.cursor.row as usize;

        match region {
            Erase::LineToEnd => {
                self.buffer[y][x..].iter_mut().for_each(Cell::clear);
            }
            Erase::LineToStart => {
                self.buffer[y][..=x].iter_mut().for_each(Cell::clear);
            }
            Erase::Line => {
                self.buffer[y].iter_mut().for_each(Cell::clear);
            }
            Erase::DisplayToEnd => {
                self.buffer[y][x..].iter_mut().for_each(Cell::clear);
                for row in self.buffer.iter_mut().skip(y + 1) {
                    row.iter_mut().for_each(Cell::clear);
                }
            }
            Erase::DisplayToStart => {
                for row in self.buffer.iter_mut().take(y) {
                    row.iter_mut().for_each(Cell::clear);
                }
                self.buffer[y][..=x].iter_mut().for_each(Cell::clear);
            }
            Erase::Display => {
                for row in self.buffer.iter_mut() {
                    row.iter_mut().for_each(Cell::clear);
                }
            }
        }
    }

    /// Blank `n` cells starting at the cursor without shifting (ECH)
    pub fn erase_chars(&mut self, n: u16) {
        let x = self.cursor.col as usize;
        let end = (x + n as usize).min(self.size.0 as usize);
        self.buffer[self.cursor.row as usize][x..end]
            .iter_mut()
            .for_each(Cell::clear);
    }

    /// Drop all scrollback history (ED 3)
    pub fn clear_scrollback(&mut self) {
        debug!("Clearing {} scrollback rows", self.scrollback.len());
        self.scrollback.clear();
    }

    // ========== Scrolling ==========

    fn push_scrollback(&mut self, row: Row) {
        self.lines_scrolled += 1;
        if self.max_scrollback == 0 {
            return;
        }
        if self.scrollback.len() >= self.max_scrollback {
            self.scrollback.pop_front();
        }
        self.scrollback.push_back(row);
    }

    /// Scroll the region up by `lines` (content moves up, blanks at bottom)
    ///
    /// Rows leaving a region that starts at the top of the screen go to
    /// scrollback, except on the alternate screen.
    pub fn scroll_up(&mut self, lines: u16) {
        let (top, bottom) = self.region();
        let n = lines.min(bottom - top + 1);
        let keep = top == 0 && self.primary.is_none();

        for _ in 0..n {
            let evicted = self.buffer.remove(top as usize);
            self.buffer.insert(bottom as usize, blank_row(self.size.0));
            if let (true, Some(row)) = (keep, evicted) {
                self.push_scrollback(row);
            }
        }
    }

    /// Scroll the region down by `lines` (content moves down, blanks at top)
    pub fn scroll_down(&mut self, lines: u16) {
        let (top, bottom) = self.region();
        let n = lines.min(bottom - top + 1);

        for _ in 0..n {
            self.buffer.remove(bottom as usize);
            self.buffer.insert(top as usize, blank_row(self.size.0));
        }
    }

    /// Insert blank lines at the cursor row, pushing lines below down (IL)
    pub fn insert_lines(&mut self, lines: u16) {
        let (top, bottom) = self.region();
        let y = self.cursor.row;
        if y < top || y > bottom {
            return;
        }

        for _ in 0..lines.min(bottom - y + 1) {
            self.buffer.remove(bottom as usize);
            self.buffer.insert(y as usize, blank_row(self.size.0));
        }
        self.carriage_return();
    }

    /// Delete lines at the cursor row, pulling lines below up (DL)
    pub fn delete_lines(&mut self, lines: u16) {
        let (top, bottom) = self.region();
        let y = self.cursor.row;
        if y < top || y > bottom {
            return;
        }

        for _ in 0..lines.min(bottom - y + 1) {
            self.buffer.remove(y as usize);
            self.buffer.insert(bottom as usize, blank_row(self.size.0));
        }
        self.carriage_return();
    }

    /// Insert blank cells at the cursor, shifting the rest of the line right (ICH)
    pub fn insert_chars(&mut self, n: u16) {
        let cols = self.size.0 as usize;
        let x = self.cursor.col as usize;
        let n = (n as usize).min(cols - x);
        let line = &mut self.buffer[self.cursor.row as usize];

        line.splice(x..x, iter::repeat(Cell::new()).take(n));
        line.truncate(cols);
        self.wrap_pending = false;
    }

    /// Delete cells at the cursor, shifting the rest of the line left (DCH)
    pub fn delete_chars(&mut self, n: u16) {
        let cols = self.size.0 as usize;
        let x = self.cursor.col as usize;
        let n = (n as usize).min(cols - x);
        let line = &mut self.buffer[self.cursor.row as usize];

        line.drain(x..x + n);
        line.extend(iter::repeat(Cell::new()).take(n));
        self.wrap_pending = false;
    }

    /// Set the scroll region from 1-based (top, bottom); 0 bottom means last row
    ///
    /// Invalid regions are ignored. A valid one homes the cursor.
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        let rows = self.size.1;
        let top = top.max(1);
        let bottom = if bottom == 0 { rows } else { bottom };

        if top >= bottom || bottom > rows {
            trace!("Ignoring invalid scroll region {};{}", top, bottom);
            return;
        }

        self.scroll_region = if top == 1 && bottom == rows {
            None
        } else {
            Some((top - 1, bottom - 1))
        };
        self.move_cursor(Motion::Home);
    }

    // ========== Alternate screen ==========

    /// Switch to a blank alternate grid (no-op if already there)
    pub fn enter_alternate_screen(&mut self) {
        if self.primary.is_some() {
            return;
        }
        let alternate = blank_grid(self.size.0, self.size.1);
        self.primary = Some(std::mem::replace(&mut self.buffer, alternate));
        self.scroll_region = None;
    }

    /// Return to the primary grid (no-op if not on the alternate screen)
    pub fn leave_alternate_screen(&mut self) {
        if let Some(primary) = self.primary.take() {
            self.buffer = primary;
            self.scroll_region = None;
        }
    }

    // ========== Geometry ==========

    /// Resize the grid
    ///
    /// Rows past the new row count and columns past the new column count are
    /// discarded (not moved to scrollback); new cells are blank. Scrollback
    /// is never re-flowed.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        debug!(
            "Screen resize {}x{} -> {}x{}",
            self.size.0, self.size.1, cols, rows
        );

        resize_grid(&mut self.buffer, cols, rows);
        if let Some(primary) = self.primary.as_mut() {
            resize_grid(primary, cols, rows);
        }

        self.size = (cols, rows);
        self.scroll_region = None;
        self.wrap_pending = false;
        self.cursor.col = self.cursor.col.min(cols - 1);
        self.cursor.row = self.cursor.row.min(rows - 1);
    }

    /// Full reset (RIS). Scrollback is kept.
    pub fn reset(&mut self) {
        let (cols, rows) = self.size;
        self.buffer = blank_grid(cols, rows);
        self.primary = None;
        self.cursor = Cursor::default();
        self.pen.reset();
        self.wrap_pending = false;
        self.autowrap = true;
        self.cursor_visible = true;
        self.scroll_region = None;
        self.saved_cursor = None;
    }

    /// Soft reset (DECSTR): modes and pen, content untouched
    pub fn soft_reset(&mut self) {
        self.pen.reset();
        self.wrap_pending = false;
        self.autowrap = true;
        self.cursor_visible = true;
        self.scroll_region = None;
        self.saved_cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::Color;

    fn write(screen: &mut Screen, text: &str) {
        for c in text.chars() {
            screen.put_char(c);
        }
    }

    fn set(screen: &mut Screen, x: usize, y: usize, c: char) {
        screen.buffer[y][x].data = c;
    }

    #[test]
    fn test_new_screen() {
        let screen = Screen::new(80, 24, 100);
        assert_eq!(screen.size(), (80, 24));
        assert_eq!(screen.cursor(), Cursor::default());
        assert_eq!(screen.buffer.len(), 24);
        assert_eq!(screen.buffer[0].len(), 80);
        assert_eq!(screen.scrollback_len(), 0);
    }

    #[test]
    fn test_zero_size_is_raised() {
        let screen = Screen::new(0, 0, 10);
        assert_eq!(screen.size(), (1, 1));
    }

    #[test]
    fn test_get_char() {
        let mut screen = Screen::new(10, 5, 0);
        set(&mut screen, 3, 2, 'A');

        assert_eq!(screen.get_char(3, 2), Some('A'));
        assert_eq!(screen.get_char(0, 0), Some(' '));
        assert_eq!(screen.get_char(100, 100), None);
    }

    #[test]
    fn test_get_line_trimmed() {
        let mut screen = Screen::new(10, 5, 0);
        write(&mut screen, " AB");

        assert_eq!(screen.get_line(0).len(), 10);
        assert_eq!(screen.get_line_trimmed(0), " AB");
    }

    #[test]
    fn test_put_char_uses_pen() {
        let mut screen = Screen::new(10, 2, 0);
        screen.pen_mut().fg = Color::Indexed(1);
        screen.put_char('r');

        let cell = screen.get_cell(0, 0).unwrap();
        assert_eq!(cell.attrs.fg, Color::Indexed(1));
        assert_eq!(screen.cursor(), Cursor { row: 0, col: 1 });
    }

    #[test]
    fn test_put_char_wrap_pending_keeps_cursor_in_bounds() {
        let mut screen = Screen::new(5, 3, 0);
        write(&mut screen, "ABCDE");

        assert_eq!(screen.cursor(), Cursor { row: 0, col: 4 });
        assert!(screen.wrap_pending());

        screen.put_char('F');
        assert_eq!(screen.get_line_trimmed(0), "ABCDE");
        assert_eq!(screen.get_char(0, 1), Some('F'));
        assert_eq!(screen.cursor(), Cursor { row: 1, col: 1 });
    }

    #[test]
    fn test_wrap_at_bottom_scrolls_into_scrollback() {
        let mut screen = Screen::new(5, 3, 10);
        write(&mut screen, "ABCDEFGHIJKLMNOP");

        assert_eq!(screen.get_line_trimmed(0), "FGHIJ");
        assert_eq!(screen.get_line_trimmed(1), "KLMNO");
        assert_eq!(screen.get_line_trimmed(2), "P");
        assert_eq!(screen.scrollback_len(), 1);
        assert_eq!(line_text(screen.scrollback().next().unwrap()), "ABCDE");
    }

    #[test]
    fn test_autowrap_off_overwrites_last_column() {
        let mut screen = Screen::new(3, 2, 0);
        screen.set_autowrap(false);
        write(&mut screen, "ABCD");

        assert_eq!(screen.get_line_trimmed(0), "ABD");
        assert_eq!(screen.cursor(), Cursor { row: 0, col: 2 });
    }

    #[test]
    fn test_wide_char_takes_two_cells() {
        let mut screen = Screen::new(10, 2, 0);
        screen.put_char('漢');

        assert_eq!(screen.get_char(0, 0), Some('漢'));
        assert!(screen.get_cell(1, 0).unwrap().is_wide_continuation);
        assert_eq!(screen.cursor().col, 2);
        assert_eq!(screen.get_line_trimmed(0), "漢");
    }

    #[test]
    fn test_wide_char_wraps_from_last_column() {
        let mut screen = Screen::new(3, 2, 0);
        write(&mut screen, "ab");
        screen.put_char('漢');

        assert_eq!(screen.get_line_trimmed(0), "ab");
        assert_eq!(screen.get_char(0, 1), Some('漢'));
    }

    #[test]
    fn test_overwriting_wide_char_clears_other_half() {
        let mut screen = Screen::new(10, 2, 0);
        screen.put_char('漢');
        screen.move_cursor(Motion::Col(1));
        screen.put_char('x');

        assert_eq!(screen.get_line_trimmed(0), " x");
    }

    #[test]
    fn test_move_cursor_clamps() {
        let mut screen = Screen::new(10, 5, 0);
        screen.move_cursor(Motion::Up(3));
        assert_eq!(screen.cursor(), Cursor { row: 0, col: 0 });

        screen.move_cursor(Motion::Down(100));
        screen.move_cursor(Motion::Right(100));
        assert_eq!(screen.cursor(), Cursor { row: 4, col: 9 });

        screen.move_cursor(Motion::To { row: 50, col: 50 });
        assert_eq!(screen.cursor(), Cursor { row: 4, col: 9 });

        screen.move_cursor(Motion::Left(u16::MAX));
        assert_eq!(screen.cursor().col, 0);

        screen.move_cursor(Motion::LineEnd);
        assert_eq!(screen.cursor().col, 9);
        screen.move_cursor(Motion::Home);
        assert_eq!(screen.cursor(), Cursor::default());
    }

    #[test]
    fn test_move_cursor_respects_region_margins() {
        let mut screen = Screen::new(10, 10, 0);
        screen.set_scroll_region(3, 6);
        screen.move_cursor(Motion::Row(4));
        screen.move_cursor(Motion::Up(10));
        assert_eq!(screen.cursor().row, 2);
        screen.move_cursor(Motion::Down(10));
        assert_eq!(screen.cursor().row, 5);
    }

    #[test]
    fn test_resize() {
        let mut screen = Screen::new(10, 5, 0);
        set(&mut screen, 3, 2, 'X');

        screen.resize(20, 10);
        assert_eq!(screen.size(), (20, 10));
        assert_eq!(screen.buffer.len(), 10);
        assert_eq!(screen.buffer[0].len(), 20);
        assert_eq!(screen.get_char(3, 2), Some('X'));
    }

    #[test]
    fn test_resize_shrink_discards_without_scrollback() {
        let mut screen = Screen::new(10, 5, 100);
        set(&mut screen, 0, 4, 'Z');
        screen.move_cursor(Motion::To { row: 4, col: 9 });

        screen.resize(4, 2);
        assert_eq!(screen.scrollback_len(), 0);
        assert_eq!(screen.cursor(), Cursor { row: 1, col: 3 });
        assert!(screen.visible_rows().all(|row| row.len() == 4));
    }

    #[test]
    fn test_erase_modes() {
        let mut screen = Screen::new(5, 3, 0);
        write(&mut screen, "AAAAABBBBBCCCCC");
        screen.move_cursor(Motion::To { row: 1, col: 2 });

        screen.erase(Erase::LineToEnd);
        assert_eq!(screen.get_line_trimmed(1), "BB");

        screen.erase(Erase::LineToStart);
        assert_eq!(screen.get_line_trimmed(1), "");

        screen.erase(Erase::DisplayToStart);
        assert_eq!(screen.get_line_trimmed(0), "");
        assert_eq!(screen.get_line_trimmed(2), "CCCCC");

        screen.erase(Erase::DisplayToEnd);
        assert_eq!(screen.get_line_trimmed(2), "");
    }

    #[test]
    fn test_erase_display() {
        let mut screen = Screen::new(10, 5, 0);
        set(&mut screen, 3, 2, 'A');
        screen.erase(Erase::Display);

        assert_eq!(screen.get_char(3, 2), Some(' '));
    }

    #[test]
    fn test_scroll_up() {
        let mut screen = Screen::new(10, 5, 10);
        set(&mut screen, 0, 0, 'A');
        set(&mut screen, 0, 1, 'B');
        set(&mut screen, 0, 2, 'C');

        screen.scroll_up(1);

        assert_eq!(screen.get_char(0, 0), Some('B'));
        assert_eq!(screen.get_char(0, 1), Some('C'));
        assert_eq!(screen.get_line_trimmed(4), "");
        assert_eq!(screen.scrollback_len(), 1);
        assert_eq!(screen.lines_scrolled(), 1);
    }

    #[test]
    fn test_scroll_up_more_than_height() {
        let mut screen = Screen::new(4, 3, 10);
        screen.scroll_up(50);
        assert_eq!(screen.scrollback_len(), 3);
        assert_eq!(screen.buffer.len(), 3);
    }

    #[test]
    fn test_scrollback_bound_evicts_oldest() {
        let mut screen = Screen::new(4, 1, 3);
        for c in ['a', 'b', 'c', 'd', 'e'] {
            screen.put_char(c);
            screen.carriage_return();
            screen.linefeed();
        }

        let history: Vec<String> = screen.scrollback().map(line_text).collect();
        assert_eq!(history, vec!["c", "d", "e"]);
        assert_eq!(screen.lines_scrolled(), 5);
    }

    #[test]
    fn test_scroll_region_without_top_skips_scrollback() {
        let mut screen = Screen::new(4, 5, 10);
        screen.set_scroll_region(2, 4);
        set(&mut screen, 0, 1, 'X');
        screen.scroll_up(1);

        assert_eq!(screen.scrollback_len(), 0);
        assert_eq!(screen.get_line_trimmed(1), "");
    }

    #[test]
    fn test_scroll_down() {
        let mut screen = Screen::new(4, 3, 0);
        set(&mut screen, 0, 0, 'A');
        screen.scroll_down(1);

        assert_eq!(screen.get_line_trimmed(0), "");
        assert_eq!(screen.get_char(0, 1), Some('A'));
    }

    #[test]
    fn test_insert_and_delete_lines() {
        let mut screen = Screen::new(4, 4, 0);
        write(&mut screen, "AAAABBBBCCCCDDDD");
        screen.move_cursor(Motion::Row(1));

        screen.insert_lines(1);
        assert_eq!(screen.get_line_trimmed(1), "");
        assert_eq!(screen.get_line_trimmed(2), "BBBB");
        assert_eq!(screen.get_line_trimmed(3), "CCCC");

        screen.delete_lines(2);
        assert_eq!(screen.get_line_trimmed(1), "CCCC");
        assert_eq!(screen.get_line_trimmed(2), "");
    }

    #[test]
    fn test_insert_delete_erase_chars() {
        let mut screen = Screen::new(6, 1, 0);
        write(&mut screen, "abcdef");
        screen.move_cursor(Motion::Col(1));

        screen.insert_chars(2);
        assert_eq!(screen.get_line_trimmed(0), "a  bcd");

        screen.delete_chars(3);
        assert_eq!(screen.get_line_trimmed(0), "acd");

        screen.erase_chars(1);
        assert_eq!(screen.get_line_trimmed(0), "a d");
    }

    #[test]
    fn test_invalid_scroll_region_ignored() {
        let mut screen = Screen::new(10, 5, 0);
        screen.set_scroll_region(4, 2);
        assert_eq!(screen.scroll_region(), None);
        screen.set_scroll_region(1, 99);
        assert_eq!(screen.scroll_region(), None);
        screen.set_scroll_region(2, 0);
        assert_eq!(screen.scroll_region(), Some((1, 4)));
    }

    #[test]
    fn test_save_restore_cursor() {
        let mut screen = Screen::new(10, 5, 0);
        screen.move_cursor(Motion::To { row: 3, col: 5 });
        screen.pen_mut().bold = true;
        screen.save_cursor();

        screen.move_cursor(Motion::Home);
        screen.pen_mut().reset();
        screen.restore_cursor();

        assert_eq!(screen.cursor(), Cursor { row: 3, col: 5 });
        assert!(screen.pen().bold);
    }

    #[test]
    fn test_alternate_screen_round_trip() {
        let mut screen = Screen::new(10, 3, 10);
        write(&mut screen, "shell");

        screen.enter_alternate_screen();
        assert!(screen.is_alternate());
        assert_eq!(screen.get_line_trimmed(0), "");
        screen.scroll_up(2);
        assert_eq!(screen.scrollback_len(), 0);

        screen.leave_alternate_screen();
        assert!(!screen.is_alternate());
        assert_eq!(screen.get_line_trimmed(0), "shell");
    }

    #[test]
    fn test_resize_while_alternate_resizes_primary() {
        let mut screen = Screen::new(10, 3, 0);
        screen.enter_alternate_screen();
        screen.resize(4, 6);
        screen.leave_alternate_screen();

        assert_eq!(screen.buffer.len(), 6);
        assert!(screen.visible_rows().all(|row| row.len() == 4));
    }

    #[test]
    fn test_reset_keeps_scrollback() {
        let mut screen = Screen::new(4, 1, 10);
        write(&mut screen, "ab");
        screen.linefeed();
        screen.pen_mut().inverse = true;
        screen.reset();

        assert_eq!(screen.scrollback_len(), 1);
        assert_eq!(screen.get_line_trimmed(0), "");
        assert_eq!(screen.pen(), Attributes::default());
    }
}
