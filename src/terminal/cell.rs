//! Terminal cell - represents a single character position on screen
//!
//! Every grid position always holds a defined cell. A blank cell is a space
//! with default attributes.

use serde::Serialize;

/// Foreground or background color of a cell
///
/// Only the 256-entry indexed palette is tracked. 24-bit colors are parsed
/// but collapse to `Default`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
}

/// Graphic rendition attributes (the SGR "pen")
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Attributes {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub underline: bool,
    pub inverse: bool,
}

impl Attributes {
    /// Reset to default rendition (SGR 0)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A single character cell in the terminal
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Cell {
    /// The character displayed at this position.
    /// `'\0'` for wide character continuation cells.
    pub data: char,

    /// Rendition the character was drawn with
    pub attrs: Attributes,

    /// Whether this cell is the right half of a wide character (CJK, emoji)
    pub is_wide_continuation: bool,
}

impl Cell {
    /// Create a new empty cell
    pub fn new() -> Self {
        Self {
            data: ' ',
            attrs: Attributes::default(),
            is_wide_continuation: false,
        }
    }

    /// Create a cell with specific character and rendition
    pub fn with_char(c: char, attrs: Attributes) -> Self {
        Self {
            data: c,
            attrs,
            is_wide_continuation: false,
        }
    }

    /// Create a wide character continuation cell
    pub fn wide_continuation(attrs: Attributes) -> Self {
        Self {
            data: '\0',
            attrs,
            is_wide_continuation: true,
        }
    }

    /// Reset cell to blank space
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// True for cells that render as nothing but whitespace
    pub fn is_blank(&self) -> bool {
        !self.is_wide_continuation && self.data == ' '
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}
