//! Terminal emulation and PTY management

pub mod cell;
pub mod emulator;
pub mod parser;
pub mod pty;
pub mod screen;
pub mod util;
mod performer;

pub use cell::{Attributes, Cell, Color};
pub use emulator::Emulator;
pub use parser::{Parser, ParserState};
pub use pty::{ChannelReader, ProcessChannel, SessionCommand};
pub use screen::{line_text, Cursor, Erase, Motion, Screen};
pub use util::grid_size_from_pixels;
