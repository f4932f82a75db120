//! shellterm - PTY-backed terminal emulation engine
//!
//! Runs a child program on a pseudo-terminal, interprets its output into a
//! screen model, encodes keystrokes for it, and projects the screen to text
//! for a display surface.

pub mod config;
pub mod error;
pub mod input;
pub mod render;
pub mod session;
pub mod terminal;

pub use config::Config;
pub use error::{Result, ShelltermError};
pub use session::{Session, SessionManager, SessionSettings};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "shellterm";
