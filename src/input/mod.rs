//! Keyboard input encoding

pub mod keys;

pub use keys::{encode, encode_paste, encode_submission, Key, Modifiers};
