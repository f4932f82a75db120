//! Projection of terminal state for display surfaces

pub mod follow;
pub mod projector;

pub use follow::ScrollFollow;
pub use projector::{flatten, Projection, Projector, ScreenSnapshot};
