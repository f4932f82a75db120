//! Session lifecycle: reader thread, delayed input and tabs

pub mod manager;
pub mod pump;
pub mod schedule;
#[allow(clippy::module_inception)]
pub mod session;

pub use manager::{SessionManager, Tab};
pub use pump::{Drained, EndReason, IoPump, PumpEvent, PumpSettings, PumpState, Waker};
pub use schedule::InputSchedule;
pub use session::{Session, SessionSettings};
