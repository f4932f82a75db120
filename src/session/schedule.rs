//! Delayed input
//!
//! Bytes to be written to a session's child at a later time: startup
//! keystrokes and the delayed Enter of a text submission.

use std::time::{Duration, Instant};

/// Pending writes, each with the instant it becomes due
#[derive(Debug, Default)]
pub struct InputSchedule {
    pending: Vec<(Instant, Vec<u8>)>,
}

impl InputSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `bytes` to be written `delay` after `now`
    pub fn schedule_at(&mut self, now: Instant, delay: Duration, bytes: Vec<u8>) {
        self.pending.push((now + delay, bytes));
    }

    /// Queue `bytes` to be written `delay` from now
    pub fn schedule(&mut self, delay: Duration, bytes: Vec<u8>) {
        self.schedule_at(Instant::now(), delay, bytes);
    }

    /// Remove and return everything due at `now`, earliest first
    ///
    /// Entries due at the same instant keep the order they were scheduled in.
    pub fn take_due(&mut self, now: Instant) -> Vec<Vec<u8>> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if now >= self.pending[i].0 {
                due.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }

        due.sort_by_key(|(when, _)| *when);
        due.into_iter().map(|(_, bytes)| bytes).collect()
    }

    /// Time until the next entry is due, `None` if nothing is scheduled
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.pending
            .iter()
            .map(|(when, _)| *when)
            .min()
            .map(|next| next.saturating_duration_since(now))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
