//! Multiple sessions, one of them active
//!
//! Sessions share nothing but the settings they were opened with; a
//! failure in one never touches another.

use super::pump::Waker;
use super::session::{Session, SessionSettings};
use crate::terminal::SessionCommand;
use crate::{Result, ShelltermError};
use log::{debug, info, warn};

/// A session plus its display name
pub struct Tab {
    pub id: u64,
    pub title: String,
    pub session: Session,
}

/// Ordered list of sessions with an active index
pub struct SessionManager {
    settings: SessionSettings,
    default_command: SessionCommand,
    waker: Option<Waker>,
    tabs: Vec<Tab>,
    active: usize,
    counter: u64,
}

impl SessionManager {
    pub fn new(settings: SessionSettings, default_command: SessionCommand) -> Self {
        Self {
            settings,
            default_command,
            waker: None,
            tabs: Vec::new(),
            active: 0,
            counter: 0,
        }
    }

    /// Callback handed to every new session's pump
    pub fn set_waker(&mut self, waker: Waker) {
        self.waker = Some(waker);
    }

    /// Open a session and make it active; returns its index
    ///
    /// `None` runs the default command.
    pub fn open_session(&mut self, command: Option<SessionCommand>) -> Result<usize> {
        let command = command.unwrap_or_else(|| self.default_command.clone());
        let session = Session::open(command, self.settings.clone(), self.waker.clone())?;

        self.counter += 1;
        let title = format!("Session {}", self.counter);
        info!("Opened {}", title);

        self.tabs.push(Tab {
            id: self.counter,
            title,
            session,
        });
        self.active = self.tabs.len() - 1;
        Ok(self.active)
    }

    /// Close the session at `index`
    ///
    /// The last remaining session is never closed; returns whether a
    /// session was removed.
    pub fn close_session(&mut self, index: usize) -> bool {
        if self.tabs.len() <= 1 || index >= self.tabs.len() {
            debug!(
                "Refusing to close session {} of {}",
                index,
                self.tabs.len()
            );
            return false;
        }

        let mut tab = self.tabs.remove(index);
        tab.session.close();
        info!("Closed {}", tab.title);

        self.active = index.min(self.tabs.len() - 1);
        true
    }

    /// Close the active session, unless it is the only one
    pub fn close_active(&mut self) -> bool {
        self.close_session(self.active)
    }

    /// Make `index` the active session; out-of-range indices are ignored
    pub fn switch_to(&mut self, index: usize) -> bool {
        if index < self.tabs.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> Option<&Session> {
        self.tabs.get(self.active).map(|tab| &tab.session)
    }

    pub fn active_mut(&mut self) -> Option<&mut Session> {
        self.tabs.get_mut(self.active).map(|tab| &mut tab.session)
    }

    pub fn get(&self, index: usize) -> Option<&Session> {
        self.tabs.get(index).map(|tab| &tab.session)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Session> {
        self.tabs.get_mut(index).map(|tab| &mut tab.session)
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Apply pending output and due scheduled input for every session
    ///
    /// Returns the indices whose screens may have changed.
    pub fn poll_all(&mut self) -> Vec<usize> {
        let mut changed = Vec::new();
        for (index, tab) in self.tabs.iter_mut().enumerate() {
            if let Err(e) = tab.session.run_scheduled() {
                warn!("{}: scheduled input failed: {}", tab.title, e);
            }
            if tab.session.pump_pending() {
                changed.push(index);
            }
        }
        changed
    }

    /// Submit text, then Enter, to the active session
    pub fn submit_to_active(&mut self, text: &str) -> Result<()> {
        let session = self.active_mut().ok_or(ShelltermError::Closed)?;
        session.submit_text(text)
    }

    /// Close every session
    pub fn close_all(&mut self) {
        for tab in &mut self.tabs {
            tab.session.close();
        }
        self.tabs.clear();
        self.active = 0;
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close_all();
    }
}
