//! A single terminal session
//!
//! Ties one child process to one emulator. The thread that owns the
//! `Session` is the only one that mutates its screen; output arrives via
//! the I/O pump and is applied in `pump_pending`.

use super::pump::{Drained, EndReason, IoPump, PumpSettings, PumpState, Waker};
use super::schedule::InputSchedule;
use crate::config::{Config, StartupInput};
use crate::input::{encode, encode_paste, encode_submission, Key, Modifiers};
use crate::render::{Projection, Projector, ScreenSnapshot};
use crate::terminal::{grid_size_from_pixels, Emulator, ProcessChannel, Screen, SessionCommand};
use crate::{Result, ShelltermError};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Everything a session needs from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub cols: u16,
    pub rows: u16,
    pub scrollback: usize,
    pub term: String,
    pub min_cols: u16,
    pub min_rows: u16,
    pub ended_message: String,
    pub submit_delay: Duration,
    pub close_timeout: Duration,
    pub pump: PumpSettings,
    pub startup: Vec<StartupInput>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        let (min_cols, min_rows) = config.min_size();
        Self {
            cols: config.cols(),
            rows: config.rows(),
            scrollback: config.scrollback(),
            term: config.term(),
            min_cols,
            min_rows,
            ended_message: config.ended_message(),
            submit_delay: config.submit_delay(),
            close_timeout: config.close_timeout(),
            pump: config.pump_settings(),
            startup: config.startup_inputs(),
        }
    }
}

/// A child process, its terminal state and its reader thread
pub struct Session {
    command: SessionCommand,
    settings: SessionSettings,
    channel: ProcessChannel,
    emulator: Emulator,
    projector: Projector,
    pump: IoPump,
    schedule: InputSchedule,
    ended: Option<EndReason>,
    closed: bool,
}

impl Session {
    /// Spawn `command` and start reading its output
    ///
    /// Fails with `SpawnFailed` when either the child or the reader thread
    /// cannot be started; nothing is left running.
    pub fn open(
        command: SessionCommand,
        settings: SessionSettings,
        waker: Option<Waker>,
    ) -> Result<Self> {
        let cols = settings.cols.max(1);
        let rows = settings.rows.max(1);

        let mut channel = ProcessChannel::open(&command, cols, rows, &settings.term)?;
        let reader = channel.take_reader()?;

        let mut pump = IoPump::new(settings.pump);
        if let Err(e) = pump.start(reader, waker) {
            channel.close();
            return Err(e);
        }

        let mut schedule = InputSchedule::new();
        let now = Instant::now();
        for input in &settings.startup {
            debug!("Scheduling startup input {} after {:?}", input.name, input.delay);
            schedule.schedule_at(now, input.delay, input.bytes.clone());
        }

        info!(
            "Session started: {} (pid {:?}, {}x{})",
            command.program_name(),
            channel.process_id(),
            cols,
            rows
        );

        Ok(Self {
            emulator: Emulator::new(cols, rows, settings.scrollback),
            command,
            settings,
            channel,
            projector: Projector::new(),
            pump,
            schedule,
            ended: None,
            closed: false,
        })
    }

    /// Apply all output handed off by the pump so far
    ///
    /// Returns whether the screen may have changed.
    pub fn pump_pending(&mut self) -> bool {
        let drained = self.pump.poll();
        self.apply(drained)
    }

    /// Like `pump_pending`, but wait up to `timeout` for output first
    pub fn wait_for_output(&mut self, timeout: Duration) -> bool {
        let drained = self.pump.poll_timeout(timeout);
        self.apply(drained)
    }

    fn apply(&mut self, drained: Drained) -> bool {
        if drained.is_empty() {
            return false;
        }

        if !drained.data.is_empty() {
            self.emulator.feed(&drained.data);

            let replies = self.emulator.take_replies();
            if !replies.is_empty() && !self.closed {
                if let Err(e) = self.channel.write(&replies) {
                    warn!("Failed to send terminal reply: {}", e);
                }
            }
        }

        if let Some(reason) = drained.ended {
            self.handle_end(reason);
        }
        true
    }

    fn handle_end(&mut self, reason: EndReason) {
        if self.ended.is_some() {
            return;
        }
        match &reason {
            EndReason::Eof => info!("Session output ended"),
            EndReason::ReadError(e) => warn!("Session ended after read failure: {}", e),
            EndReason::Stopped => debug!("Session reader stopped"),
        }

        if !self.closed && !self.settings.ended_message.is_empty() {
            self.emulator.reset_parser();
            let notice = format!("\r\n{}", self.settings.ended_message);
            self.emulator.feed(notice.as_bytes());
        }
        self.schedule.clear();
        self.ended = Some(reason);
    }

    /// Project the screen to text
    pub fn render(&mut self) -> Projection<'_> {
        self.projector.project(self.emulator.screen())
    }

    pub fn snapshot(&self) -> ScreenSnapshot {
        ScreenSnapshot::capture(self.emulator.screen())
    }

    /// Encode a key event and send it to the child
    pub fn send_key(&mut self, key: Key, modifiers: Modifiers, text: &str) -> Result<()> {
        let bytes = encode(key, modifiers, text);
        if bytes.is_empty() {
            return Ok(());
        }
        self.write(&bytes)
    }

    /// Write raw bytes to the child
    ///
    /// A failed write is logged and returned; the session stays open.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(ShelltermError::Closed);
        }
        self.channel.write(bytes).map_err(|e| {
            warn!("{}", e);
            e
        })
    }

    pub fn paste(&mut self, text: &str) -> Result<()> {
        self.write(&encode_paste(text))
    }

    /// Send `text`, then Enter after the configured delay
    pub fn submit_text(&mut self, text: &str) -> Result<()> {
        let (body, enter) = encode_submission(text);
        self.write(&body)?;
        self.schedule.schedule(self.settings.submit_delay, enter);
        Ok(())
    }

    /// Queue bytes to be written after `delay`
    pub fn schedule_input(&mut self, delay: Duration, bytes: Vec<u8>) {
        if !self.closed {
            self.schedule.schedule(delay, bytes);
        }
    }

    /// Resize the screen and the child's terminal together
    ///
    /// The screen is resized even when the PTY refuses. The PTY is skipped
    /// only once it already has this size, so a later resize retries.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        let cols = cols.max(1);
        let rows = rows.max(1);

        if (cols, rows) != self.emulator.screen().size() {
            self.emulator.resize(cols, rows);
        }
        if self.closed || (cols, rows) == self.channel.size() {
            return Ok(());
        }
        self.channel.resize(cols, rows).map_err(|e| {
            warn!("{}", e);
            e
        })
    }

    /// Resize from a pixel area and cell size, never below the minimum grid
    pub fn resize_pixels(
        &mut self,
        width: u32,
        height: u32,
        cell_width: u32,
        cell_height: u32,
    ) -> Result<(u16, u16)> {
        let (cols, rows) = grid_size_from_pixels(
            width,
            height,
            cell_width,
            cell_height,
            self.settings.min_cols,
            self.settings.min_rows,
        );
        self.resize(cols, rows)?;
        Ok((cols, rows))
    }

    /// Write any scheduled input that is due
    ///
    /// Every due entry is attempted even if an earlier one fails; the first
    /// failure is returned. Returns whether anything was due.
    pub fn run_scheduled(&mut self) -> Result<bool> {
        let due = self.schedule.take_due(Instant::now());
        if due.is_empty() {
            return Ok(false);
        }

        let mut first_error = None;
        for bytes in due {
            if let Err(e) = self.write(&bytes) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }

    pub fn time_until_next_scheduled(&self) -> Option<Duration> {
        self.schedule.time_until_next(Instant::now())
    }

    /// Stop the reader, terminate the child and release the PTY
    ///
    /// Idempotent; also fine after the child has already exited.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        debug!("Closing session {}", self.command.program_name());

        self.schedule.clear();
        self.pump.request_stop();
        self.channel.close();
        self.pump.join(self.settings.close_timeout);

        if self.ended.is_none() {
            self.ended = Some(EndReason::Stopped);
        }
    }

    /// Child still attached and producing output
    pub fn is_running(&self) -> bool {
        !self.closed && self.ended.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn end_reason(&self) -> Option<&EndReason> {
        self.ended.as_ref()
    }

    pub fn pump_state(&self) -> PumpState {
        self.pump.state()
    }

    pub fn process_id(&self) -> Option<u32> {
        self.channel.process_id()
    }

    /// Exit code of the child, once known
    pub fn exit_code(&mut self) -> Option<u32> {
        if !self.closed {
            self.channel.is_alive();
        }
        self.channel.exit_code()
    }

    pub fn command(&self) -> &SessionCommand {
        &self.command
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn emulator(&self) -> &Emulator {
        &self.emulator
    }

    pub fn screen(&self) -> &Screen {
        self.emulator.screen()
    }

    /// Grid size as (cols, rows)
    pub fn size(&self) -> (u16, u16) {
        self.emulator.screen().size()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
