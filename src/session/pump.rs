//! I/O pump
//!
//! A dedicated thread performs the blocking reads from a session's PTY and
//! hands each chunk, in order, to the thread that owns the emulator over an
//! unbounded channel. The worker never touches the screen.

use crate::{Result, ShelltermError};
use log::{debug, info, trace, warn};
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Callback run on the worker thread after each hand-off
///
/// Lets an event loop be woken up; it must not block.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Lifecycle of the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PumpState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl PumpState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PumpState::Idle,
            1 => PumpState::Running,
            2 => PumpState::Draining,
            _ => PumpState::Stopped,
        }
    }
}

/// Why the worker stopped reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// The child closed its side of the terminal
    Eof,
    /// A read failed
    ReadError(String),
    /// Stop was requested by the owner
    Stopped,
}

/// Message from the worker to the owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpEvent {
    Data(Vec<u8>),
    /// Always the last event
    Ended(EndReason),
}

/// Everything received by one `poll`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Drained {
    /// Chunks concatenated in the order they were read
    pub data: Vec<u8>,
    pub ended: Option<EndReason>,
}

impl Drained {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.ended.is_none()
    }
}

/// Worker tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpSettings {
    /// Size of each read
    pub read_buffer: usize,
    /// Sleep after a read that returned no data
    pub idle_sleep: Duration,
}

impl Default for PumpSettings {
    fn default() -> Self {
        Self {
            read_buffer: 4096,
            idle_sleep: Duration::from_millis(5),
        }
    }
}

/// Background reader for one session
pub struct IoPump {
    settings: PumpSettings,
    state: Arc<AtomicU8>,
    stop: Arc<AtomicBool>,
    tx: Option<Sender<PumpEvent>>,
    rx: Receiver<PumpEvent>,
    handle: Option<JoinHandle<()>>,
    ended: Option<EndReason>,
}

impl IoPump {
    /// Create an idle pump
    pub fn new(settings: PumpSettings) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            settings,
            state: Arc::new(AtomicU8::new(PumpState::Idle as u8)),
            stop: Arc::new(AtomicBool::new(false)),
            tx: Some(tx),
            rx,
            handle: None,
            ended: None,
        }
    }

    /// Start reading from `reader` on a new thread
    ///
    /// A worker that cannot be spawned is a `SpawnFailed`; the pump stays
    /// `Idle`.
    pub fn start<R>(&mut self, reader: R, waker: Option<Waker>) -> Result<()>
    where
        R: Read + Send + 'static,
    {
        let builder = thread::Builder::new().name("shellterm-pump".to_string());
        self.start_on(builder, reader, waker)
    }

    fn start_on<R>(
        &mut self,
        builder: thread::Builder,
        reader: R,
        waker: Option<Waker>,
    ) -> Result<()>
    where
        R: Read + Send + 'static,
    {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| ShelltermError::Other("I/O pump already started".to_string()))?;

        let settings = self.settings;
        let state = self.state.clone();
        let stop = self.stop.clone();

        let handle = builder
            .spawn(move || run(reader, tx, settings, state, stop, waker))
            .map_err(|e| ShelltermError::SpawnFailed(format!("reader thread: {}", e)))?;

        // The worker may already have moved on to Draining
        let _ = self.state.compare_exchange(
            PumpState::Idle as u8,
            PumpState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );

        debug!("I/O pump started");
        self.handle = Some(handle);
        Ok(())
    }

    pub fn state(&self) -> PumpState {
        PumpState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Set once the `Ended` event has been received
    pub fn end_reason(&self) -> Option<&EndReason> {
        self.ended.as_ref()
    }

    /// Collect everything handed off so far without blocking
    pub fn poll(&mut self) -> Drained {
        let mut drained = Drained::default();
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.absorb(event, &mut drained),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }

    /// Wait up to `timeout` for the first event, then collect the rest
    pub fn poll_timeout(&mut self, timeout: Duration) -> Drained {
        let mut drained = Drained::default();
        if self.ended.is_some() {
            return drained;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => self.absorb(event, &mut drained),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                return drained
            }
        }
        let rest = self.poll();
        drained.data.extend_from_slice(&rest.data);
        if rest.ended.is_some() {
            drained.ended = rest.ended;
        }
        drained
    }

    fn absorb(&mut self, event: PumpEvent, drained: &mut Drained) {
        match event {
            PumpEvent::Data(bytes) => drained.data.extend_from_slice(&bytes),
            PumpEvent::Ended(reason) => {
                self.ended = Some(reason.clone());
                drained.ended = Some(reason);
            }
        }
    }

    /// Ask the worker to stop after its current read
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Wait up to `timeout` for the worker to stop, then join it
    ///
    /// A worker still blocked in a read after the timeout is detached.
    /// Returns whether it reached `Stopped`.
    pub fn join(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.handle.take() else {
            return self.state() != PumpState::Running;
        };

        let deadline = Instant::now() + timeout;
        while self.state() != PumpState::Stopped && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        if self.state() == PumpState::Stopped {
            if handle.join().is_err() {
                warn!("I/O pump thread panicked");
            }
            debug!("I/O pump joined");
            true
        } else {
            warn!("I/O pump did not stop within {:?}, detaching", timeout);
            false
        }
    }

    /// Request a stop and wait for it
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        self.request_stop();
        self.join(timeout)
    }
}

impl Drop for IoPump {
    fn drop(&mut self) {
        self.request_stop();
    }
}

fn run<R: Read>(
    mut reader: R,
    tx: Sender<PumpEvent>,
    settings: PumpSettings,
    state: Arc<AtomicU8>,
    stop: Arc<AtomicBool>,
    waker: Option<Waker>,
) {
    let wake = || {
        if let Some(waker) = &waker {
            waker();
        }
    };

    let mut buffer = vec![0u8; settings.read_buffer.max(1)];
    let reason = loop {
        if stop.load(Ordering::SeqCst) {
            break EndReason::Stopped;
        }

        match reader.read(&mut buffer) {
            Ok(0) => break EndReason::Eof,
            Ok(n) => {
                trace!("Pump read {} bytes", n);
                if tx.send(PumpEvent::Data(buffer[..n].to_vec())).is_err() {
                    break EndReason::Stopped;
                }
                wake();
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(settings.idle_sleep);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => break EndReason::ReadError(e.to_string()),
        }
    };

    // Every chunk read so far has already been sent
    state.store(PumpState::Draining as u8, Ordering::SeqCst);
    info!("I/O pump ending: {:?}", reason);
    let _ = tx.send(PumpEvent::Ended(reason));
    wake();

    state.store(PumpState::Stopped as u8, Ordering::SeqCst);
}
