//! Pseudo-terminal (PTY) management
//!
//! A `ProcessChannel` owns the master side of a PTY and the child process
//! spawned on its slave side. Output is read through a `ChannelReader`
//! that is handed to the I/O pump; input and resizes go through the
//! channel itself on the owning thread.

use crate::{Result, ShelltermError};
use log::{debug, info, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// How long `close` waits for the child to exit after SIGHUP before killing it
const HANGUP_GRACE: Duration = Duration::from_millis(50);

/// What to run inside the PTY
///
/// Supplied by whoever manages sessions; the channel does not pick a program
/// beyond falling back to the user's shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCommand {
    /// Program to run. `None` runs `$SHELL`, or `/bin/sh` if unset
    pub program: Option<String>,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl SessionCommand {
    /// The user's default shell
    pub fn shell() -> Self {
        Self::default()
    }

    /// Run `program` with `args`
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        Self {
            program: Some(program.into()),
            args,
            ..Self::default()
        }
    }

    /// Build from an argv-style list; an empty list means the default shell
    pub fn from_argv(argv: &[String]) -> Self {
        match argv.split_first() {
            Some((program, args)) => Self::new(program.clone(), args.to_vec()),
            None => Self::shell(),
        }
    }

    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_cwd<P: Into<PathBuf>>(mut self, cwd: P) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Resolved program name
    pub fn program_name(&self) -> String {
        match &self.program {
            Some(program) => program.clone(),
            None => std::env::var("SHELL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "/bin/sh".to_string()),
        }
    }

    fn to_builder(&self, term: &str) -> CommandBuilder {
        let mut cmd = CommandBuilder::new(self.program_name());
        for arg in &self.args {
            cmd.arg(arg);
        }
        if let Some(cwd) = &self.cwd {
            cmd.cwd(cwd);
        }
        cmd.env("TERM", term);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

/// Blocking reader over the PTY master
///
/// Returns `Ok(0)` once the child side is gone. Linux reports that as
/// `EIO` rather than end-of-file, so it is mapped here.
pub struct ChannelReader {
    inner: Box<dyn Read + Send>,
}

impl ChannelReader {
    pub fn new(inner: Box<dyn Read + Send>) -> Self {
        Self { inner }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.raw_os_error() == Some(nix::libc::EIO) => {
                    debug!("PTY read returned EIO, treating as end of output");
                    return Ok(0);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A child process attached to a pseudo-terminal
pub struct ProcessChannel {
    master: Option<Box<dyn MasterPty + Send>>,

    writer: Option<Box<dyn Write + Send>>,

    /// Present until handed to the pump with `take_reader`
    reader: Option<Box<dyn Read + Send>>,

    child: Option<Box<dyn Child + Send + Sync>>,

    pid: Option<u32>,

    size: PtySize,

    exit_code: Option<u32>,
}

impl ProcessChannel {
    /// Open a PTY of the given size and spawn `command` on it
    pub fn open(command: &SessionCommand, cols: u16, rows: u16, term: &str) -> Result<Self> {
        let pty_system = native_pty_system();

        let size = PtySize {
            rows: rows.max(1),
            cols: cols.max(1),
            pixel_width: 0,
            pixel_height: 0,
        };

        debug!("Opening PTY with size {}x{}", size.cols, size.rows);

        let pair = pty_system
            .openpty(size)
            .map_err(|e| ShelltermError::SpawnFailed(format!("Failed to open PTY: {}", e)))?;

        info!(
            "Spawning {} {:?} (TERM={})",
            command.program_name(),
            command.args,
            term
        );

        let child = pair
            .slave
            .spawn_command(command.to_builder(term))
            .map_err(|e| {
                ShelltermError::SpawnFailed(format!(
                    "Failed to spawn {}: {}",
                    command.program_name(),
                    e
                ))
            })?;

        // Our copy of the slave must go, or reads never see the child hang up
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| ShelltermError::SpawnFailed(format!("Failed to get PTY reader: {}", e)))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| ShelltermError::SpawnFailed(format!("Failed to get PTY writer: {}", e)))?;

        let pid = child.process_id();
        debug!("Child started with pid {:?}", pid);

        Ok(Self {
            master: Some(pair.master),
            writer: Some(writer),
            reader: Some(reader),
            child: Some(child),
            pid,
            size,
            exit_code: None,
        })
    }

    /// Hand out the blocking reader. Only the first call succeeds.
    pub fn take_reader(&mut self) -> Result<ChannelReader> {
        self.reader
            .take()
            .map(ChannelReader::new)
            .ok_or(ShelltermError::Closed)
    }

    /// Write all of `bytes` to the child's input
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(ShelltermError::Closed)?;
        writer
            .write_all(bytes)
            .and_then(|_| writer.flush())
            .map_err(|e| ShelltermError::WriteFailed(e.to_string()))
    }

    /// Tell the child its terminal changed size
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        let master = self.master.as_ref().ok_or(ShelltermError::Closed)?;
        let size = PtySize {
            rows: rows.max(1),
            cols: cols.max(1),
            pixel_width: 0,
            pixel_height: 0,
        };

        debug!("Resizing PTY to {}x{}", size.cols, size.rows);
        master
            .resize(size)
            .map_err(|e| ShelltermError::ResizeFailed(e.to_string()))?;
        self.size = size;
        Ok(())
    }

    /// Current size as (cols, rows)
    pub fn size(&self) -> (u16, u16) {
        (self.size.cols, self.size.rows)
    }

    pub fn process_id(&self) -> Option<u32> {
        self.pid
    }

    /// Exit code of the child, once it has been reaped
    pub fn exit_code(&self) -> Option<u32> {
        self.exit_code
    }

    pub fn is_closed(&self) -> bool {
        self.master.is_none()
    }

    /// Whether the child is still running
    pub fn is_alive(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                self.exit_code = Some(status.exit_code());
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("Failed to poll child status: {}", e);
                false
            }
        }
    }

    /// Terminate the child and release the PTY
    ///
    /// Sends SIGHUP, gives the child a short grace period, then kills it.
    /// Safe to call any number of times; later calls do nothing.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        debug!("Closing process channel (pid {:?})", self.pid);

        if let Some(mut child) = self.child.take() {
            if self.exit_code.is_none() {
                if let Some(pid) = self.pid {
                    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGHUP) {
                        debug!("SIGHUP to {} failed: {}", pid, e);
                    }
                }
                self.exit_code = reap(child.as_mut(), HANGUP_GRACE);
                if self.exit_code.is_none() {
                    if let Err(e) = child.kill() {
                        debug!("Kill of child failed: {}", e);
                    }
                    self.exit_code = reap(child.as_mut(), HANGUP_GRACE);
                }
            }
        }

        self.writer = None;
        self.reader = None;
        self.master = None;
        info!("Process channel closed (exit code {:?})", self.exit_code);
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Poll the child for up to `grace`, returning its exit code if it exited
fn reap(child: &mut (dyn Child + Send + Sync), grace: Duration) -> Option<u32> {
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status.exit_code()),
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(5)),
            Ok(None) => return None,
            Err(e) => {
                debug!("try_wait failed: {}", e);
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(Vec<io::Result<Vec<u8>>>);

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Ok(0);
            }
            match self.0.remove(0) {
                Ok(data) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                Err(e) => Err(e),
            }
        }
    }

    #[test]
    fn test_reader_maps_eio_to_eof() {
        let mut reader = ChannelReader::new(Box::new(Scripted(vec![
            Ok(b"hi".to_vec()),
            Err(io::Error::from_raw_os_error(nix::libc::EIO)),
        ])));
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_reader_retries_interrupted() {
        let mut reader = ChannelReader::new(Box::new(Scripted(vec![
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Ok(b"x".to_vec()),
        ])));
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'x');
    }

    #[test]
    fn test_reader_passes_other_errors() {
        let mut reader = ChannelReader::new(Box::new(Scripted(vec![Err(io::Error::from(
            io::ErrorKind::PermissionDenied,
        ))])));
        let mut buf = [0u8; 4];
        assert!(reader.read(&mut buf).is_err());
    }

    #[test]
    fn test_command_from_argv() {
        let argv = vec!["ls".to_string(), "-l".to_string()];
        let cmd = SessionCommand::from_argv(&argv);
        assert_eq!(cmd.program.as_deref(), Some("ls"));
        assert_eq!(cmd.args, vec!["-l".to_string()]);

        assert_eq!(SessionCommand::from_argv(&[]), SessionCommand::shell());
    }

    #[test]
    fn test_explicit_program_name() {
        let cmd = SessionCommand::new("/bin/echo", vec![]);
        assert_eq!(cmd.program_name(), "/bin/echo");
    }
}
