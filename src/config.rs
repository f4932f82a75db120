//! Configuration management

use crate::session::PumpSettings;
use crate::terminal::SessionCommand;
use crate::{Result, ShelltermError};
use ini::{EscapePolicy, Ini, ParseOption};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Config file name, placed in the home directory
pub const CONFIG_FILE_NAME: &str = ".shellterm.cfg";

/// Keystrokes written to a new session after a delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupInput {
    pub name: String,
    pub delay: Duration,
    pub bytes: Vec<u8>,
}

/// Settings for terminal sessions
///
/// Backed by an INI file. Missing or unparsable values fall back to their
/// defaults, so a partial file is always usable.
#[derive(Debug, Clone)]
pub struct Config {
    ini: Ini,

    /// Where `save` writes; `None` for in-memory configs
    path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_ini(Self::default_ini())
    }
}

impl Config {
    /// Load `~/.shellterm.cfg`, creating it with defaults if missing
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            info!("Config file not found, creating default at {:?}", path);
            let config = Self {
                ini: Self::default_ini(),
                path: Some(path),
            };
            config.save()?;
            return Ok(config);
        }
        Self::load_from(path)
    }

    /// Load from a specific file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from {:?}", path);

        let ini = Ini::load_from_file_opt(path, parse_option()).map_err(|e| {
            ShelltermError::IniParse(format!("Failed to load {}: {}", path.display(), e))
        })?;

        Ok(Self {
            ini,
            path: Some(path.to_path_buf()),
        })
    }

    /// Parse config text
    pub fn parse(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str_opt(text, parse_option())
            .map_err(|e| ShelltermError::IniParse(e.to_string()))?;
        Ok(Self::from_ini(ini))
    }

    /// Wrap an already-built INI document
    pub fn from_ini(ini: Ini) -> Self {
        Self { ini, path: None }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| ShelltermError::Config("Config has no file path".to_string()))?;

        debug!("Saving config to {:?}", path);
        self.ini
            .write_to_file_policy(path, EscapePolicy::Nothing)
            .map_err(|e| ShelltermError::Config(format!("Failed to save config: {}", e)))
    }

    fn config_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or_else(|| ShelltermError::Config("Cannot determine home directory".to_string()))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn default_ini() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("terminal"))
            .set("cols", "120")
            .set("rows", "30")
            .set("scrollback", "10000")
            .set("term", "xterm-256color")
            .set("min_cols", "80")
            .set("min_rows", "24");

        ini.with_section(Some("session"))
            .set("shell", "")
            .set("args", "")
            .set("ended_message", "[Session ended]")
            .set("submit_delay_ms", "100")
            .set("close_timeout_ms", "500");

        ini.with_section(Some("pump"))
            .set("read_buffer", "4096")
            .set("idle_sleep_ms", "5");

        ini.with_section(Some("display")).set("follow_tolerance", "10");

        ini.with_section(Some("startup"));

        ini
    }

    /// Get a value parsed as `T`, or `default`
    pub fn get<T: FromStr>(&self, section: &str, key: &str, default: T) -> T {
        match self.ini.get_from(Some(section), key) {
            Some(raw) => match raw.trim().parse() {
                Ok(value) => value,
                Err(_) => {
                    warn!("Ignoring invalid value {:?} for [{}] {}", raw, section, key);
                    default
                }
            },
            None => default,
        }
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Initial grid width
    pub fn cols(&self) -> u16 {
        self.get("terminal", "cols", 120)
    }

    /// Initial grid height
    pub fn rows(&self) -> u16 {
        self.get("terminal", "rows", 30)
    }

    /// Scrollback capacity in lines
    pub fn scrollback(&self) -> usize {
        self.get("terminal", "scrollback", 10_000)
    }

    /// Value of TERM for spawned children
    pub fn term(&self) -> String {
        self.get_string("terminal", "term", "xterm-256color")
    }

    /// Smallest grid a pixel-based resize may produce
    pub fn min_size(&self) -> (u16, u16) {
        (
            self.get("terminal", "min_cols", 80),
            self.get("terminal", "min_rows", 24),
        )
    }

    /// Program to spawn; `None` means the user's shell
    pub fn shell(&self) -> Option<String> {
        let shell = self.get_string("session", "shell", "");
        let shell = shell.trim();
        (!shell.is_empty()).then(|| shell.to_string())
    }

    pub fn shell_args(&self) -> Vec<String> {
        self.get_string("session", "args", "")
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Command for new sessions
    pub fn session_command(&self) -> SessionCommand {
        match self.shell() {
            Some(program) => SessionCommand::new(program, self.shell_args()),
            None => SessionCommand {
                args: self.shell_args(),
                ..SessionCommand::shell()
            },
        }
    }

    /// Status line shown when a session's child goes away
    pub fn ended_message(&self) -> String {
        self.get_string("session", "ended_message", "[Session ended]")
    }

    /// Delay between submitted text and its Enter
    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.get("session", "submit_delay_ms", 100))
    }

    /// How long closing a session waits for its reader thread
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.get("session", "close_timeout_ms", 500))
    }

    pub fn pump_settings(&self) -> PumpSettings {
        let defaults = PumpSettings::default();
        PumpSettings {
            read_buffer: self.get("pump", "read_buffer", defaults.read_buffer).max(1),
            idle_sleep: Duration::from_millis(self.get("pump", "idle_sleep_ms", 5)),
        }
    }

    pub fn follow_tolerance(&self) -> u32 {
        self.get("display", "follow_tolerance", 10)
    }

    /// Startup keystrokes, in file order
    ///
    /// Each entry reads `<name> = <delay_ms> <text>`. Malformed entries are
    /// skipped with a warning.
    pub fn startup_inputs(&self) -> Vec<StartupInput> {
        let Some(section) = self.ini.section(Some("startup")) else {
            return Vec::new();
        };

        section
            .iter()
            .filter_map(|(name, value)| match parse_startup(value) {
                Some((delay, bytes)) => Some(StartupInput {
                    name: name.to_string(),
                    delay,
                    bytes,
                }),
                None => {
                    warn!("Ignoring malformed startup entry {} = {:?}", name, value);
                    None
                }
            })
            .collect()
    }
}

fn parse_option() -> ParseOption {
    ParseOption {
        enabled_escape: false,
        enabled_quote: false,
        ..ParseOption::default()
    }
}

fn parse_startup(value: &str) -> Option<(Duration, Vec<u8>)> {
    let value = value.trim_start();
    let (delay, text) = match value.split_once(char::is_whitespace) {
        Some((delay, text)) => (delay, text),
        None => (value, ""),
    };
    let delay: u64 = delay.parse().ok()?;
    let bytes = unescape(text)?;
    if bytes.is_empty() {
        return None;
    }
    Some((Duration::from_millis(delay), bytes))
}

/// Expand `\r \n \t \e \\ \xNN` escapes; `None` on a bad escape
pub fn unescape(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next()? {
            'r' => out.push(b'\r'),
            'n' => out.push(b'\n'),
            't' => out.push(b'\t'),
            'e' => out.push(0x1b),
            '\\' => out.push(b'\\'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                if hex.len() != 2 {
                    return None;
                }
                out.push(u8::from_str_radix(&hex, 16).ok()?);
            }
            _ => return None,
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cols(), 120);
        assert_eq!(config.rows(), 30);
        assert_eq!(config.scrollback(), 10_000);
        assert_eq!(config.term(), "xterm-256color");
        assert_eq!(config.min_size(), (80, 24));
        assert_eq!(config.shell(), None);
        assert_eq!(config.ended_message(), "[Session ended]");
        assert_eq!(config.submit_delay(), Duration::from_millis(100));
        assert_eq!(config.pump_settings(), PumpSettings::default());
        assert!(config.startup_inputs().is_empty());
    }

    #[test]
    fn test_invalid_number_falls_back() {
        let config = Config::parse("[terminal]\ncols = wide\n").unwrap();
        assert_eq!(config.cols(), 120);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"ls\r").unwrap(), b"ls\r");
        assert_eq!(unescape(r"\e[A\x41\\").unwrap(), b"\x1b[AA\\");
        assert_eq!(unescape("héllo").unwrap(), "héllo".as_bytes());
        assert!(unescape(r"\q").is_none());
        assert!(unescape(r"\x4").is_none());
    }

    #[test]
    fn test_startup_entries_in_order() {
        let config = Config::parse(
            "[startup]\nlaunch = 500 claude\\r\nchoose = 1500 1\nbroken = soon x\n",
        )
        .unwrap();

        let inputs = config.startup_inputs();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].name, "launch");
        assert_eq!(inputs[0].delay, Duration::from_millis(500));
        assert_eq!(inputs[0].bytes, b"claude\r");
        assert_eq!(inputs[1].bytes, b"1");
    }

    #[test]
    fn test_session_command_from_config() {
        let config = Config::parse("[session]\nshell = /bin/bash\nargs = -l -i\n").unwrap();
        let command = config.session_command();
        assert_eq!(command.program.as_deref(), Some("/bin/bash"));
        assert_eq!(command.args, vec!["-l".to_string(), "-i".to_string()]);
    }

    #[test]
    fn test_save_without_path_fails() {
        assert!(Config::default().save().is_err());
    }
}
