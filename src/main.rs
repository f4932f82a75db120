//! shellterm main entry point
//!
//! Runs one session headlessly: spawns the command on a PTY, optionally
//! submits some text, waits for the child to finish (or a timeout), then
//! prints what the screen shows.

use anyhow::{bail, Context};
use log::{debug, error, info, warn};
use shellterm::session::{Session, SessionSettings};
use shellterm::terminal::SessionCommand;
use shellterm::Config;
use std::process;
use std::time::{Duration, Instant};

/// Longest single wait for output, so scheduled input stays on time
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const USAGE: &str = "Usage: shellterm [-d|--debug] [--json] [--cols N] [--rows N] \
                     [--timeout SECS] [--send TEXT] [--] [command args...]";

#[derive(Debug, Default)]
struct Options {
    debug: bool,
    json: bool,
    cols: Option<u16>,
    rows: Option<u16>,
    timeout: Option<Duration>,
    send: Vec<String>,
    command: Vec<String>,
}

fn parse_args(args: &[String]) -> anyhow::Result<Options> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-d" | "--debug" => options.debug = true,
            "--json" => options.json = true,
            "--cols" => {
                let cols = take_value(&mut iter, "--cols")?;
                options.cols = Some(cols.parse().context("invalid --cols")?);
            }
            "--rows" => {
                let rows = take_value(&mut iter, "--rows")?;
                options.rows = Some(rows.parse().context("invalid --rows")?);
            }
            "--timeout" => {
                let secs: f64 = take_value(&mut iter, "--timeout")?
                    .parse()
                    .context("invalid --timeout")?;
                if !secs.is_finite() || !(0.0..=86_400.0 * 365.0).contains(&secs) {
                    bail!("invalid --timeout: {}", secs);
                }
                options.timeout = Some(Duration::from_secs_f64(secs));
            }
            "--send" => {
                let text = take_value(&mut iter, "--send")?;
                options.send.push(text);
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            "--" => {
                options.command.extend(iter.by_ref().cloned());
                break;
            }
            other if other.starts_with('-') => {
                bail!("unknown option {}\n{}", other, USAGE);
            }
            _ => {
                options.command.push(arg.clone());
                options.command.extend(iter.by_ref().cloned());
                break;
            }
        }
    }

    Ok(options)
}

fn take_value(iter: &mut std::slice::Iter<'_, String>, name: &str) -> anyhow::Result<String> {
    iter.next()
        .cloned()
        .with_context(|| format!("{} needs a value", name))
}

fn init_logging(debug_mode: bool) {
    if debug_mode {
        // Debug mode: write to shellterm.log
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("shellterm.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open shellterm.log: {}", e);
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .init();
            }
        }

        info!(
            "shellterm version {} starting (debug mode, logging to shellterm.log)",
            shellterm::VERSION
        );
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    };

    init_logging(options.debug);

    if let Err(e) = run(options) {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(options: Options) -> anyhow::Result<()> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Using default configuration: {}", e);
            Config::default()
        }
    };

    let mut settings = SessionSettings::from(&config);
    if let Some(cols) = options.cols {
        settings.cols = cols;
    }
    if let Some(rows) = options.rows {
        settings.rows = rows;
    }

    let command = if options.command.is_empty() {
        config.session_command()
    } else {
        SessionCommand::from_argv(&options.command)
    };

    let mut session = Session::open(command, settings, None)
        .with_context(|| format!("starting {}", options.command.join(" ")))?;

    for text in &options.send {
        session.submit_text(text).context("sending input")?;
    }

    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    while session.is_running() {
        let now = Instant::now();
        if deadline.is_some_and(|deadline| now >= deadline) {
            debug!("Timeout reached");
            break;
        }

        if let Err(e) = session.run_scheduled() {
            warn!("Scheduled input failed: {}", e);
        }

        let mut wait = POLL_INTERVAL;
        if let Some(next) = session.time_until_next_scheduled() {
            wait = wait.min(next);
        }
        if let Some(deadline) = deadline {
            wait = wait.min(deadline.saturating_duration_since(now));
        }
        session.wait_for_output(wait);
    }

    session.pump_pending();
    let snapshot = session.snapshot();
    let exit_code = session.exit_code();
    session.close();
    info!("Child exit code: {:?}", exit_code);

    if options.json {
        println!("{}", snapshot.to_json()?);
    } else {
        println!("{}", snapshot.text);
    }

    Ok(())
}
