//! Soundpad - console front-end
//!
//! This is the main entry point for the command-line soundpad. It:
//! 1. Loads the persisted configuration and sound manifest
//! 2. Opens the microphone and (virtual) output streams
//! 3. Reads commands from stdin and drives the engine's control plane
//! 4. Closes the push-to-talk gate once a triggered clip has played out
//!
//! ## Command line flags
//!
//! - `--config <path>`: Use a config file other than the default location
//! - `--no-start`: Do not open the audio streams until `start` is entered
//! - `--list-hosts`: Print the audio hosts available on this machine and exit

mod command;
mod gate;
mod session;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam::channel::{self, RecvTimeoutError};

use soundpad_core::audio::{available_host_names, CpalBackend};
use soundpad_core::config::{default_config_path, load_config, SoundpadConfig};
use soundpad_core::engine::SoundpadEngine;

use command::{Command, HELP};
use session::Session;

/// How often the gate deadline and stream events are checked
const TICK: Duration = Duration::from_millis(50);

struct Args {
    config_path: PathBuf,
    no_start: bool,
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args {
        config_path: default_config_path(),
        no_start: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                parsed.config_path = args
                    .next()
                    .map(PathBuf::from)
                    .context("--config requires a path")?;
            }
            "--no-start" => parsed.no_start = true,
            "--list-hosts" => {
                for host in available_host_names() {
                    println!("{}", host);
                }
                return Ok(None);
            }
            "--help" | "-h" => {
                println!(
                    "usage: soundpad [--config <path>] [--no-start] [--list-hosts]\n\n{}",
                    HELP
                );
                return Ok(None);
            }
            other => anyhow::bail!("unknown argument '{}'", other),
        }
    }
    Ok(Some(parsed))
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let Some(args) = parse_args()? else {
        return Ok(());
    };

    log::info!("soundpad starting up");
    let config: SoundpadConfig = load_config(&args.config_path);

    let backend = CpalBackend::from_config(config.audio.host.as_deref())
        .context("Failed to open audio host")?;
    log::info!("Audio host: {}", backend.host_name());

    let mut engine = SoundpadEngine::from_config(backend, &config);
    let failures = engine.preload_manifest(&config);
    log::info!(
        "{} sound(s) loaded, {} failed",
        engine.clip_ids().len(),
        failures.len()
    );

    if !args.no_start {
        if let Err(e) = engine.start() {
            log::error!("Failed to start audio streams: {}", e);
            println!("! audio not running ({}); fix devices and enter 'start'", e);
        }
    }

    let mut session = Session::new(engine, config, args.config_path);

    // Stdin is read on its own thread so the gate timer keeps running
    let (line_tx, line_rx) = channel::unbounded::<String>();
    std::thread::Builder::new()
        .name("soundpad-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn stdin reader")?;

    print_prompt();
    loop {
        match line_rx.recv_timeout(TICK) {
            Ok(line) => {
                match line.parse::<Command>() {
                    Ok(command) => {
                        if !session.execute(command, Instant::now()) {
                            break;
                        }
                    }
                    Err(e) if e.is_empty() => {}
                    Err(e) => println!("! {}", e),
                }
                print_prompt();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        session.tick(Instant::now());
    }

    session.engine.stop_stream();
    log::info!("soundpad shut down");
    Ok(())
}

fn print_prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
