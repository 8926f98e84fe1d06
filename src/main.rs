//! midikey binary: drive keyboard-consuming software from a MIDI controller.
//!
//! Control operations are read from stdin, one per line: `<operation> [payload]`,
//! e.g. `midi-output-transpose -12` or `scheduler {"enabled": true}`. Each answer is
//! printed as one JSON line. Closing stdin stops the engine.

use clap::Parser;
use midikey::{Controller, EngineConfig, MidikeyEngine};
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Translate MIDI notes into keystrokes")]
struct Cli {
    /// Note → key binding table (JSON).
    #[arg(long, short)]
    bindings: PathBuf,
    /// Quiet period before held modifiers are released, in milliseconds.
    #[arg(long, default_value_t = 500)]
    idle_ms: u64,
    /// MIDI input device index to open at startup.
    #[arg(long)]
    input: Option<i32>,
    /// MIDI output device index for thru.
    #[arg(long)]
    output: Option<i32>,
    /// Standard MIDI File to load for scheduled playback.
    #[arg(long)]
    recording: Option<PathBuf>,
    /// Reference time server to sync with.
    #[arg(long)]
    time_server: Option<String>,
    /// Ignore stdin and run until killed.
    #[arg(long)]
    no_stdin: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> midikey::Result<()> {
    let config = EngineConfig {
        idle_duration: Duration::from_millis(cli.idle_ms),
        time_server: cli.time_server,
        ..Default::default()
    }
    .with_bindings_file(&cli.bindings)?;
    info!(bindings = config.bindings.len(), "bindings loaded");

    let engine = Arc::new(MidikeyEngine::builder().config(config).build()?);
    if let Some(index) = cli.input {
        engine.select_input(index)?;
    }
    if let Some(index) = cli.output {
        engine.select_output(index)?;
    }
    if let Some(path) = &cli.recording {
        engine.load_recording(std::fs::File::open(path)?)?;
    }

    if !cli.no_stdin {
        let controller = Controller::new(Arc::clone(&engine));
        thread::Builder::new()
            .name("stdin-control".into())
            .spawn(move || serve_stdin(&controller))?;
    }

    engine.wait()
}

fn serve_stdin(controller: &Controller) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (operation, payload) = match line.split_once(char::is_whitespace) {
            Some((op, rest)) => (op, Some(rest.trim())),
            None => (line, None),
        };
        match controller.dispatch(operation, payload) {
            Ok(value) => println!("{value}"),
            Err(e) => println!(
                "{}",
                serde_json::json!({ "status": e.status_code(), "error": e.to_string() })
            ),
        }
    }
    info!("stdin closed, shutting down");
    controller.engine().shutdown();
}
