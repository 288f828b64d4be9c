//! Command-line player for the orchestra.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing::{error, info};

use cosmic_orchestra::error::Result;
use cosmic_orchestra::output::list_output_devices;
use cosmic_orchestra::renderer;
use cosmic_orchestra::session::LiveSession;
use cosmic_orchestra::{DataSource, JsonFileSource, OrchestraConfig, OrchestraError};

/// Sonify space-weather snapshots
#[derive(Parser)]
#[command(name = "cosmic-orchestra")]
#[command(about = "Real-time sonification of space-weather data", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play live through the default output device
    Play {
        /// Configuration file (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Snapshot document, re-read on every update
        #[arg(long)]
        snapshot: PathBuf,
        /// Seconds between updates, overriding the configuration
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many seconds instead of waiting for Enter
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Render a snapshot to a WAV file
    Render {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
        #[arg(long, short)]
        output: PathBuf,
    },

    /// List audio output devices
    Devices,

    /// Validate a configuration file
    CheckConfig { file: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Play {
            config,
            snapshot,
            interval,
            duration,
        } => play(config.as_deref(), snapshot, interval, duration),
        Commands::Render {
            config,
            snapshot,
            seconds,
            output,
        } => render(config.as_deref(), snapshot, seconds, &output),
        Commands::Devices => devices(),
        Commands::CheckConfig { file } => return check_config(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<OrchestraConfig> {
    match path {
        Some(path) => OrchestraConfig::load(path),
        None => Ok(OrchestraConfig::default()),
    }
}

fn play(config: Option<&Path>, snapshot: PathBuf, interval: Option<u64>, duration: Option<f64>) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(secs) = interval {
        config.control.update_interval_secs = secs.max(1);
    }

    let source: Box<dyn DataSource> = Box::new(JsonFileSource::new(snapshot));
    let session = LiveSession::start(&config, source)?;
    info!(sample_rate = session.sample_rate(), "playing");

    match duration {
        Some(secs) => thread::sleep(Duration::from_secs_f64(secs.max(0.0))),
        None => wait_for_enter(&session),
    }

    session.shutdown();
    Ok(())
}

/// Block until a line arrives on stdin, reporting playback position now
/// and then.
fn wait_for_enter(session: &LiveSession) {
    println!("Press Enter to stop.");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = tx.send(());
    });

    let counter = session.frame_counter();
    let started = Instant::now();
    loop {
        match rx.recv_timeout(Duration::from_secs(30)) {
            Err(RecvTimeoutError::Timeout) => info!(
                frames = counter.frames(),
                elapsed_secs = started.elapsed().as_secs(),
                updating = session.is_updating(),
                "still playing"
            ),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn render(config: Option<&Path>, snapshot: PathBuf, seconds: f64, output: &Path) -> Result<()> {
    let config = load_config(config)?;
    let mut source = JsonFileSource::new(snapshot);
    let snapshot = source.fetch()?;
    let samples = renderer::render_samples(&config, &snapshot, seconds);
    renderer::write_wav_file(output, &samples, config.sample_rate)
}

fn devices() -> Result<()> {
    let devices = list_output_devices()?;
    if devices.is_empty() {
        println!("No output devices found.");
    }
    for (i, (name, channels)) in devices.iter().enumerate() {
        println!("{i:>2}: {name} ({channels} ch)");
    }
    Ok(())
}

fn check_config(path: &Path) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(source) => {
            let e = OrchestraError::Io {
                path: path.to_path_buf(),
                source,
            };
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match OrchestraConfig::from_json_str(&source) {
        Ok(config) => {
            println!(
                "{}: ok ({} Hz, {} sections)",
                path.display(),
                config.sample_rate,
                config.sections.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.report(&path.display().to_string(), &source).trim_end());
            ExitCode::FAILURE
        }
    }
}
