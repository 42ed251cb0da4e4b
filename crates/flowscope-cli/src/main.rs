//! # flowscope-cli
//!
//! Binary entry point for Flowscope.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Configuration loading and validation
//! - `summarize`, `replay` and `watch` over workflow log files

mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use flowscope_core::pacer::{self, Delivery, PacerDriver};
use flowscope_core::{
    FlowConfig, FlowSession, LineSource, PacerMode, ReplayRecords, ReplaySource, TailReader,
    TailSource,
};
use flowscope_proto::FlowUpdate;
use std::io::{IsTerminal, stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if stdout is a TTY
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    /// Returns true if colors should be used based on mode and terminal detection.
    fn should_use_colors(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout().is_terminal(),
        }
    }
}

/// Output format for the final board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BoardFormat {
    /// Human-readable board
    #[default]
    Text,
    /// Snapshot as pretty-printed JSON
    Json,
}

/// Output format for update feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FeedFormat {
    /// One human-readable line per update
    #[default]
    Text,
    /// One JSON object per update
    Jsonl,
}

/// Pacer override for replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaceArg {
    Off,
    Fixed,
    Smoothed,
}

impl From<PaceArg> for PacerMode {
    fn from(pace: PaceArg) -> Self {
        match pace {
            PaceArg::Off => PacerMode::Off,
            PaceArg::Fixed => PacerMode::Fixed,
            PaceArg::Smoothed => PacerMode::Smoothed,
        }
    }
}

/// Flowscope - live role board for multi-role workflow logs
#[derive(Parser, Debug)]
#[command(name = "flowscope", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "flowscope.yml", global = true)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output mode (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reduce a whole log file and print the final board
    Summarize(SummarizeArgs),

    /// Replay a log file through the render pacer and print every update
    Replay(ReplayArgs),

    /// Follow a growing log file until interrupted
    Watch(WatchArgs),
}

#[derive(Parser, Debug)]
struct SummarizeArgs {
    /// Log file to read
    file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = BoardFormat::Text)]
    format: BoardFormat,
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Log file to replay
    file: PathBuf,

    /// Override the configured pacer mode
    #[arg(long, value_enum)]
    pace: Option<PaceArg>,

    /// Output format
    #[arg(long, value_enum, default_value_t = FeedFormat::Text)]
    format: FeedFormat,
}

#[derive(Parser, Debug)]
struct WatchArgs {
    /// Log file to follow
    file: PathBuf,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_ms: u64,

    /// Read the file from the beginning instead of only new lines
    #[arg(long)]
    from_start: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = FeedFormat::Text)]
    format: FeedFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli.config)?;
    let use_colors = cli.color.should_use_colors();

    match cli.command {
        Commands::Summarize(args) => summarize(&config, args, use_colors),
        Commands::Replay(args) => replay(config, args, use_colors).await,
        Commands::Watch(args) => watch(&config, args, use_colors).await,
    }
}

fn load_config(path: &Path) -> Result<FlowConfig> {
    if !path.exists() {
        debug!("Config file {:?} not found, using defaults", path);
    }
    let config = FlowConfig::from_file_or_default(path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;

    let warnings = config
        .validate()
        .with_context(|| format!("Invalid configuration in {:?}", path))?;
    for warning in &warnings {
        warn!("{}", warning);
    }
    Ok(config)
}

fn summarize(config: &FlowConfig, args: SummarizeArgs, use_colors: bool) -> Result<()> {
    let records = ReplayRecords::from_path(&args.file)
        .with_context(|| format!("Failed to read log file {:?}", args.file))?;

    let mut session = FlowSession::new(config.transcript.clone());
    let changes = session.feed_all(records.lines());
    info!(
        lines = records.len(),
        changes,
        span_ms = records.duration_ms(),
        "Summarized {:?}",
        args.file
    );

    match args.format {
        BoardFormat::Text => print!("{}", render::board(session.state(), use_colors)),
        BoardFormat::Json => {
            let json = serde_json::to_string_pretty(session.state().as_ref())?;
            println!("{json}");
        }
    }
    Ok(())
}

fn print_updates(updates: &[FlowUpdate], format: FeedFormat, use_colors: bool) -> Result<()> {
    for update in updates {
        match format {
            FeedFormat::Text => println!("{}", render::update_line(update, use_colors)),
            FeedFormat::Jsonl => println!("{}", serde_json::to_string(update)?),
        }
    }
    Ok(())
}

async fn replay(mut config: FlowConfig, args: ReplayArgs, use_colors: bool) -> Result<()> {
    if let Some(pace) = args.pace {
        config.pacer.mode = pace.into();
    }
    let pacer = pacer::from_config(&config.pacer).context("Invalid pacer options")?;
    let mut source = ReplaySource::new(&args.file);
    let mut session = FlowSession::new(config.transcript.clone());

    let Some(pacer) = pacer else {
        while let Some(line) = source.next_line().await {
            print_updates(&session.feed_updates(&line), args.format, use_colors)?;
        }
        return Ok(());
    };

    info!(mode = ?config.pacer.mode, "Replaying {:?}", args.file);
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let mut handle = PacerDriver::spawn(pacer, move |delivery: Delivery| {
        for line in delivery.lines {
            let _ = tx.send(line);
        }
    });
    while let Some(line) = source.next_line().await {
        handle.push(line);
    }
    handle.close();

    loop {
        tokio::select! {
            line = rx.recv() => match line {
                Some(line) => print_updates(&session.feed_updates(&line), args.format, use_colors)?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, dropping undelivered lines");
                handle.stop();
                break;
            }
        }
    }
    Ok(())
}

async fn watch(config: &FlowConfig, args: WatchArgs, use_colors: bool) -> Result<()> {
    let reader = if args.from_start {
        TailReader::new(&args.file)
    } else {
        TailReader::from_end(&args.file)
            .with_context(|| format!("Failed to open log file {:?}", args.file))?
    };
    let mut source = TailSource::new(reader, Duration::from_millis(args.poll_ms.max(1)));
    let stop = source.stop_signal();
    let mut session = FlowSession::new(config.transcript.clone());
    info!("Watching {:?}, press Ctrl-C to stop", args.file);

    loop {
        tokio::select! {
            line = source.next_line() => match line {
                Some(line) => print_updates(&session.feed_updates(&line), args.format, use_colors)?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                stop.stop();
                break;
            }
        }
    }

    if args.format == FeedFormat::Text {
        print!("{}", render::board(session.state(), use_colors));
    }
    Ok(())
}
