mod commands;
mod delegate;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

/// Record a short voice memo as Opus frames in memory, then play it back.
#[derive(Parser, Debug)]
#[command(name = "opus-memo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List input and output devices
    Devices,
    /// Record from the microphone, then play the recording back
    RecordAndPlay(RecordArgs),
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Seconds to record before stopping
    #[arg(short, long, default_value_t = 5.0)]
    pub seconds: f64,

    /// Codec configuration as JSON
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input device name (default device if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Output device name (default device if omitted)
    #[arg(long)]
    pub output: Option<String>,

    /// Print session events as JSON lines on stdout
    #[arg(long)]
    pub events: bool,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG still wins when set.
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("opus_memo", level)
        .parse_default_env()
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Devices => commands::list_devices(),
        Command::RecordAndPlay(args) => commands::record_and_play(&args),
    }
}
