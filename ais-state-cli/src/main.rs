//! AIS State CLI Application
//!
//! Host application around the ais-state library. It adds:
//! - TOML configuration of the tracked vessels
//! - Replay of decoded-message JSON lines from files or stdin
//! - Printing of every published vessel snapshot (JSON or text)

use ais_state::{MessageRouter, Mmsi};
use anyhow::{anyhow, bail, Result};
use clap::Parser;
use rayon::prelude::*;
use std::io;
use std::path::PathBuf;

mod config;
mod input;
mod report;

use config::{AppConfig, OutputFormat};
use input::ReplayStats;

/// AIS State - project decoded AIS messages onto live vessel state
#[derive(Parser, Debug)]
#[command(name = "ais-state-cli")]
#[command(about = "Replay decoded AIS messages and print per-vessel state snapshots", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Vessel to track, in addition to the configured ones (can be repeated)
    #[arg(short, long, value_name = "MMSI")]
    mmsi: Vec<String>,

    /// Decoded-message JSON lines file (can be repeated; default: stdin)
    #[arg(short, long, value_name = "FILE")]
    input: Vec<PathBuf>,

    /// Snapshot output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Only publish when a message changed at least one field
    #[arg(long)]
    no_heartbeat: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("AIS State CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using ais-state library v{} (enum tables r{})", ais_state::VERSION, ais_state::TABLE_REVISION);

    let config = resolve_config(&args)?;
    if config.tracking.mmsis.is_empty() {
        bail!("No vessels to track: set [tracking] mmsis in the config file or pass --mmsi");
    }

    let stats = run(&config)?;
    log::info!("{}", report::summary(&stats));
    Ok(())
}

/// Merge the config file (if any) with command-line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    for mmsi in &args.mmsi {
        let mmsi = Mmsi::new(mmsi);
        if !config.tracking.mmsis.contains(&mmsi) {
            config.tracking.mmsis.push(mmsi);
        }
    }
    if !args.input.is_empty() {
        config.input.files = args.input.clone();
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if args.no_heartbeat {
        config.tracking.publish_empty_updates = false;
    }

    log::debug!("Configuration resolved: {:?}", config);
    Ok(config)
}

/// Replay all inputs through a fresh router and print every publication
fn run(config: &AppConfig) -> Result<ReplayStats> {
    let router = MessageRouter::new(&config.tracker_config());

    // Fan every vessel channel into one printer
    let (tx, rx) = flume::unbounded();
    for mmsi in router.channels().vessels() {
        router.attach(&mmsi, tx.clone())?;
    }
    drop(tx);
    let printer = report::spawn_printer(rx, config.output.format, io::stdout());

    let stamp = config.input.stamp_received;
    let stats = if config.input.files.is_empty() {
        input::replay(io::stdin().lock(), "<stdin>", &router, stamp)?
    } else {
        // Files are independent streams; per-vessel ordering holds within each file
        config
            .input
            .files
            .par_iter()
            .map(|path| input::replay_file(path, &router, stamp))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .fold(ReplayStats::default(), ReplayStats::merge)
    };

    // Dropping the router closes the channels and lets the printer finish
    drop(router);
    let printed = printer
        .join()
        .map_err(|_| anyhow!("Snapshot printer thread panicked"))??;
    log::debug!("Printed {} snapshot(s)", printed);

    Ok(stats)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
