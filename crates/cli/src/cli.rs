//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Rig Capture - multi-view camera rig capture for the CARLA simulator
#[derive(Parser, Debug)]
#[command(
    name = "rig-capture",
    author,
    version,
    about = "Multi-view camera rig capture for CARLA",
    long_about = "Mounts a vehicle's camera rig in CARLA and records every tick.\n\n\
                  Loads the rig setup of a car, spawns one color camera per view of the \n\
                  selected sector plus a depth camera on its center view, and writes \n\
                  one compressed archive per view and frame."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RIG_CAPTURE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RIG_CAPTURE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Spawn the rig and capture frames
    Run(RunArgs),

    /// Validate a car setup without running
    Validate(ValidateArgs),

    /// Display sectors and views of a car setup
    Info(InfoArgs),
}

/// Which car setup to load
#[derive(Args, Debug, Clone)]
pub struct SetupArgs {
    /// Directory holding `{car}.json` / `{car}.toml` setup files
    #[arg(long, default_value = "car_setups", env = "RIG_CAPTURE_SETUP_DIR")]
    pub setup_dir: PathBuf,

    /// Car whose rig to load
    #[arg(long, default_value = "Alfred", env = "RIG_CAPTURE_CAR")]
    pub car: String,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub setup: SetupArgs,

    /// Sector to capture ("random" or "rand" picks one)
    #[arg(long, default_value = "main", env = "RIG_CAPTURE_SECTOR")]
    pub sector: String,

    /// Map name, prefix of the simulation id
    #[arg(long, default_value = "Town01", env = "RIG_CAPTURE_MAP")]
    pub map: String,

    /// Simulation id suffix (defaults to the current Unix time)
    #[arg(short, long)]
    pub id: Option<i64>,

    /// Output directory (defaults to `{output_root}/{car}/{sector}`)
    #[arg(short, long, env = "RIG_CAPTURE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Root of the default output directory
    #[arg(long, default_value = "output", env = "RIG_CAPTURE_OUTPUT_ROOT")]
    pub output_root: PathBuf,

    /// Sensor capture interval in seconds
    #[arg(long, default_value = "0.1", env = "RIG_CAPTURE_INTERVAL")]
    pub capture_interval: f64,

    /// Number of ticks to run (0 = until interrupted)
    #[arg(long, default_value = "0")]
    pub ticks: u64,

    /// Milliseconds between ticks
    #[arg(long, default_value = "100")]
    pub tick_ms: u64,

    /// Start a new clip every N seconds (0 = never)
    #[arg(short, long, default_value = "0")]
    pub clip_interval: u64,

    /// Where records go
    #[arg(long, value_enum, default_value = "npz")]
    pub sink: SinkArg,

    /// Vehicle blueprint the rig is mounted on
    #[arg(long, default_value = "vehicle.tesla.model3")]
    pub vehicle: String,

    /// CARLA server host
    #[arg(long, default_value = "127.0.0.1", env = "CARLA_HOST")]
    pub host: String,

    /// CARLA server port
    #[arg(short, long, default_value = "2000", env = "CARLA_PORT")]
    pub port: u16,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "RIG_CAPTURE_METRICS_PORT")]
    pub metrics_port: u16,

    /// Use the mock client even when built with CARLA support
    #[arg(long)]
    pub mock: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub setup: SetupArgs,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub setup: SetupArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Record sink
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SinkArg {
    /// Compressed archives on disk
    #[default]
    Npz,
    /// Log records only
    Log,
}

impl From<SinkArg> for dispatcher::SinkKind {
    fn from(arg: SinkArg) -> Self {
        match arg {
            SinkArg::Npz => dispatcher::SinkKind::Npz,
            SinkArg::Log => dispatcher::SinkKind::Log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["rig-capture", "run", "--car", "sedan"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.setup.car, "sedan");
        assert_eq!(args.sector, "main");
        assert_eq!(args.sink, SinkArg::Npz);
        assert_eq!(args.ticks, 0);
        assert!(args.id.is_none());
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "rig-capture",
            "-vv",
            "run",
            "--sector",
            "random",
            "--id",
            "42",
            "--ticks",
            "5",
            "--sink",
            "log",
            "--mock",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.sector, "random");
        assert_eq!(args.id, Some(42));
        assert_eq!(args.ticks, 5);
        assert_eq!(args.sink, SinkArg::Log);
        assert!(args.mock);
    }
}
