use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_MAX_POINTS, DEFAULT_OUTPUT, DEFAULT_PORT, MAX_LINES_PER_TICK,
    READ_TIMEOUT_MS, SETTLE_DELAY_MS, TICK_RATE_MS,
};
use crate::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "sensor_plot",
    version,
    about = "Log numeric samples from a serial device to CSV and chart them live"
)]
pub struct Args {
    /// Serial device to read from
    #[arg(short, long, default_value = DEFAULT_PORT)]
    pub port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,

    /// CSV file samples are appended to
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Number of recent points kept on the chart
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_POINTS)]
    pub max_points: usize,

    /// Redraw interval in milliseconds
    #[arg(short, long, default_value_t = TICK_RATE_MS)]
    pub interval: u64,

    /// Per-read timeout in milliseconds
    #[arg(long, default_value_t = READ_TIMEOUT_MS)]
    pub read_timeout: u64,

    /// Delay after opening the port before reading, in milliseconds
    #[arg(long, default_value_t = SETTLE_DELAY_MS)]
    pub settle: u64,

    /// Most lines read per redraw tick; the rest wait for the next one
    #[arg(long, default_value_t = MAX_LINES_PER_TICK)]
    pub max_lines_per_tick: usize,

    /// Print samples to stdout instead of drawing a chart
    #[arg(long)]
    pub headless: bool,

    /// Write diagnostics to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}

/// Settings for one run, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: String,
    pub baud_rate: u32,
    pub output: PathBuf,
    pub max_points: usize,
    pub tick: Duration,
    pub read_timeout: Duration,
    pub settle: Duration,
    pub line_budget: usize,
    pub headless: bool,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
}

impl TryFrom<Args> for Config {
    type Error = AppError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.max_points == 0 {
            return Err(AppError::Config("--max-points must be at least 1".into()));
        }
        if args.interval == 0 {
            return Err(AppError::Config("--interval must be at least 1 ms".into()));
        }
        if args.read_timeout == 0 {
            return Err(AppError::Config("--read-timeout must be at least 1 ms".into()));
        }
        if args.max_lines_per_tick == 0 {
            return Err(AppError::Config("--max-lines-per-tick must be at least 1".into()));
        }
        if args.baud == 0 {
            return Err(AppError::Config("--baud must be non-zero".into()));
        }

        Ok(Config {
            port: args.port,
            baud_rate: args.baud,
            output: args.output,
            max_points: args.max_points,
            tick: Duration::from_millis(args.interval),
            read_timeout: Duration::from_millis(args.read_timeout),
            settle: Duration::from_millis(args.settle),
            line_budget: args.max_lines_per_tick,
            headless: args.headless,
            log_file: args.log_file,
            log_level: args.log_level,
        })
    }
}
