mod acquire;
mod app;
mod chart;
mod config;
mod constants;
mod error;
mod history;
mod logging;
mod sample;
mod sink;
mod source;
mod ui;
mod util;

use std::{
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use clap::Parser;
use tracing::info;

use crate::acquire::Acquisition;
use crate::app::App;
use crate::config::{Args, Config};
use crate::error::{AcquireError, AppError};
use crate::sink::{CsvSink, RecordSink};
use crate::source::{ByteSource, SerialSource};

fn main() {
    let args = Args::parse();

    if args.list_ports {
        let ports = source::list_ports();
        if ports.is_empty() {
            println!("No serial ports found.");
        }
        for port in ports {
            println!("{}", port);
        }
        return;
    }

    if let Err(err) = Config::try_from(args).and_then(run) {
        tracing::error!(%err, "fatal");
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn run(config: Config) -> Result<(), AppError> {
    logging::init(&config)?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    println!("Connecting to {} at {} baud...", config.port, config.baud_rate);
    let source = SerialSource::open(&config)?;
    println!("Connected. Reading data...");

    let sink = CsvSink::open(&config.output).map_err(|source| AppError::OpenSink {
        path: config.output.clone(),
        source,
    })?;
    if sink.created() {
        println!("Created new file: {}", config.output.display());
    } else {
        println!("Using existing file: {}", config.output.display());
    }

    let name = source.name().to_string();
    let acquisition =
        Acquisition::new(source, sink, config.max_points).with_line_budget(config.line_budget);
    let mut app = App::new(acquisition, &name, config.tick);

    info!(capacity = config.max_points, tick_ms = config.tick.as_millis() as u64, "acquisition started");
    let result = if config.headless {
        println!("Printing samples. Press Ctrl+C to stop.");
        ui::run_headless(&mut app, &running)
    } else {
        ui::run(&mut app, &running)
    };

    println!("Stopping. Closing connection and file...");
    let closed = shutdown(app, &config);
    result.and(closed)
}

// Close the record file, then the port, reporting each even if the file fails
fn shutdown<S: ByteSource, K: RecordSink>(app: App<S, K>, config: &Config) -> Result<(), AppError> {
    let released = app.release();

    match &released.rows {
        Ok(rows) => println!("Record file {} closed ({} rows this run).", config.output.display(), rows),
        Err(e) => eprintln!("Record file {} closed with unwritten data: {}", config.output.display(), e),
    }
    println!("Serial port {} closed.", config.port);

    let stats = released.stats;
    println!(
        "Lines: {} accepted, {} empty, {} malformed, {} unexpected.",
        stats.accepted, stats.empty, stats.malformed, stats.unexpected
    );
    info!(?stats, "shutdown complete");

    released
        .rows
        .map(|_| ())
        .map_err(|e| AppError::Acquire(AcquireError::Sink(e)))
}
