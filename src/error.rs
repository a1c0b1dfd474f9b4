use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures that stop the acquisition loop. Per-line problems never end up here.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("serial read failed: {0}")]
    Source(#[source] io::Error),
    #[error("writing record file failed: {0}")]
    Sink(#[source] io::Error),
}

/// Fatal errors surfaced to the user before exiting.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("cannot open serial port {port}: {source}{hint}")]
    OpenPort {
        port: String,
        #[source]
        source: serialport::Error,
        hint: String,
    },
    #[error("cannot open record file {}: {source}", path.display())]
    OpenSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
    #[error("cannot install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("cannot set up logging: {0}")]
    Logging(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}
