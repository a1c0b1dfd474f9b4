use std::{fs::OpenOptions, io, sync::Mutex};

use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::AppError;

/// Installs the global subscriber. The TUI owns the terminal, so without
/// `--log-file` diagnostics are only emitted in headless mode (to stderr).
pub fn init(config: &Config) -> Result<(), AppError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| AppError::Logging(format!("bad --log-level {:?}: {e}", config.log_level)))?;

    let result = match (&config.log_file, config.headless) {
        (Some(path), _) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| AppError::Logging(format!("{}: {e}", path.display())))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        (None, true) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init(),
        (None, false) => return Ok(()),
    };

    result.map_err(|e| AppError::Logging(e.to_string()))
}
