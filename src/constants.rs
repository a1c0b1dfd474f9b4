pub const TICK_RATE_MS: u64 = 10;
pub const READ_TIMEOUT_MS: u64 = 100;
pub const SETTLE_DELAY_MS: u64 = 2000;

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_MAX_POINTS: usize = 500;
pub const DEFAULT_OUTPUT: &str = "sensor_data.csv";

#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM4";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

// Upper bound on read attempts per tick so a flooding device can't starve the UI
pub const MAX_LINES_PER_TICK: usize = 1024;
// A "line" longer than this without a newline is garbage, not a sample
pub const MAX_LINE_BYTES: usize = 256;

pub const CSV_HEADER: &str = "timestamp,value";
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

// Roughly this many x-axis labels regardless of window size
pub const X_LABEL_TARGET: usize = 10;
