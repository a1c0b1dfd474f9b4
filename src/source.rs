use std::{
    io::{self, Read},
    thread,
};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::config::Config;
use crate::constants::MAX_LINE_BYTES;
use crate::error::AppError;

const READ_CHUNK: usize = 256;

/// Where raw lines come from. Implementations must not block for longer than
/// their configured read timeout.
pub trait ByteSource {
    fn bytes_available(&mut self) -> io::Result<bool>;

    /// `Ok(None)` means no complete line arrived within the read timeout.
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Releases the device. Any partial line still pending is discarded.
    fn close(self)
    where
        Self: Sized;
}

/// Splits a byte stream into `\n`-terminated lines, carrying partial lines
/// across reads. Lines longer than `max_line` are dropped whole.
pub struct LineFramer {
    pending: Vec<u8>,
    max_line: usize,
    skipping: bool,
}

impl LineFramer {
    pub fn new(max_line: usize) -> Self {
        Self {
            pending: Vec::with_capacity(max_line),
            max_line,
            skipping: false,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    pub fn has_line(&self) -> bool {
        self.pending.contains(&b'\n')
    }

    pub fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            let newline = self.pending.iter().position(|&b| b == b'\n');

            if self.skipping {
                // Still inside an over-long line; throw away up to its end
                match newline {
                    Some(pos) => {
                        self.pending.drain(..=pos);
                        self.skipping = false;
                        continue;
                    }
                    None => {
                        self.pending.clear();
                        return Ok(None);
                    }
                }
            }

            return match newline {
                Some(pos) if pos <= self.max_line => {
                    let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
                    line.pop();
                    Ok(Some(line))
                }
                Some(pos) => {
                    self.pending.drain(..=pos);
                    Err(self.overflow())
                }
                None if self.pending.len() > self.max_line => {
                    self.pending.clear();
                    self.skipping = true;
                    Err(self.overflow())
                }
                None => Ok(None),
            };
        }
    }

    /// Drops any partial line, returning how many bytes were discarded.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.skipping = false;
        dropped
    }

    fn overflow(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line longer than {} bytes discarded", self.max_line),
        )
    }
}

pub struct SerialSource {
    port: Box<dyn SerialPort>,
    name: String,
    framer: LineFramer,
}

impl SerialSource {
    pub fn open(config: &Config) -> Result<Self, AppError> {
        info!(port = %config.port, baud = config.baud_rate, "opening serial port");

        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(config.read_timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()
            .map_err(|source| AppError::OpenPort {
                port: config.port.clone(),
                source,
                hint: port_hint(),
            })?;

        // Many boards reset when the port opens; give them time to come up
        if !config.settle.is_zero() {
            debug!(settle_ms = config.settle.as_millis() as u64, "waiting for device");
            thread::sleep(config.settle);
        }

        Ok(Self::from_port(port, &config.port))
    }

    /// Wraps an already opened and configured port.
    pub fn from_port(port: Box<dyn SerialPort>, name: &str) -> Self {
        Self {
            port,
            name: name.to_string(),
            framer: LineFramer::new(MAX_LINE_BYTES),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ByteSource for SerialSource {
    fn bytes_available(&mut self) -> io::Result<bool> {
        if self.framer.has_line() {
            return Ok(true);
        }
        Ok(self.port.bytes_to_read().map_err(io::Error::from)? > 0)
    }

    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        if let Some(line) = self.framer.next_line()? {
            return Ok(Some(line));
        }

        let mut chunk = [0u8; READ_CHUNK];
        match self.port.read(&mut chunk) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.framer.push(&chunk[..n]);
                self.framer.next_line()
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn close(mut self) {
        let dropped = self.framer.discard();
        if dropped > 0 {
            debug!(bytes = dropped, "discarding partial line on close");
        }
        info!(port = %self.name, "serial port closed");
    }
}

pub fn list_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            debug!(error = %e, "port enumeration failed");
            Vec::new()
        }
    }
}

fn port_hint() -> String {
    let ports = list_ports();
    if ports.is_empty() {
        String::from(" (no serial ports detected)")
    } else {
        format!(" (available: {})", ports.join(", "))
    }
}
