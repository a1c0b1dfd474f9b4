use std::fmt;

use chrono::{Local, NaiveTime, Timelike};
use thiserror::Error;

use crate::constants::TIMESTAMP_FORMAT;

/// One accepted reading: wall-clock time of arrival (millisecond precision) and value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: NaiveTime,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: NaiveTime, value: f64) -> Self {
        Self {
            timestamp: truncate_to_millis(timestamp),
            value,
        }
    }

    pub fn timestamp_label(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.timestamp_label(), self.value)
    }
}

/// Why a raw line did not produce a sample. None of these stop acquisition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectedLine {
    #[error("empty line")]
    Empty,
    #[error("line is not valid UTF-8")]
    NotUtf8,
    #[error("not a number: {0:?}")]
    NotNumeric(String),
    #[error("non-finite value: {0:?}")]
    NonFinite(String),
}

impl RejectedLine {
    /// Empty lines are routine when the device is idle and are not worth reporting.
    pub fn is_silent(&self) -> bool {
        matches!(self, RejectedLine::Empty)
    }
}

pub fn parse(raw_line: &[u8]) -> Result<Sample, RejectedLine> {
    parse_at(raw_line, Local::now().time())
}

pub fn parse_at(raw_line: &[u8], now: NaiveTime) -> Result<Sample, RejectedLine> {
    let text = std::str::from_utf8(raw_line).map_err(|_| RejectedLine::NotUtf8)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(RejectedLine::Empty);
    }

    let value: f64 = text
        .parse()
        .map_err(|_| RejectedLine::NotNumeric(text.to_string()))?;
    if !value.is_finite() {
        return Err(RejectedLine::NonFinite(text.to_string()));
    }

    Ok(Sample::new(now, value))
}

fn truncate_to_millis(t: NaiveTime) -> NaiveTime {
    let millis = t.nanosecond() / 1_000_000;
    t.with_nanosecond(millis * 1_000_000).unwrap_or(t)
}
