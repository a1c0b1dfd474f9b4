use std::io;

use tracing::{debug, trace, warn};

use crate::constants::MAX_LINES_PER_TICK;
use crate::error::AcquireError;
use crate::history::History;
use crate::sample::{self, Sample};
use crate::sink::RecordSink;
use crate::source::ByteSource;

/// Running totals of line outcomes for this run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LineStats {
    pub accepted: u64,
    pub empty: u64,
    pub malformed: u64,
    pub unexpected: u64,
}

impl LineStats {
    pub fn dropped(&self) -> u64 {
        self.malformed + self.unexpected
    }
}

/// What a single `poll` did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub accepted: usize,
    pub rejected: usize,
}

/// Drains the source into the record sink and the history window.
/// Owns all three; nothing else mutates them.
pub struct Acquisition<S, K> {
    source: S,
    sink: K,
    history: History,
    stats: LineStats,
    line_budget: usize,
}

impl<S: ByteSource, K: RecordSink> Acquisition<S, K> {
    pub fn new(source: S, sink: K, capacity: usize) -> Self {
        Self {
            source,
            sink,
            history: History::new(capacity),
            stats: LineStats::default(),
            line_budget: MAX_LINES_PER_TICK,
        }
    }

    pub fn with_line_budget(mut self, budget: usize) -> Self {
        self.line_budget = budget.max(1);
        self
    }

    /// Reads whatever is pending, up to the line budget, and returns without
    /// waiting for more. Only source or sink I/O failures are returned as errors.
    pub fn poll(&mut self) -> Result<Tick, AcquireError> {
        let mut tick = Tick::default();

        for _ in 0..self.line_budget {
            if !self.source.bytes_available().map_err(AcquireError::Source)? {
                break;
            }

            let raw = match self.source.read_line() {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) if is_line_fault(&e) => {
                    self.stats.unexpected += 1;
                    tick.rejected += 1;
                    warn!(error = %e, "unexpected error reading line, skipped");
                    continue;
                }
                Err(e) => return Err(AcquireError::Source(e)),
            };

            match sample::parse(&raw) {
                Ok(sample) => {
                    self.record(sample)?;
                    tick.accepted += 1;
                }
                Err(reason) if reason.is_silent() => {
                    self.stats.empty += 1;
                    trace!("empty line");
                }
                Err(reason) => {
                    self.stats.malformed += 1;
                    tick.rejected += 1;
                    debug!(%reason, "malformed line dropped");
                }
            }
        }

        if tick.accepted > 0 {
            self.sink.flush().map_err(AcquireError::Sink)?;
        }
        Ok(tick)
    }

    fn record(&mut self, sample: Sample) -> Result<(), AcquireError> {
        self.sink.append(&sample).map_err(AcquireError::Sink)?;
        self.history.append(sample);
        self.stats.accepted += 1;
        Ok(())
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn stats(&self) -> LineStats {
        self.stats
    }

    /// Hands the collaborators back so each can be closed on its own.
    pub fn into_parts(self) -> (S, K, LineStats) {
        (self.source, self.sink, self.stats)
    }
}

// Failures confined to one line; anything else means the port itself is gone
fn is_line_fault(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::InvalidData | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
pub mod testing {
    use std::{cell::Cell, collections::VecDeque, io, rc::Rc};

    use crate::sample::Sample;
    use crate::sink::RecordSink;
    use crate::source::ByteSource;

    /// Replays a fixed sequence of read results.
    #[derive(Default)]
    pub struct ScriptedSource {
        pub script: VecDeque<io::Result<Option<Vec<u8>>>>,
        pub fail_available: Option<io::ErrorKind>,
        pub reads: usize,
        pub closed: Rc<Cell<bool>>,
    }

    impl ScriptedSource {
        pub fn lines(lines: &[&str]) -> Self {
            Self {
                script: lines
                    .iter()
                    .map(|l| Ok(Some(l.as_bytes().to_vec())))
                    .collect(),
                ..Self::default()
            }
        }

        pub fn push(&mut self, result: io::Result<Option<Vec<u8>>>) {
            self.script.push_back(result);
        }
    }

    impl ByteSource for ScriptedSource {
        fn bytes_available(&mut self) -> io::Result<bool> {
            if let Some(kind) = self.fail_available {
                return Err(io::Error::new(kind, "device unplugged"));
            }
            Ok(!self.script.is_empty())
        }

        fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
            self.reads += 1;
            self.script.pop_front().unwrap_or(Ok(None))
        }

        fn close(self) {
            self.closed.set(true);
        }
    }

    #[derive(Default)]
    pub struct MemorySink {
        pub rows: Vec<Sample>,
        pub flushes: usize,
        pub fail: bool,
    }

    impl RecordSink for MemorySink {
        fn append(&mut self, sample: &Sample) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.rows.push(*sample);
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.flushes += 1;
            Ok(())
        }

        fn close(mut self) -> io::Result<u64> {
            self.flush()?;
            Ok(self.rows.len() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{MemorySink, ScriptedSource};
    use super::*;

    fn acquisition(source: ScriptedSource, capacity: usize) -> Acquisition<ScriptedSource, MemorySink> {
        Acquisition::new(source, MemorySink::default(), capacity)
    }

    fn history_values<S: ByteSource, K: RecordSink>(acq: &Acquisition<S, K>) -> Vec<f64> {
        acq.history().iter().map(|s| s.value).collect()
    }

    #[test]
    fn idle_source_does_nothing() {
        let mut acq = acquisition(ScriptedSource::default(), 10);
        let tick = acq.poll().unwrap();

        assert_eq!(tick, Tick::default());
        assert!(acq.history().is_empty());
        let (source, sink, stats) = acq.into_parts();
        assert_eq!(source.reads, 0);
        assert!(sink.rows.is_empty());
        assert_eq!(stats, LineStats::default());
    }

    #[test]
    fn accepted_samples_reach_sink_and_history() {
        let mut acq = acquisition(ScriptedSource::lines(&["1.0", "2.5\r", "-3"]), 10);
        let tick = acq.poll().unwrap();

        assert_eq!(tick.accepted, 3);
        assert_eq!(history_values(&acq), vec![1.0, 2.5, -3.0]);
        let (_, sink, stats) = acq.into_parts();
        let written: Vec<f64> = sink.rows.iter().map(|s| s.value).collect();
        assert_eq!(written, vec![1.0, 2.5, -3.0]);
        assert_eq!(stats.accepted, 3);
        // one flush at the end of the tick
        assert_eq!(sink.flushes, 1);
    }

    #[test]
    fn bad_lines_are_counted_and_skipped() {
        let mut source = ScriptedSource::lines(&["", "abc", "1.2.3", "7"]);
        source.push(Ok(Some(vec![0xff, 0x00])));
        source.push(Err(io::Error::new(io::ErrorKind::InvalidData, "line too long")));
        source.push(Err(io::Error::from(io::ErrorKind::Interrupted)));
        source.push(Ok(Some(b"8".to_vec())));

        let mut acq = acquisition(source, 10);
        let tick = acq.poll().unwrap();

        assert_eq!(tick.accepted, 2);
        assert_eq!(tick.rejected, 5);
        assert_eq!(history_values(&acq), vec![7.0, 8.0]);
        assert_eq!(
            acq.stats(),
            LineStats {
                accepted: 2,
                empty: 1,
                malformed: 3,
                unexpected: 2,
            }
        );
        assert_eq!(acq.stats().dropped(), 5);
    }

    #[test]
    fn only_rejections_means_no_flush() {
        let mut acq = acquisition(ScriptedSource::lines(&["", "x"]), 10);
        let tick = acq.poll().unwrap();
        assert_eq!(tick.accepted, 0);

        let (_, sink, _) = acq.into_parts();
        assert_eq!(sink.flushes, 0);
        assert!(sink.rows.is_empty());
    }

    #[test]
    fn history_is_bounded_but_sink_keeps_everything() {
        let mut acq = acquisition(ScriptedSource::lines(&["1", "2", "3", "4"]), 3);
        acq.poll().unwrap();

        assert_eq!(history_values(&acq), vec![2.0, 3.0, 4.0]);
        let (_, sink, _) = acq.into_parts();
        assert_eq!(sink.rows.len(), 4);
    }

    #[test]
    fn partial_reads_are_not_counted() {
        let mut source = ScriptedSource::default();
        source.push(Ok(None));
        source.push(Ok(Some(b"5".to_vec())));

        let mut acq = acquisition(source, 10);
        let tick = acq.poll().unwrap();
        assert_eq!(tick, Tick { accepted: 1, rejected: 0 });
    }

    #[test]
    fn line_budget_bounds_one_poll() {
        let lines: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut acq = acquisition(ScriptedSource::lines(&refs), 100).with_line_budget(4);

        assert_eq!(acq.poll().unwrap().accepted, 4);
        assert_eq!(acq.poll().unwrap().accepted, 4);
        assert_eq!(acq.poll().unwrap().accepted, 2);
        assert_eq!(acq.poll().unwrap().accepted, 0);
        assert_eq!(acq.history().len(), 10);
    }

    #[test]
    fn broken_source_is_fatal() {
        let source = ScriptedSource {
            fail_available: Some(io::ErrorKind::BrokenPipe),
            ..ScriptedSource::default()
        };
        let mut acq = acquisition(source, 10);
        assert!(matches!(acq.poll(), Err(AcquireError::Source(_))));
    }

    #[test]
    fn read_failure_other_than_line_fault_is_fatal() {
        let mut source = ScriptedSource::lines(&["1"]);
        source.push(Err(io::Error::from(io::ErrorKind::NotConnected)));
        let mut acq = acquisition(source, 10);
        assert!(matches!(acq.poll(), Err(AcquireError::Source(_))));
        // the sample before the failure was still kept
        assert_eq!(history_values(&acq), vec![1.0]);
    }

    #[test]
    fn sink_failure_is_fatal() {
        let sink = MemorySink {
            fail: true,
            ..MemorySink::default()
        };
        let mut acq = Acquisition::new(ScriptedSource::lines(&["1"]), sink, 10);
        assert!(matches!(acq.poll(), Err(AcquireError::Sink(_))));
        assert!(acq.history().is_empty());
    }
}
