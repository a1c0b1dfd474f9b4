use std::{
    io,
    time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::acquire::{Acquisition, LineStats, Tick};
use crate::chart::ChartView;
use crate::error::AcquireError;
use crate::sample::Sample;
use crate::sink::RecordSink;
use crate::source::ByteSource;

/// What happened when the collaborators were closed at shutdown.
pub struct Released {
    pub rows: io::Result<u64>,
    pub stats: LineStats,
}

// Main application state
pub struct App<S, K> {
    acquisition: Acquisition<S, K>,
    pub view: Option<ChartView>,
    pub source_name: String,
    pub tick_rate: Duration,
    pub last_tick: Instant,
    dirty: bool,
}

impl<S: ByteSource, K: RecordSink> App<S, K> {
    pub fn new(acquisition: Acquisition<S, K>, source_name: &str, tick_rate: Duration) -> Self {
        Self {
            acquisition,
            view: None,
            source_name: source_name.to_string(),
            tick_rate,
            last_tick: Instant::now(),
            // first frame shows the waiting placeholder
            dirty: true,
        }
    }

    pub fn on_tick(&mut self) -> Result<Tick, AcquireError> {
        let tick = self.acquisition.poll()?;
        if tick.rejected > 0 {
            debug!(rejected = tick.rejected, accepted = tick.accepted, "lines dropped this tick");
        }
        if tick.accepted > 0 {
            let history = self.acquisition.history();
            self.view = if history.is_empty() {
                None
            } else {
                ChartView::from_samples(&history.snapshot())
            };
            self.dirty = true;
        }
        Ok(tick)
    }

    /// Returns whether a redraw is due and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The newest `n` samples still in the window, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &Sample> {
        let history = self.acquisition.history();
        history.iter().skip(history.len().saturating_sub(n))
    }

    pub fn stats(&self) -> LineStats {
        self.acquisition.stats()
    }

    pub fn points(&self) -> (usize, usize) {
        let history = self.acquisition.history();
        (history.len(), history.capacity())
    }

    /// Closes the record sink, then the source. The source is released even
    /// when the sink fails to flush.
    pub fn release(self) -> Released {
        let (source, sink, stats) = self.acquisition.into_parts();

        let rows = sink.close();
        if let Err(e) = &rows {
            warn!(error = %e, "record file did not close cleanly");
        }
        source.close();

        Released { rows, stats }
    }
}
