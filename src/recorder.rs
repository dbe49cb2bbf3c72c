//! Phase timing for build and search.
//!
//! An explicit context object rather than process-global state: construct
//! one per evaluation run and pass it by reference into the phases it
//! should measure.

use std::time::{Duration, Instant};

/// Measures elapsed wall time around build and search phases.
///
/// `start` marks the phase beginning; `elapsed` reads the time since the
/// last mark without consuming it, so a phase can be sampled more than
/// once. Total accumulated time across all sampled phases is available via
/// [`Recorder::total`].
#[derive(Debug, Default)]
pub struct Recorder {
    mark: Option<Instant>,
    total: Duration,
}

impl Recorder {
    /// Create a recorder with no running phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the beginning of a phase.
    pub fn start(&mut self) {
        self.mark = Some(Instant::now());
    }

    /// Time since the last `start`, also added to the running total.
    ///
    /// Returns zero if no phase was started.
    pub fn elapsed(&mut self) -> Duration {
        match self.mark.take() {
            Some(mark) => {
                let elapsed = mark.elapsed();
                self.total += elapsed;
                elapsed
            }
            None => Duration::ZERO,
        }
    }

    /// Accumulated time across all completed phases.
    pub fn total(&self) -> Duration {
        self.total
    }
}
