use std::sync::LazyLock;

use regex::Regex;
use sfmrun_core::{
    process::{OutputObserver, OutputStream},
    progress::ProgressSink,
};
use tracing::debug;

static INITIAL_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Initializing with image pair #(\d+) and #(\d+)").unwrap());
static NEXT_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Registering image #(\d+) \((\d+)\)").unwrap());
static ATTEMPT_FAILED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=> (Could not register|Initialization failed)").unwrap());

/// Turns the mapper's log into registered-image progress.
///
/// The initial pair counts as two images, every later registration as one.
/// COLMAP logs an attempt before it knows the outcome, so each attempt stays
/// pending until the next one starts or [`MapperProgress::finish`] is called,
/// and is dropped if a failure line follows it.
pub struct MapperProgress<'a> {
    sink: &'a mut dyn ProgressSink,
    registered: u64,
    pending: Option<u64>,
}

impl<'a> MapperProgress<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            sink,
            registered: 0,
            pending: None,
        }
    }

    /// Images confirmed so far, not counting a pending attempt.
    pub fn registered(&self) -> u64 {
        self.registered
    }

    /// Confirms the last attempt once the mapper exited successfully.
    pub fn finish(&mut self) -> u64 {
        self.commit();
        self.registered
    }

    fn attempt(&mut self, units: u64) {
        self.commit();
        self.pending = Some(units);
    }

    fn commit(&mut self) {
        if let Some(units) = self.pending.take() {
            self.registered += units;
            self.sink.on_progress(units);
        }
    }
}

impl OutputObserver for MapperProgress<'_> {
    // glog writes to stderr, but older builds log to stdout, so both are scanned
    fn on_line(&mut self, _stream: OutputStream, line: &str) {
        if let Some(captures) = INITIAL_PAIR.captures(line) {
            debug!(first = &captures[1], second = &captures[2], "initial image pair");
            self.attempt(2);
        } else if let Some(captures) = NEXT_IMAGE.captures(line) {
            debug!(image = &captures[1], "registering image");
            self.attempt(1);
        } else if ATTEMPT_FAILED.is_match(line) {
            debug!(pending = ?self.pending, "attempt failed");
            self.pending = None;
        }
    }
}
