//! Progress reporting hooks for the coordinator

use crate::search::parallel::channel::ProgressEvent;
use crate::search::record::DiffPairProb;
use crate::search::result::SearchStatistics;
use std::io::{self, Stdout, Write};
use tracing::{debug, info, warn};

/// Receives progress from the coordinator thread.
///
/// All callbacks run on the coordinator, never on worker threads.
pub trait ProgressReporter {
    /// A worker finished one starting difference
    fn on_progress(&mut self, event: &ProgressEvent);

    /// A new overall best characteristic was found
    fn on_global_best(&mut self, _best: &DiffPairProb) {}

    /// A worker ran out of work or was stopped
    fn on_worker_finished(
        &mut self,
        _worker_id: usize,
        _best: Option<&DiffPairProb>,
        _statistics: &SearchStatistics,
    ) {
    }
}

/// Reporter that discards everything
#[derive(Debug, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn on_progress(&mut self, _event: &ProgressEvent) {}
}

/// One progress line: iteration, start, best ending, worker best and time
pub fn format_progress(event: &ProgressEvent) -> String {
    let ending = event
        .ending
        .map(|e| format!("b = {:#06x}, p = {:.8}", e.difference, e.probability))
        .unwrap_or_else(|| "no ending".to_string());
    let worker_best = event
        .worker_best
        .map(|b| b.to_string())
        .unwrap_or_else(|| "none".to_string());
    format!(
        "i = {}, a = {:#06x}, {}, worker best = ({}), time = {}ms",
        event.iteration,
        event.start,
        ending,
        worker_best,
        event.elapsed.as_millis()
    )
}

/// Reporter that prints one line per searched starting difference
#[derive(Debug)]
pub struct ConsoleReporter<W: Write = Stdout> {
    out: W,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(line).and_then(|()| self.out.flush()) {
            warn!("failed to write progress: {}", e);
        }
    }
}

impl<W: Write> ProgressReporter for ConsoleReporter<W> {
    fn on_progress(&mut self, event: &ProgressEvent) {
        let line = format_progress(event);
        self.emit(format_args!("[worker {}] {}\n", event.worker_id, line));
    }

    fn on_global_best(&mut self, best: &DiffPairProb) {
        self.emit(format_args!("new best: {}\n", best));
    }
}

/// Reporter that emits `tracing` events
#[derive(Debug, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn on_progress(&mut self, event: &ProgressEvent) {
        debug!(worker = event.worker_id, "{}", format_progress(event));
    }

    fn on_global_best(&mut self, best: &DiffPairProb) {
        info!("new best characteristic: {}", best);
    }

    fn on_worker_finished(
        &mut self,
        worker_id: usize,
        best: Option<&DiffPairProb>,
        statistics: &SearchStatistics,
    ) {
        match best {
            Some(best) => info!(
                worker = worker_id,
                searches = statistics.searches,
                "worker finished with ({})",
                best
            ),
            None => info!(
                worker = worker_id,
                searches = statistics.searches,
                "worker finished without a characteristic"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::record::DiffProb;
    use std::time::Duration;

    fn event(iteration: u64, start: usize, ending: Option<DiffProb>) -> ProgressEvent {
        ProgressEvent {
            worker_id: 1,
            iteration,
            start,
            ending,
            worker_best: ending.map(|e| DiffPairProb::from_ending(start, e)),
            elapsed: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_format_progress() {
        let line = format_progress(&event(2, 0x0B00, Some(DiffProb::new(0x0040, 0.5))));
        assert_eq!(
            line,
            "i = 2, a = 0x0b00, b = 0x0040, p = 0.50000000, \
             worker best = (a = 0x0b00, b = 0x0040, p = 0.50000000), time = 3ms"
        );

        let line = format_progress(&event(1, 0x0003, None));
        assert_eq!(
            line,
            "i = 1, a = 0x0003, no ending, worker best = (none), time = 3ms"
        );
    }

    #[test]
    fn test_console_reporter_prints_a_line_per_event() {
        let mut reporter = ConsoleReporter::new(Vec::new());
        for start in 1..4 {
            reporter.on_progress(&event(start as u64, start, None));
        }
        reporter.on_global_best(&DiffPairProb::new(3, 3, 1.0));

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("[worker 1] i = 1, a = 0x0001"));
        assert_eq!(lines[3], "new best: a = 0x0003, b = 0x0003, p = 1.00000000");
    }

    #[test]
    fn test_tracing_reporter_without_subscriber() {
        let mut reporter = TracingReporter;
        reporter.on_progress(&event(1, 2, Some(DiffProb::new(1, 0.25))));
        reporter.on_global_best(&DiffPairProb::new(2, 1, 0.25));
        reporter.on_worker_finished(1, None, &SearchStatistics::default());
    }
}
