//! Parallel search coordinator that manages worker threads.

use crate::error::Result;
use crate::search::branch_bound::BranchAndBound;
use crate::search::config::SearchConfig;
use crate::search::parallel::channel::{
    CoordinatorChannels, ProgressEvent, SharedBest, WorkerChannels, WorkerMessage,
    create_channels,
};
use crate::search::parallel::config::ParallelConfig;
use crate::search::parallel::distributor::{Claim, DifferenceQueue};
use crate::search::parallel::report::ProgressReporter;
use crate::search::record::{DiffPairProb, best_ending};
use crate::search::result::SearchStatistics;
use crate::search::DifferentialSearch;
use crate::table::RoundTable;
use crossbeam_channel::RecvTimeoutError;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Final state of one worker.
#[derive(Debug, Clone)]
pub struct WorkerSummary {
    pub worker_id: usize,
    /// Best characteristic this worker found
    pub best: Option<DiffPairProb>,
    pub statistics: SearchStatistics,
}

/// Result from parallel search execution.
#[derive(Debug)]
pub struct ParallelResult {
    /// The best characteristic found across all workers.
    pub best: Option<DiffPairProb>,
    /// Statistics aggregated from all workers.
    pub total_statistics: SearchStatistics,
    /// Per-worker results, ordered by worker id.
    pub workers: Vec<WorkerSummary>,
    /// False if the run was stopped before every difference was searched.
    pub completed: bool,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

/// Search every starting difference of `table` on a pool of worker threads.
///
/// Each worker owns a [`BranchAndBound`] engine over the shared table and
/// claims starting differences from a common [`DifferenceQueue`] until it is
/// exhausted or the timeout fires. The call returns after all workers have
/// been joined.
pub fn run_parallel_search(
    table: Arc<RoundTable>,
    search_config: &SearchConfig,
    parallel_config: &ParallelConfig,
    reporter: &mut dyn ProgressReporter,
) -> Result<ParallelResult> {
    search_config.validate()?;
    let (first, end) = parallel_config.resolve_range(table.blocks())?;

    let start_time = Instant::now();
    let num_workers = parallel_config.num_workers.max(1);
    let queue = Arc::new(DifferenceQueue::with_range(first, end));

    info!(
        workers = num_workers,
        rounds = search_config.rounds,
        pruning = %search_config.pruning,
        differences = queue.len(),
        "starting parallel search"
    );

    // Create communication channels
    let (coordinator_channels, worker_channels) = create_channels(num_workers);
    let search_config = Arc::new(search_config.clone());

    let worker_handles = spawn_workers(
        worker_channels,
        &coordinator_channels.shared,
        |worker_id, channels| {
            let table = Arc::clone(&table);
            let queue = Arc::clone(&queue);
            let search_config = Arc::clone(&search_config);

            std::thread::Builder::new()
                .name(format!("diff-worker-{}", worker_id))
                .spawn(move || run_worker(worker_id, &table, &queue, &search_config, channels))
        },
    )?;

    // Run coordinator loop
    let mut result = run_coordinator(
        coordinator_channels,
        num_workers,
        parallel_config.timeout,
        start_time,
        reporter,
    );

    // Wait for all workers to finish
    for handle in worker_handles {
        if handle.join().is_err() {
            error!("worker thread panicked");
            result.completed = false;
        }
    }

    result.completed = result.completed && queue.remaining() == 0;
    result.elapsed = start_time.elapsed();
    info!(
        completed = result.completed,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "parallel search finished"
    );
    Ok(result)
}

/// Start one thread per channel set. If any spawn fails, the workers already
/// running are told to stop and joined before the error is returned.
fn spawn_workers<T, F>(
    channels: Vec<T>,
    shared: &SharedBest,
    mut spawn: F,
) -> std::io::Result<Vec<JoinHandle<()>>>
where
    F: FnMut(usize, T) -> std::io::Result<JoinHandle<()>>,
{
    let mut handles = Vec::with_capacity(channels.len());
    for (worker_id, channels) in channels.into_iter().enumerate() {
        match spawn(worker_id, channels) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                error!(worker = worker_id, "failed to spawn worker: {}", e);
                shared.signal_stop();
                for handle in handles {
                    if handle.join().is_err() {
                        error!("worker thread panicked");
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(handles)
}

/// Coordinator loop that receives messages from workers and aggregates results.
fn run_coordinator(
    channels: CoordinatorChannels,
    total_workers: usize,
    timeout: Option<Duration>,
    start_time: Instant,
    reporter: &mut dyn ProgressReporter,
) -> ParallelResult {
    let mut best: Option<DiffPairProb> = None;
    let mut workers: Vec<WorkerSummary> = Vec::with_capacity(total_workers);
    let deadline = timeout.map(|t| start_time + t);

    while workers.len() < total_workers {
        if !channels.shared.should_stop() && deadline.is_some_and(|d| Instant::now() >= d) {
            warn!("timeout reached, stopping workers");
            channels.shared.signal_stop();
        }

        // Receive with timeout to allow periodic deadline checks
        match channels.from_workers.recv_timeout(Duration::from_millis(100)) {
            Ok(WorkerMessage::Progress(event)) => reporter.on_progress(&event),
            Ok(WorkerMessage::Improvement { best: candidate, .. }) => {
                let folded = DiffPairProb::fold_best(best, candidate);
                if best != Some(folded) {
                    best = Some(folded);
                    reporter.on_global_best(&folded);
                }
            }
            Ok(WorkerMessage::Finished {
                worker_id,
                best: worker_best,
                statistics,
            }) => {
                reporter.on_worker_finished(worker_id, worker_best.as_ref(), &statistics);
                workers.push(WorkerSummary {
                    worker_id,
                    best: worker_best,
                    statistics,
                });
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // All senders dropped, we're done
                break;
            }
        }
    }

    workers.sort_by_key(|w| w.worker_id);
    let mut total_statistics = SearchStatistics::default();
    for worker in &workers {
        total_statistics.policy = worker.statistics.policy;
        total_statistics.merge(&worker.statistics);
    }

    ParallelResult {
        best,
        completed: !channels.shared.should_stop() && total_statistics.interrupted == 0,
        total_statistics,
        workers,
        elapsed: start_time.elapsed(),
    }
}

/// Worker loop: claim, search, fold into the worker's best, report.
fn run_worker(
    worker_id: usize,
    table: &RoundTable,
    queue: &DifferenceQueue,
    config: &SearchConfig,
    channels: WorkerChannels,
) {
    let mut engine = BranchAndBound::with_pruning(table, config.pruning);
    let mut worker_best: Option<DiffPairProb> = None;
    let mut iteration = 0u64;

    loop {
        if channels.shared.should_stop() {
            break;
        }
        let start = match queue.try_claim() {
            Claim::Difference(start) => start,
            Claim::Done => break,
        };
        iteration += 1;

        let timer = Instant::now();
        let probabilities =
            match engine.search_with_stop(start, config.rounds, &channels.shared.should_stop) {
                Some(probabilities) => probabilities,
                None => break,
            };
        let elapsed = timer.elapsed();

        let ending = best_ending(&probabilities);
        if let Some(ending) = ending {
            let candidate = DiffPairProb::from_ending(start, ending);
            let folded = DiffPairProb::fold_best(worker_best, candidate);
            if worker_best != Some(folded) {
                worker_best = Some(folded);
                if channels.shared.try_update(folded.probability) {
                    let _ = channels.to_coordinator.send(WorkerMessage::Improvement {
                        worker_id,
                        best: folded,
                    });
                }
            }
        }

        let _ = channels
            .to_coordinator
            .send(WorkerMessage::Progress(ProgressEvent {
                worker_id,
                iteration,
                start,
                ending,
                worker_best,
                elapsed,
            }));
    }

    let _ = channels.to_coordinator.send(WorkerMessage::Finished {
        worker_id,
        best: worker_best,
        statistics: engine.statistics(),
    });
}
