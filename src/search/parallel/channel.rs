//! Message channel and shared state between workers and the coordinator.

use crate::search::record::{DiffPairProb, DiffProb};
use crate::search::result::SearchStatistics;
use crate::table::Difference;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// One completed search, as seen by a worker
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub worker_id: usize,
    /// 1-based count of searches this worker has run
    pub iteration: u64,
    /// Starting difference that was searched
    pub start: Difference,
    /// Best non-zero ending for `start` (None if nothing was reachable)
    pub ending: Option<DiffProb>,
    /// Best characteristic this worker has found so far
    pub worker_best: Option<DiffPairProb>,
    /// Time spent in this search
    pub elapsed: Duration,
}

/// Message sent from workers to the coordinator.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// Worker finished searching one starting difference.
    Progress(ProgressEvent),
    /// Worker found a characteristic that beats every one reported so far.
    Improvement { worker_id: usize, best: DiffPairProb },
    /// Worker has no more work.
    Finished {
        worker_id: usize,
        best: Option<DiffPairProb>,
        statistics: SearchStatistics,
    },
}

/// Shared state for tracking the best probability across all workers.
#[derive(Debug)]
pub struct SharedBest {
    /// Best probability so far, stored as `f64` bits. Probabilities are
    /// non-negative, so their bit patterns order the same way as the values.
    pub best_bits: AtomicU64,
    /// Flag to signal all workers to stop.
    pub should_stop: AtomicBool,
}

impl Default for SharedBest {
    fn default() -> Self {
        Self {
            best_bits: AtomicU64::new(0.0f64.to_bits()),
            should_stop: AtomicBool::new(false),
        }
    }
}

impl SharedBest {
    /// Try to raise the best probability. Returns true if this is a new best.
    pub fn try_update(&self, probability: f64) -> bool {
        let mut current = self.best_bits.load(Ordering::SeqCst);
        loop {
            if probability <= f64::from_bits(current) {
                return false;
            }
            match self.best_bits.compare_exchange_weak(
                current,
                probability.to_bits(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(c) => current = c,
            }
        }
    }

    /// Check if we should stop searching.
    pub fn should_stop(&self) -> bool {
        self.should_stop.load(Ordering::SeqCst)
    }

    /// Signal all workers to stop.
    pub fn signal_stop(&self) {
        self.should_stop.store(true, Ordering::SeqCst);
    }

    /// Get the current best probability (0.0 if none found).
    pub fn current_best(&self) -> f64 {
        f64::from_bits(self.best_bits.load(Ordering::SeqCst))
    }
}

/// Channel endpoints for a worker.
pub struct WorkerChannels {
    /// Send messages to coordinator.
    pub to_coordinator: Sender<WorkerMessage>,
    /// Shared state for fast best checking and stop requests.
    pub shared: Arc<SharedBest>,
}

/// Channel endpoints for the coordinator.
pub struct CoordinatorChannels {
    /// Receive messages from workers.
    pub from_workers: Receiver<WorkerMessage>,
    /// Shared state.
    pub shared: Arc<SharedBest>,
}

/// Create channels for parallel search with the given number of workers.
pub fn create_channels(num_workers: usize) -> (CoordinatorChannels, Vec<WorkerChannels>) {
    let shared = Arc::new(SharedBest::default());

    // Unbounded channel from workers to coordinator (workers shouldn't block)
    let (worker_tx, coordinator_rx) = unbounded();

    let worker_channels = (0..num_workers)
        .map(|_| WorkerChannels {
            to_coordinator: worker_tx.clone(),
            shared: Arc::clone(&shared),
        })
        .collect();

    let coordinator = CoordinatorChannels {
        from_workers: coordinator_rx,
        shared,
    };

    (coordinator, worker_channels)
}
