//! Parallel search execution over all starting differences.
//!
//! # Architecture
//!
//! The parallel search system consists of:
//! - A **distributor** that hands out each starting difference exactly once
//! - Multiple **workers**, each owning a branch-and-bound engine over the
//!   shared read-only table and tracking its own best characteristic
//! - A **coordinator** that joins the workers, enforces the timeout and
//!   aggregates results
//! - A **channel system** for communication between workers and coordinator
//! - **Shared state** for the stop flag and lock-free best tracking
//!
//! # Example
//!
//! ```ignore
//! use diffsearch::search::parallel::{ConsoleReporter, ParallelConfig, run_parallel_search};
//!
//! let config = ParallelConfig::default()
//!     .with_workers(4)
//!     .with_timeout(Duration::from_secs(600));
//!
//! let result = run_parallel_search(table, &search_config, &config, &mut ConsoleReporter::stdout())?;
//! ```

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod distributor;
pub mod report;

pub use channel::ProgressEvent;
pub use config::ParallelConfig;
pub use coordinator::{ParallelResult, WorkerSummary, run_parallel_search};
pub use distributor::{Claim, DifferenceQueue};
pub use report::{ConsoleReporter, NullReporter, ProgressReporter, TracingReporter};
