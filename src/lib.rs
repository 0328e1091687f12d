//! Search for high-probability multi-round differential characteristics of
//! substitution-permutation network block ciphers.
//!
//! - [`table`]: sparse one-round difference propagation tables
//! - [`search`]: branch-and-bound engine, reference enumeration and the
//!   parallel worker pool
//! - [`oracle`]: external encryption oracle for empirical verification

pub mod error;
pub mod oracle;
pub mod search;
pub mod table;

pub use error::{DiffError, Result};
pub use search::{
    BranchAndBound, DiffPairProb, DiffProb, DifferentialSearch, PruningPolicy, SearchConfig,
};
pub use table::{Difference, RoundTable};
