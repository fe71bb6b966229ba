//! Compute module - Multicover search over coverage goals.
//!
//! # Overview
//!
//! - **Observations** (`observation`): vectors captured when a goal is hit
//! - **Candidates** (`chromosome`): tests and suites under evolution
//! - **Execution** (`execution`, `cache`): cached evaluation against goals
//! - **Archive** (`archive`): up to `k` distinct witnesses per goal
//! - **Selection** (`diversity`, `ranking`): witness choice and survivor ranking
//! - **Search** (`search`): the generational loop
//!
//! # Example
//!
//! ```rust,no_run
//! use multicover::compute::MulticoverEngine;
//! use multicover::schema::SearchConfig;
//! use multicover::subject::{InputFactory, SubjectExecutor, less_than};
//!
//! let subject = less_than();
//! let factory = InputFactory::for_subject(&subject);
//! let goals = subject.goals();
//!
//! let mut engine =
//!     MulticoverEngine::new(SearchConfig::default(), factory, SubjectExecutor::new(subject), goals)
//!         .unwrap();
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: {} goals remaining",
//!         progress.generation, progress.remaining_goals);
//! });
//!
//! println!("Suite size: {}", result.suite.len());
//! ```

mod archive;
mod cache;
mod chromosome;
mod diversity;
mod execution;
mod goal;
mod observation;
mod ranking;
mod rng;
mod search;

pub use archive::{
    Admission, ArchiveExport, ArchiveIoError, GoalExport, MulticoverArchive, Rejection, Witness,
    WitnessExport,
};
pub use cache::{CacheStats, ExecutionCache};
pub use chromosome::{Chromosome, ChromosomeFactory, ConstructionFailed, Fingerprint, TestCase};
pub use diversity::DiversitySelector;
pub use execution::{Evaluated, Evaluator, Execution, ExecutionError, Executor};
pub use goal::{Goal, GoalLocation};
pub use observation::ObservationVector;
pub use ranking::{ParetoRanker, Ranking, dominates};
pub use rng::SearchRng;
pub use search::MulticoverEngine;
