//! Multicover - Diversity-aware k-cover search for test generation.
//!
//! This crate evolves a population of tests so that every coverage goal is
//! witnessed by `k` tests with pairwise distinct observations, not merely
//! one. Covering tests are chosen for the archive by the diversity of the
//! values they capture; the others are ranked by Pareto dominance over the
//! goals still open.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Configuration, progress and result types
//! - `compute`: Archive, cache, selection, ranking and the search loop
//! - `subject`: Instrumented benchmark programs and their executor
//!
//! # Example
//!
//! ```rust,no_run
//! use multicover::{
//!     compute::MulticoverEngine,
//!     schema::SearchConfig,
//!     subject::{InputFactory, SubjectExecutor, triangle},
//! };
//!
//! let subject = triangle();
//! let goals = subject.goals();
//! let factory = InputFactory::for_subject(&subject);
//!
//! let mut config = SearchConfig::default();
//! config.multicover_target = 3;
//!
//! let mut engine =
//!     MulticoverEngine::new(config, factory, SubjectExecutor::new(subject), goals).unwrap();
//! let result = engine.run();
//!
//! println!("{} of {} goals covered", result.covered_goals(), result.coverage.len());
//! ```

pub mod compute;
pub mod schema;
pub mod subject;

// Re-export commonly used types
pub use compute::{Chromosome, Goal, MulticoverArchive, MulticoverEngine, ObservationVector};
pub use schema::{SearchConfig, SearchResult, StopReason};
