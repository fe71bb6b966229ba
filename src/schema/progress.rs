//! Progress, history and result types reported by a search run.

use serde::{Deserialize, Serialize};

use crate::compute::{CacheStats, Goal};

/// Progress update emitted once per generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProgress {
    /// Current generation number.
    pub generation: usize,
    /// Generation budget.
    pub max_generations: usize,
    /// Goals registered for the run.
    pub total_goals: usize,
    /// Goals still short of `k` witnesses.
    pub remaining_goals: usize,
    /// Witnesses held by the archive.
    pub archive_size: usize,
    /// Smallest witness count over all goals.
    pub min_coverage: usize,
    /// Current population size.
    pub population_size: usize,
    /// Real executions so far.
    pub executions: u64,
    /// Cache counters.
    pub cache: CacheStats,
    /// Per-generation history.
    pub history: SearchHistory,
    /// Current state of the loop.
    pub phase: SearchPhase,
}

/// Per-generation statistics for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchHistory {
    /// Remaining goals after each generation.
    pub remaining_goals: Vec<usize>,
    /// Archive size after each generation.
    pub archive_size: Vec<usize>,
    /// Cache entries after each generation.
    pub cache_entries: Vec<usize>,
    /// Witnesses accepted during each generation.
    pub accepted: Vec<usize>,
}

/// State of the evolution loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SearchPhase {
    /// No population yet.
    #[default]
    Uninitialized,
    /// Population evaluated against the remaining goals.
    Evaluating,
    /// Offspring being bred.
    Evolving,
    /// Loop finished.
    Terminated,
}

/// Coverage of one goal at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalCoverage {
    pub goal: Goal,
    /// Accepted witnesses.
    pub witnesses: usize,
    /// Multicover target.
    pub target: usize,
    pub covered: bool,
}

/// Final result of a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult<T> {
    /// Deduplicated tests of every accepted witness.
    pub suite: Vec<T>,
    /// Per-goal coverage.
    pub coverage: Vec<GoalCoverage>,
    /// Statistics from the run.
    pub stats: SearchStats,
    /// Full history for analysis.
    pub history: SearchHistory,
}

impl<T> SearchResult<T> {
    /// Goals that reached the multicover target.
    pub fn covered_goals(&self) -> usize {
        self.coverage.iter().filter(|c| c.covered).count()
    }

    /// Check if every goal reached the multicover target.
    pub fn is_complete(&self) -> bool {
        self.coverage.iter().all(|c| c.covered)
    }
}

/// Statistics from a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    /// Generations run.
    pub generations: usize,
    /// Real executions performed.
    pub executions: u64,
    /// Cache counters.
    pub cache: CacheStats,
    /// Witnesses held by the archive.
    pub archive_size: usize,
    /// Smallest witness count over all goals.
    pub min_coverage: usize,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason the search stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Every goal holds `k` witnesses.
    AllGoalsCovered,
    /// Generation budget exhausted.
    MaxGenerations,
    /// Wall-clock budget exhausted.
    Deadline,
    /// Cancelled through the cancel handle.
    Cancelled,
}
