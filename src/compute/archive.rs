//! Multicover archive holding up to `k` distinct witnesses per goal.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::schema::GoalCoverage;

use super::chromosome::{Chromosome, Fingerprint, TestCase};
use super::goal::Goal;
use super::observation::ObservationVector;

/// Archive of accepted witnesses, keyed by goal.
///
/// For every goal the number of witnesses never exceeds the multicover
/// target and no two witnesses carry equal observation vectors.
#[derive(Debug, Clone)]
pub struct MulticoverArchive<T> {
    /// Multicover target `k`.
    target: usize,
    /// Accepted witnesses per registered goal, in acceptance order.
    entries: BTreeMap<Goal, Vec<Witness<T>>>,
}

/// A chromosome accepted as satisfying a goal.
#[derive(Debug, Clone)]
pub struct Witness<T> {
    /// The accepted chromosome.
    pub chromosome: Chromosome<T>,
    /// Its structural fingerprint.
    pub fingerprint: Fingerprint,
    /// The observation backing this witness.
    pub observation: ObservationVector,
    /// Generation of acceptance.
    pub generation: usize,
}

/// Result of offering a witness to the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Stored. `covered` is set when this acceptance brought the goal to `k`.
    Accepted { covered: bool },
    Rejected(Rejection),
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted { .. })
    }
}

/// Why a witness was not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// An equal observation vector is already accepted for the goal.
    Duplicate,
    /// The goal already holds `k` witnesses.
    Full,
}

impl<T: TestCase> MulticoverArchive<T> {
    /// Create an archive with multicover target `k`.
    pub fn new(target: usize) -> Self {
        assert!(target > 0, "multicover target must be at least 1");
        Self {
            target,
            entries: BTreeMap::new(),
        }
    }

    /// Multicover target `k`.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Register a goal. Returns `false` if it was already registered, in
    /// which case its witnesses are untouched.
    pub fn register_goal(&mut self, goal: Goal) -> bool {
        if self.entries.contains_key(&goal) {
            return false;
        }
        self.entries.insert(goal, Vec::new());
        true
    }

    /// Registered goals.
    pub fn goals(&self) -> impl Iterator<Item = &Goal> {
        self.entries.keys()
    }

    /// Offer a witness for `goal`.
    ///
    /// A missing observation is recorded as the empty vector. Redundancy is
    /// checked before capacity, so a repeated observation on a full goal is
    /// reported as a duplicate. Unregistered goals are registered first.
    pub fn try_accept(
        &mut self,
        goal: &Goal,
        chromosome: Chromosome<T>,
        observation: Option<ObservationVector>,
        generation: usize,
    ) -> Admission {
        let observation = observation.unwrap_or_default();
        let target = self.target;
        let witnesses = self.entries.entry(goal.clone()).or_default();

        if witnesses.iter().any(|w| w.observation == observation) {
            log::debug!("{}: duplicate observation {}", goal.id(), observation);
            return Admission::Rejected(Rejection::Duplicate);
        }

        if witnesses.len() >= target {
            return Admission::Rejected(Rejection::Full);
        }

        log::debug!("{}: accepted witness {}", goal.id(), observation);
        witnesses.push(Witness {
            fingerprint: chromosome.fingerprint(),
            chromosome,
            observation,
            generation,
        });

        let covered = witnesses.len() == target;
        if covered {
            log::info!("goal {} covered {} times", goal, target);
        }
        Admission::Accepted { covered }
    }

    /// Witnesses accepted for `goal`, in acceptance order.
    pub fn witnesses(&self, goal: &Goal) -> &[Witness<T>] {
        self.entries.get(goal).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of witnesses accepted for `goal`.
    pub fn witness_count(&self, goal: &Goal) -> usize {
        self.witnesses(goal).len()
    }

    /// Check if `goal` holds `k` witnesses.
    pub fn is_covered(&self, goal: &Goal) -> bool {
        self.witness_count(goal) >= self.target
    }

    /// Registered goals still short of `k` witnesses.
    pub fn remaining_goals(&self) -> BTreeSet<Goal> {
        self.entries
            .iter()
            .filter(|(_, w)| w.len() < self.target)
            .map(|(g, _)| g.clone())
            .collect()
    }

    /// Registered goals holding `k` witnesses.
    pub fn covered_goals(&self) -> BTreeSet<Goal> {
        self.entries
            .iter()
            .filter(|(_, w)| w.len() >= self.target)
            .map(|(g, _)| g.clone())
            .collect()
    }

    /// Check if every registered goal is covered.
    pub fn is_full(&self) -> bool {
        self.entries.values().all(|w| w.len() >= self.target)
    }

    /// Smallest witness count over registered goals (0 without goals).
    pub fn min_coverage(&self) -> usize {
        self.entries.values().map(Vec::len).min().unwrap_or(0)
    }

    /// Number of witness slots, across all goals, occupied by a structure.
    pub fn appearance_count(&self, fingerprint: &Fingerprint) -> usize {
        self.entries
            .values()
            .flatten()
            .filter(|w| &w.fingerprint == fingerprint)
            .count()
    }

    /// Total number of witnesses.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Check if no witness has been accepted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The final test suite: every witness's tests, each structure once.
    ///
    /// Order follows goals, then acceptance order within a goal.
    pub fn materialize_suite(&self) -> Vec<T> {
        let mut seen = HashSet::new();
        let mut suite = Vec::new();

        for witness in self.entries.values().flatten() {
            for test in witness.chromosome.tests() {
                if seen.insert(Fingerprint::of(test)) {
                    suite.push(test.clone());
                }
            }
        }

        suite
    }

    /// Per-goal coverage summary.
    pub fn coverage_report(&self) -> Vec<GoalCoverage> {
        self.entries
            .iter()
            .map(|(goal, witnesses)| GoalCoverage {
                goal: goal.clone(),
                witnesses: witnesses.len(),
                target: self.target,
                covered: witnesses.len() >= self.target,
            })
            .collect()
    }

    /// Serializable dump of all goals and their witnesses.
    pub fn export(&self) -> ArchiveExport {
        ArchiveExport {
            target: self.target,
            goals: self
                .entries
                .iter()
                .map(|(goal, witnesses)| GoalExport {
                    goal: goal.clone(),
                    covered: witnesses.len() >= self.target,
                    witnesses: witnesses
                        .iter()
                        .map(|w| WitnessExport {
                            code: w.chromosome.tests().iter().map(TestCase::to_code).collect(),
                            observation: w.observation.clone(),
                            generation: w.generation,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Write the export as pretty JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ArchiveIoError> {
        let json = serde_json::to_string_pretty(&self.export())?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Exported archive format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveExport {
    /// Multicover target.
    pub target: usize,
    /// Goals with their witnesses.
    pub goals: Vec<GoalExport>,
}

/// One goal in an archive export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalExport {
    pub goal: Goal,
    pub covered: bool,
    pub witnesses: Vec<WitnessExport>,
}

/// One witness in an archive export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessExport {
    /// Code of every test in the witness.
    pub code: Vec<String>,
    pub observation: ObservationVector,
    pub generation: usize,
}

impl ArchiveExport {
    /// Load an export written by [`MulticoverArchive::save_json`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveIoError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Archive export errors.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveIoError {
    #[error("Archive I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Archive serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
