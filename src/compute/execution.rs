//! Execution of candidates against goals.
//!
//! The [`Executor`] is the single point where a program under test runs.
//! [`Evaluator`] owns the executor together with the [`ExecutionCache`] and
//! is the only path through which the search obtains executions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::cache::ExecutionCache;
use super::chromosome::{Chromosome, Fingerprint, TestCase};
use super::goal::Goal;
use super::observation::ObservationVector;

/// Outcome of running one chromosome against one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Distance to the goal. Zero iff the goal is satisfied.
    pub fitness: f64,
    /// Captured values, present only when satisfied and the goal supports capture.
    pub observation: Option<ObservationVector>,
}

impl Execution {
    /// A satisfying execution.
    pub fn covered(observation: Option<ObservationVector>) -> Self {
        Self {
            fitness: 0.0,
            observation,
        }
    }

    /// A non-satisfying execution at the given distance.
    pub fn uncovered(fitness: f64) -> Self {
        debug_assert!(fitness > 0.0, "uncovered execution needs positive fitness");
        Self {
            fitness,
            observation: None,
        }
    }

    /// Stand-in for a candidate that could not be executed.
    pub fn failed() -> Self {
        Self {
            fitness: f64::MAX,
            observation: None,
        }
    }

    /// Check if the goal was satisfied.
    pub fn is_covered(&self) -> bool {
        self.fitness == 0.0
    }
}

/// Failure of the execution collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutionError {
    #[error("Candidate could not be executed: {0}")]
    Failed(String),
    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),
}

/// Runs chromosomes against goals.
pub trait Executor<T: TestCase>: Send + Sync {
    /// Execute `chromosome` and measure it against `goal`.
    fn execute(&self, chromosome: &Chromosome<T>, goal: &Goal)
    -> Result<Execution, ExecutionError>;
}

/// A cloned chromosome bound to the goal it was evaluated against.
///
/// The execution is only meaningful for that goal. Evaluating against
/// another goal goes through [`Evaluator::evaluate`], which produces a new
/// wrapper; there is no way to re-run a wrapper in place.
#[derive(Debug, Clone)]
pub struct Evaluated<T> {
    chromosome: Chromosome<T>,
    fingerprint: Fingerprint,
    goal: Goal,
    execution: Execution,
}

impl<T> Evaluated<T> {
    pub fn chromosome(&self) -> &Chromosome<T> {
        &self.chromosome
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Goal the execution belongs to.
    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    pub fn fitness(&self) -> f64 {
        self.execution.fitness
    }

    pub fn observation(&self) -> Option<&ObservationVector> {
        self.execution.observation.as_ref()
    }

    pub fn is_covered(&self) -> bool {
        self.execution.is_covered()
    }

    /// Check if the execution is valid for `goal`.
    pub fn evaluated_against(&self, goal: &Goal) -> bool {
        &self.goal == goal
    }

    /// Drop the execution and keep the chromosome.
    pub fn into_chromosome(self) -> Chromosome<T> {
        self.chromosome
    }

    /// Split into chromosome and its observation.
    pub fn into_parts(self) -> (Chromosome<T>, Option<ObservationVector>) {
        (self.chromosome, self.execution.observation)
    }
}

/// Cached front-end to an [`Executor`].
pub struct Evaluator<E> {
    executor: E,
    cache: ExecutionCache,
    executions: AtomicU64,
}

impl<E> Evaluator<E> {
    /// Create an evaluator with an empty cache.
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            cache: ExecutionCache::new(),
            executions: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &ExecutionCache {
        &self.cache
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Number of real executions performed so far.
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Evaluate one chromosome against one goal, consulting the cache first.
    pub fn evaluate<T>(&self, chromosome: &Chromosome<T>, goal: &Goal) -> Evaluated<T>
    where
        T: TestCase,
        E: Executor<T>,
    {
        let fingerprint = chromosome.fingerprint();
        let execution = match self.cache.lookup(&fingerprint, goal) {
            Some(hit) => hit,
            None => {
                let execution = self.run(chromosome, goal);
                self.cache
                    .insert(fingerprint.clone(), goal.clone(), execution.clone());
                execution
            }
        };

        Evaluated {
            chromosome: chromosome.clone(),
            fingerprint,
            goal: goal.clone(),
            execution,
        }
    }

    /// Evaluate every chromosome against every goal.
    ///
    /// Returns one row per goal, each holding a clone of every chromosome in
    /// input order.
    pub fn evaluate_batch<T>(
        &self,
        chromosomes: &[Chromosome<T>],
        goals: &[Goal],
    ) -> Vec<Vec<Evaluated<T>>>
    where
        T: TestCase,
        E: Executor<T>,
    {
        let fingerprints: Vec<Fingerprint> =
            chromosomes.iter().map(Chromosome::fingerprint).collect();
        let executions = self.resolve(chromosomes, &fingerprints, goals);

        goals
            .iter()
            .zip(executions)
            .map(|(goal, row)| {
                chromosomes
                    .iter()
                    .zip(&fingerprints)
                    .zip(row)
                    .map(|((chromosome, fingerprint), execution)| Evaluated {
                        chromosome: chromosome.clone(),
                        fingerprint: fingerprint.clone(),
                        goal: goal.clone(),
                        execution,
                    })
                    .collect()
            })
            .collect()
    }

    /// Fitness of every chromosome on every goal, one row per chromosome.
    pub fn fitness_matrix<T>(&self, chromosomes: &[Chromosome<T>], goals: &[Goal]) -> Vec<Vec<f64>>
    where
        T: TestCase,
        E: Executor<T>,
    {
        let fingerprints: Vec<Fingerprint> =
            chromosomes.iter().map(Chromosome::fingerprint).collect();
        let executions = self.resolve(chromosomes, &fingerprints, goals);

        let mut matrix = vec![Vec::with_capacity(goals.len()); chromosomes.len()];
        for row in executions {
            for (ci, execution) in row.into_iter().enumerate() {
                matrix[ci].push(execution.fitness);
            }
        }
        matrix
    }

    /// Executions for all (chromosome, goal) pairs, one row per goal.
    ///
    /// Structurally identical chromosomes are executed once per goal, and
    /// only pairs missing from the cache run at all.
    fn resolve<T>(
        &self,
        chromosomes: &[Chromosome<T>],
        fingerprints: &[Fingerprint],
        goals: &[Goal],
    ) -> Vec<Vec<Execution>>
    where
        T: TestCase,
        E: Executor<T>,
    {
        // Map every chromosome to the first chromosome sharing its structure.
        let mut first_seen: HashMap<&Fingerprint, usize> = HashMap::new();
        let mut unique = Vec::new();
        let slot_of: Vec<usize> = fingerprints
            .iter()
            .enumerate()
            .map(|(ci, fp)| {
                *first_seen.entry(fp).or_insert_with(|| {
                    unique.push(ci);
                    unique.len() - 1
                })
            })
            .collect();

        let mut known: HashMap<(usize, usize), Execution> = HashMap::new();
        let mut pending = Vec::new();
        for (gi, goal) in goals.iter().enumerate() {
            for (slot, &ci) in unique.iter().enumerate() {
                match self.cache.lookup(&fingerprints[ci], goal) {
                    Some(hit) => {
                        known.insert((slot, gi), hit);
                    }
                    None => pending.push((slot, gi)),
                }
            }
        }

        if !pending.is_empty() {
            log::debug!(
                "{} cache misses over {} structures and {} goals",
                pending.len(),
                unique.len(),
                goals.len()
            );
        }
        let executed = self.execute_pending(chromosomes, &unique, goals, &pending);

        // Single writer: the cache is filled only from this thread.
        for ((slot, gi), execution) in executed {
            self.cache.insert(
                fingerprints[unique[slot]].clone(),
                goals[gi].clone(),
                execution.clone(),
            );
            known.insert((slot, gi), execution);
        }

        (0..goals.len())
            .map(|gi| {
                slot_of
                    .iter()
                    .map(|&slot| {
                        known
                            .get(&(slot, gi))
                            .cloned()
                            .unwrap_or_else(Execution::failed)
                    })
                    .collect()
            })
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn execute_pending<T>(
        &self,
        chromosomes: &[Chromosome<T>],
        unique: &[usize],
        goals: &[Goal],
        pending: &[(usize, usize)],
    ) -> Vec<((usize, usize), Execution)>
    where
        T: TestCase,
        E: Executor<T>,
    {
        pending
            .par_iter()
            .map(|&(slot, gi)| {
                (
                    (slot, gi),
                    self.run(&chromosomes[unique[slot]], &goals[gi]),
                )
            })
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn execute_pending<T>(
        &self,
        chromosomes: &[Chromosome<T>],
        unique: &[usize],
        goals: &[Goal],
        pending: &[(usize, usize)],
    ) -> Vec<((usize, usize), Execution)>
    where
        T: TestCase,
        E: Executor<T>,
    {
        pending
            .iter()
            .map(|&(slot, gi)| {
                (
                    (slot, gi),
                    self.run(&chromosomes[unique[slot]], &goals[gi]),
                )
            })
            .collect()
    }

    /// Run the executor. Failures become non-covering executions.
    fn run<T>(&self, chromosome: &Chromosome<T>, goal: &Goal) -> Execution
    where
        T: TestCase,
        E: Executor<T>,
    {
        self.executions.fetch_add(1, Ordering::Relaxed);
        match self.executor.execute(chromosome, goal) {
            Ok(execution) => execution,
            Err(e) => {
                log::warn!("execution against {} failed: {}", goal.id(), e);
                Execution::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ConstructionFailed;
    use rand::Rng;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, PartialEq)]
    struct Num(i64);

    impl TestCase for Num {
        fn to_code(&self) -> String {
            format!("f({});", self.0)
        }
        fn mutate<R: Rng>(&mut self, _rng: &mut R) {
            self.0 += 1;
        }
        fn crossover<R: Rng>(
            &mut self,
            _other: &mut Self,
            _rng: &mut R,
        ) -> Result<(), ConstructionFailed> {
            Ok(())
        }
    }

    /// Covers goal "pos" when the argument is positive; fails on zero.
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Executor<Num> for Counting {
        fn execute(
            &self,
            chromosome: &Chromosome<Num>,
            _goal: &Goal,
        ) -> Result<Execution, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = chromosome.tests()[0].0;
            if n == 0 {
                return Err(ExecutionError::Failed("zero".into()));
            }
            if n > 0 {
                Ok(Execution::covered(Some(ObservationVector::from_ints(&[n]))))
            } else {
                Ok(Execution::uncovered(n.unsigned_abs() as f64))
            }
        }
    }

    fn goal(id: &str) -> Goal {
        Goal::at(id, "U", "f", 1)
    }

    #[test]
    fn test_evaluate_uses_cache() {
        let evaluator = Evaluator::new(Counting::default());
        let c = Chromosome::Individual(Num(3));
        let g = goal("pos");

        let first = evaluator.evaluate(&c, &g);
        let second = evaluator.evaluate(&c.clone(), &g);

        assert!(first.is_covered());
        assert_eq!(first.observation(), second.observation());
        assert_eq!(evaluator.executor().calls.load(Ordering::SeqCst), 1);
        assert_eq!(evaluator.executions(), 1);
    }

    #[test]
    fn test_failure_is_non_covering() {
        let evaluator = Evaluator::new(Counting::default());
        let e = evaluator.evaluate(&Chromosome::Individual(Num(0)), &goal("pos"));

        assert!(!e.is_covered());
        assert_eq!(e.fitness(), f64::MAX);
        assert!(e.observation().is_none());
    }

    #[test]
    fn test_batch_dedupes_structures() {
        let evaluator = Evaluator::new(Counting::default());
        let population = vec![
            Chromosome::Individual(Num(1)),
            Chromosome::Individual(Num(1)),
            Chromosome::Individual(Num(-2)),
        ];
        let goals = vec![goal("a"), goal("b")];

        let rows = evaluator.evaluate_batch(&population, &goals);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 3);
        assert!(rows[1][1].evaluated_against(&goals[1]));
        assert!(rows[0][0].is_covered());
        assert_eq!(rows[0][2].fitness(), 2.0);

        // two unique structures x two goals
        assert_eq!(evaluator.executor().calls.load(Ordering::SeqCst), 4);

        let matrix = evaluator.fitness_matrix(&population, &goals);
        assert_eq!(matrix, vec![vec![0.0, 0.0], vec![0.0, 0.0], vec![2.0, 2.0]]);
        assert_eq!(evaluator.executor().calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_evaluated_is_bound_to_goal() {
        let evaluator = Evaluator::new(Counting::default());
        let e = evaluator.evaluate(&Chromosome::Individual(Num(5)), &goal("a"));

        assert!(e.evaluated_against(&goal("a")));
        assert!(!e.evaluated_against(&goal("b")));

        let (chromosome, observation) = e.into_parts();
        assert_eq!(chromosome, Chromosome::Individual(Num(5)));
        assert_eq!(observation, Some(ObservationVector::from_ints(&[5])));
    }
}
