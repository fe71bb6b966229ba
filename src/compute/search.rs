//! The generational multicover search loop.
//!
//! Each generation breeds offspring from the population, evaluates parents
//! and offspring against the remaining goals, routes covering candidates
//! through the diversity selector into the archive and ranks the rest to
//! form the next population.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::schema::{
    ConfigError, Initialization, SearchConfig, SearchHistory, SearchPhase, SearchProgress,
    SearchResult, SearchStats, SelectionMethod, StopReason,
};

use super::archive::{Admission, MulticoverArchive};
use super::chromosome::{Chromosome, ChromosomeFactory, TestCase};
use super::diversity::DiversitySelector;
use super::execution::{Evaluator, Executor};
use super::goal::Goal;
use super::ranking::ParetoRanker;
use super::rng::SearchRng;

/// Evolution engine that runs the multicover search.
pub struct MulticoverEngine<T, F, E> {
    config: SearchConfig,
    rng: SearchRng,
    factory: F,
    evaluator: Evaluator<E>,
    archive: MulticoverArchive<T>,
    population: Vec<Chromosome<T>>,
    remaining: BTreeSet<Goal>,
    generation: usize,
    phase: SearchPhase,
    history: SearchHistory,
    cancelled: Arc<AtomicBool>,
    started: Instant,
}

impl<T, F, E> MulticoverEngine<T, F, E>
where
    T: TestCase,
    F: ChromosomeFactory<T>,
    E: Executor<T>,
{
    /// Create an engine over `goals`.
    pub fn new(
        config: SearchConfig,
        factory: F,
        executor: E,
        goals: impl IntoIterator<Item = Goal>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut archive = MulticoverArchive::new(config.multicover_target);
        for goal in goals {
            archive.register_goal(goal);
        }
        if archive.goals().next().is_none() {
            return Err(ConfigError::NoGoals);
        }
        let remaining = archive.remaining_goals();

        let rng = match config.random_seed {
            Some(seed) => SearchRng::new(seed),
            None => SearchRng::random(),
        };

        Ok(Self {
            config,
            rng,
            factory,
            evaluator: Evaluator::new(executor),
            archive,
            population: Vec::new(),
            remaining,
            generation: 0,
            phase: SearchPhase::Uninitialized,
            history: SearchHistory::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
            started: Instant::now(),
        })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn archive(&self) -> &MulticoverArchive<T> {
        &self.archive
    }

    pub fn evaluator(&self) -> &Evaluator<E> {
        &self.evaluator
    }

    pub fn population(&self) -> &[Chromosome<T>] {
        &self.population
    }

    /// Goals still short of `k` witnesses.
    pub fn remaining_goals(&self) -> &BTreeSet<Goal> {
        &self.remaining
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// Fill the population and evaluate it once.
    pub fn initialize(&mut self) {
        self.generation = 0;
        self.started = Instant::now();

        let initial = if self.remaining.is_empty() {
            Vec::new()
        } else {
            self.distributed_population(self.config.population.size)
        };

        self.phase = SearchPhase::Evaluating;
        self.population = self.evaluate(initial);
        log::info!(
            "initialized population of {} over {} goals",
            self.population.len(),
            self.remaining.len()
        );
    }

    /// `count` fresh candidates spread over the remaining goals.
    ///
    /// Panics when no goals remain; the loop only tops up while searching.
    fn distributed_population(&mut self, count: usize) -> Vec<Chromosome<T>> {
        assert!(
            !self.remaining.is_empty(),
            "cannot distribute a population over zero goals"
        );

        match self.config.population.initialization {
            Initialization::Uniform => (0..count)
                .map(|_| self.factory.new_random(&mut self.rng))
                .collect(),
            Initialization::RoundRobin => {
                let goals: Vec<Goal> = self.remaining.iter().cloned().collect();
                (0..count)
                    .map(|i| self.biased_candidate(&goals[i % goals.len()]))
                    .collect()
            }
        }
    }

    /// Best of a tournament of goal-biased candidates, judged on `goal`.
    fn biased_candidate(&mut self, goal: &Goal) -> Chromosome<T> {
        let mut best = self.factory.new_biased(goal, &mut self.rng);
        let mut best_fitness = self.evaluator.evaluate(&best, goal).fitness();

        for _ in 1..self.config.biased_tournament_size {
            if best_fitness == 0.0 {
                break;
            }
            let contestant = self.factory.new_biased(goal, &mut self.rng);
            let fitness = self.evaluator.evaluate(&contestant, goal).fitness();
            if fitness < best_fitness {
                best = contestant;
                best_fitness = fitness;
            }
        }

        best
    }

    /// Offspring of `parents`, as many as there are parents.
    fn breed(&mut self, parents: &[Chromosome<T>]) -> Vec<Chromosome<T>> {
        if parents.is_empty() {
            return Vec::new();
        }

        let goals: Vec<Goal> = self.remaining.iter().cloned().collect();
        let scores: Vec<f64> = self
            .evaluator
            .fitness_matrix(parents, &goals)
            .into_iter()
            .map(|row| {
                if row.is_empty() {
                    0.0
                } else {
                    row.iter().sum::<f64>() / row.len() as f64
                }
            })
            .collect();

        let mut offspring = Vec::with_capacity(parents.len() + 1);
        while offspring.len() < parents.len() {
            let first = self.select_index(&scores);
            let second = self.select_index(&scores);
            let (a, b) = self.reproduce(&parents[first], &parents[second]);
            offspring.push(a);
            offspring.push(b);
        }
        offspring.truncate(parents.len());
        offspring
    }

    /// Two children of `first` and `second`.
    ///
    /// Crossover applies with the configured rate; if it fails the children
    /// stay unmodified clones of their parents. Each child is then mutated
    /// independently with the configured rate.
    pub fn reproduce(
        &mut self,
        first: &Chromosome<T>,
        second: &Chromosome<T>,
    ) -> (Chromosome<T>, Chromosome<T>) {
        let mut a = first.clone();
        let mut b = second.clone();

        if self.rng.chance(self.config.crossover_rate)
            && let Err(e) = a.crossover(&mut b, &mut self.rng)
        {
            log::debug!("{}", e);
            a = first.clone();
            b = second.clone();
        }

        if self.rng.chance(self.config.mutation_rate) {
            a.mutate(&mut self.rng);
        }
        if self.rng.chance(self.config.mutation_rate) {
            b.mutate(&mut self.rng);
        }

        (a, b)
    }

    /// Select a parent index; lower score is better.
    fn select_index(&mut self, scores: &[f64]) -> usize {
        match &self.config.selection {
            SelectionMethod::Tournament { size } => {
                let mut best = self.rng.index(scores.len());
                for _ in 1..*size {
                    let idx = self.rng.index(scores.len());
                    if scores[idx] < scores[best] {
                        best = idx;
                    }
                }
                best
            }
            SelectionMethod::RankBased => {
                let mut order: Vec<usize> = (0..scores.len()).collect();
                order.sort_by(|&a, &b| {
                    scores[a]
                        .partial_cmp(&scores[b])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                // Best gets weight n, worst gets 1.
                let n = order.len();
                let total = n * (n + 1) / 2;
                let mut target = self.rng.index(total);
                for (pos, &idx) in order.iter().enumerate() {
                    let weight = n - pos;
                    if target < weight {
                        return idx;
                    }
                    target -= weight;
                }
                order[0]
            }
            SelectionMethod::Random => self.rng.index(scores.len()),
        }
    }

    /// Evaluate `candidates` against the remaining goals, update the archive
    /// and return the next population.
    fn evaluate(&mut self, candidates: Vec<Chromosome<T>>) -> Vec<Chromosome<T>> {
        let size = self.config.population.size;
        let goals: Vec<Goal> = self.remaining.iter().cloned().collect();
        if goals.is_empty() {
            let mut survivors = candidates;
            survivors.truncate(size);
            return survivors;
        }

        let rows = self.evaluator.evaluate_batch(&candidates, &goals);

        // Fitness per candidate, one column per goal.
        let fitness: Vec<Vec<f64>> = (0..candidates.len())
            .map(|ci| rows.iter().map(|row| row[ci].fitness()).collect())
            .collect();
        let covers_any: Vec<bool> = fitness
            .iter()
            .map(|row| row.iter().any(|&f| f == 0.0))
            .collect();

        let mut recycled = Vec::new();
        let mut accepted = 0;
        for (goal, row) in goals.iter().zip(rows) {
            let selector = DiversitySelector::new(goal);
            let covering = selector.refresh(row, &self.evaluator);
            if covering.is_empty() {
                continue;
            }

            let order = selector.rank(&covering);
            let attempts = ((order.len() as f64 * self.config.archive_fraction).ceil() as usize)
                .clamp(1, order.len());

            let mut slots: Vec<Option<_>> = covering.into_iter().map(Some).collect();
            for (pos, &idx) in order.iter().enumerate() {
                let Some(candidate) = slots[idx].take() else {
                    continue;
                };
                if pos >= attempts {
                    recycled.push(candidate.into_chromosome());
                    continue;
                }

                let (chromosome, observation) = candidate.into_parts();
                match self.archive.try_accept(
                    goal,
                    chromosome.clone(),
                    observation,
                    self.generation,
                ) {
                    Admission::Accepted { .. } => accepted += 1,
                    Admission::Rejected(reason) => {
                        log::debug!("{}: witness rejected ({:?})", goal.id(), reason);
                        let mut chromosome = chromosome;
                        chromosome.mutate(&mut self.rng);
                        recycled.push(chromosome);
                    }
                }
            }
        }

        self.update_remaining();

        // Rank the non-covering candidates on the goals still remaining.
        let columns: Vec<usize> = goals
            .iter()
            .enumerate()
            .filter(|(_, g)| self.remaining.contains(*g))
            .map(|(gi, _)| gi)
            .collect();
        let mut pool = Vec::new();
        let mut pool_fitness = Vec::new();
        for (ci, candidate) in candidates.into_iter().enumerate() {
            if !covers_any[ci] {
                pool_fitness.push(columns.iter().map(|&gi| fitness[ci][gi]).collect::<Vec<_>>());
                pool.push(candidate);
            }
        }

        let mut ranking = ParetoRanker::new(self.config.ranking.preference_sorting).rank(&pool_fitness);
        if self.config.ranking.demote_archived {
            let penalties: Vec<usize> = pool
                .iter()
                .map(|c| self.archive.appearance_count(&c.fingerprint()))
                .collect();
            ranking.demote(&penalties);
        }

        let mut next = Vec::with_capacity(size);
        let mut seen = HashSet::new();
        for chromosome in recycled {
            if next.len() >= size {
                break;
            }
            if seen.insert(chromosome.fingerprint()) {
                next.push(chromosome);
            }
        }

        let room = size - next.len();
        let mut pool: Vec<Option<Chromosome<T>>> = pool.into_iter().map(Some).collect();
        for idx in ranking.select(room) {
            if let Some(chromosome) = pool[idx].take()
                && seen.insert(chromosome.fingerprint())
            {
                next.push(chromosome);
            }
        }

        if next.len() < size && !self.remaining.is_empty() {
            let short = size - next.len();
            log::debug!("topping up population with {} fresh candidates", short);
            let fresh = self.distributed_population(short);
            next.extend(fresh);
        }

        self.history.remaining_goals.push(self.remaining.len());
        self.history.archive_size.push(self.archive.len());
        self.history.cache_entries.push(self.evaluator.cache().len());
        self.history.accepted.push(accepted);

        next
    }

    /// Drop goals that reached `k` witnesses. Goals are never re-added.
    fn update_remaining(&mut self) {
        let before = self.remaining.len();
        let archive = &self.archive;
        self.remaining.retain(|goal| !archive.is_covered(goal));

        if self.remaining.len() < before {
            log::info!(
                "generation {}: {} goals covered, {} remaining",
                self.generation,
                before - self.remaining.len(),
                self.remaining.len()
            );
        }
    }

    /// Run a single generation step.
    pub fn step(&mut self) {
        self.phase = SearchPhase::Evolving;
        let parents = std::mem::take(&mut self.population);
        let offspring = self.breed(&parents);

        let mut combined = parents;
        combined.extend(offspring);

        self.phase = SearchPhase::Evaluating;
        self.population = self.evaluate(combined);
        self.generation += 1;

        log::debug!(
            "generation {}: population {}, archive {}, cache {}",
            self.generation,
            self.population.len(),
            self.archive.len(),
            self.evaluator.cache().len()
        );
    }

    /// Check if the search should stop.
    pub fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.remaining.is_empty() {
            return Some(StopReason::AllGoalsCovered);
        }

        if self.generation >= self.config.population.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(budget) = self.config.time_budget()
            && self.started.elapsed() >= budget
        {
            return Some(StopReason::Deadline);
        }

        None
    }

    /// Get current progress.
    pub fn progress(&self) -> SearchProgress {
        SearchProgress {
            generation: self.generation,
            max_generations: self.config.population.max_generations,
            total_goals: self.archive.goals().count(),
            remaining_goals: self.remaining.len(),
            archive_size: self.archive.len(),
            min_coverage: self.archive.min_coverage(),
            population_size: self.population.len(),
            executions: self.evaluator.executions(),
            cache: self.evaluator.cache().stats(),
            history: self.history.clone(),
            phase: self.phase,
        }
    }

    /// Run the search with a progress callback.
    pub fn run_with_callback<C>(&mut self, mut callback: C) -> SearchResult<T>
    where
        C: FnMut(&SearchProgress),
    {
        self.initialize();
        callback(&self.progress());

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            self.step();
            callback(&self.progress());
        };

        self.phase = SearchPhase::Terminated;
        let elapsed = self.started.elapsed().as_secs_f64();
        log::info!(
            "search stopped after {} generations ({:?}): {} of {} goals covered",
            self.generation,
            stop_reason,
            self.archive.covered_goals().len(),
            self.archive.goals().count()
        );

        SearchResult {
            suite: self.archive.materialize_suite(),
            coverage: self.archive.coverage_report(),
            stats: SearchStats {
                generations: self.generation,
                executions: self.evaluator.executions(),
                cache: self.evaluator.cache().stats(),
                archive_size: self.archive.len(),
                min_coverage: self.archive.min_coverage(),
                elapsed_seconds: elapsed,
                stop_reason,
            },
            history: self.history.clone(),
        }
    }

    /// Run the search (blocking).
    pub fn run(&mut self) -> SearchResult<T> {
        self.run_with_callback(|_| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{ConstructionFailed, Execution, ExecutionError, ObservationVector};
    use rand::Rng;

    /// A single integer argument.
    #[derive(Debug, Clone, PartialEq)]
    struct Point(i64);

    impl TestCase for Point {
        fn to_code(&self) -> String {
            format!("f({});", self.0)
        }
        fn mutate<R: Rng>(&mut self, rng: &mut R) {
            self.0 += rng.gen_range(-3..=3);
        }
        fn crossover<R: Rng>(
            &mut self,
            other: &mut Self,
            _rng: &mut R,
        ) -> Result<(), ConstructionFailed> {
            std::mem::swap(&mut self.0, &mut other.0);
            Ok(())
        }
    }

    struct Points;

    impl ChromosomeFactory<Point> for Points {
        fn new_random<R: Rng>(&self, rng: &mut R) -> Chromosome<Point> {
            Chromosome::Individual(Point(rng.gen_range(-20..=20)))
        }
    }

    /// "pos" is hit by positive arguments, "neg" by negative ones; "never"
    /// is unreachable.
    struct Sign;

    impl Executor<Point> for Sign {
        fn execute(
            &self,
            chromosome: &Chromosome<Point>,
            goal: &Goal,
        ) -> Result<Execution, ExecutionError> {
            let x = chromosome.tests()[0].0;
            let hit = match goal.id() {
                "pos" => x > 0,
                "neg" => x < 0,
                _ => false,
            };
            if hit {
                Ok(Execution::covered(Some(ObservationVector::from_ints(&[x]))))
            } else {
                let d = x.unsigned_abs() as f64 + 1.0;
                Ok(Execution::uncovered(1.0 + d / (d + 1.0)))
            }
        }
    }

    fn goals(ids: &[&str]) -> Vec<Goal> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Goal::at(*id, "Sign", "check", i as u32 + 1))
            .collect()
    }

    fn config(size: usize, generations: usize, k: usize) -> SearchConfig {
        let mut config = SearchConfig::default();
        config.population.size = size;
        config.population.max_generations = generations;
        config.multicover_target = k;
        config.random_seed = Some(42);
        config
    }

    #[test]
    fn test_engine_creation() {
        let mut engine =
            MulticoverEngine::new(config(10, 5, 2), Points, Sign, goals(&["pos", "neg", "never"]))
                .unwrap();
        assert_eq!(engine.phase(), SearchPhase::Uninitialized);
        assert_eq!(engine.remaining_goals().len(), 3);

        engine.initialize();
        assert_eq!(engine.population().len(), 10);
        assert_eq!(engine.phase(), SearchPhase::Evaluating);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = MulticoverEngine::new(config(1, 5, 2), Points, Sign, goals(&["pos"]));
        assert!(matches!(result, Err(ConfigError::PopulationTooSmall(1))));

        let result = MulticoverEngine::new(config(10, 5, 2), Points, Sign, Vec::new());
        assert!(matches!(result, Err(ConfigError::NoGoals)));
    }

    #[test]
    fn test_run_covers_reachable_goals() {
        let mut engine =
            MulticoverEngine::new(config(10, 20, 3), Points, Sign, goals(&["pos", "neg"])).unwrap();
        let result = engine.run();

        assert_eq!(result.stats.stop_reason, StopReason::AllGoalsCovered);
        assert!(result.is_complete());
        for goal in goals(&["pos", "neg"]) {
            let witnesses = engine.archive().witnesses(&goal);
            assert_eq!(witnesses.len(), 3);
            for i in 0..witnesses.len() {
                for j in (i + 1)..witnesses.len() {
                    assert_ne!(witnesses[i].observation, witnesses[j].observation);
                }
            }
        }
        assert!(result.suite.len() >= 6);
        assert_eq!(engine.phase(), SearchPhase::Terminated);
    }

    #[test]
    fn test_unreachable_goal_exhausts_budget() {
        let mut engine =
            MulticoverEngine::new(config(8, 4, 1), Points, Sign, goals(&["pos", "never"])).unwrap();
        let result = engine.run();

        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert_eq!(result.stats.generations, 4);
        assert_eq!(result.covered_goals(), 1);
        assert!(!result.is_complete());
        assert!(!result.suite.is_empty());
        assert_eq!(result.history.remaining_goals.len(), 5);
    }

    #[test]
    fn test_remaining_goals_never_grow() {
        let mut engine = MulticoverEngine::new(
            config(6, 10, 4),
            Points,
            Sign,
            goals(&["pos", "neg", "never"]),
        )
        .unwrap();

        let mut counts = Vec::new();
        engine.run_with_callback(|p| counts.push(p.remaining_goals));

        assert!(counts.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_population_size_held() {
        let mut engine =
            MulticoverEngine::new(config(12, 3, 1000), Points, Sign, goals(&["pos", "neg"])).unwrap();
        engine.initialize();
        for _ in 0..3 {
            engine.step();
            assert_eq!(engine.population().len(), 12);
        }
    }

    #[test]
    fn test_cancellation() {
        let mut engine =
            MulticoverEngine::new(config(5, 100, 2), Points, Sign, goals(&["never"])).unwrap();
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let result = engine.run();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 0);
    }

    #[test]
    fn test_reproduce_without_variation_clones_parents() {
        let mut cfg = config(4, 1, 1);
        cfg.crossover_rate = 0.0;
        cfg.mutation_rate = 0.0;
        let mut engine = MulticoverEngine::new(cfg, Points, Sign, goals(&["pos"])).unwrap();

        let (a, b) = engine.reproduce(
            &Chromosome::Individual(Point(1)),
            &Chromosome::Individual(Point(2)),
        );
        assert_eq!(a, Chromosome::Individual(Point(1)));
        assert_eq!(b, Chromosome::Individual(Point(2)));
    }

    #[test]
    fn test_rank_based_selection_prefers_low_scores() {
        let mut cfg = config(4, 1, 1);
        cfg.selection = SelectionMethod::RankBased;
        let mut engine = MulticoverEngine::new(cfg, Points, Sign, goals(&["pos"])).unwrap();

        let scores = [5.0, 0.1, 9.0];
        let picks: Vec<usize> = (0..300).map(|_| engine.select_index(&scores)).collect();
        let best = picks.iter().filter(|&&i| i == 1).count();
        let worst = picks.iter().filter(|&&i| i == 2).count();
        assert!(best > worst);
    }
}
