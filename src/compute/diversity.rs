//! Diversity-based choice of the next witness to offer the archive.
//!
//! Candidates are compared on the observation vectors they produced for one
//! goal. The preferred candidate has the largest internal diversity; when
//! every candidate's internal diversity is zero, the candidate farthest from
//! the centroid of all observations is preferred instead.

use super::chromosome::TestCase;
use super::execution::{Evaluated, Evaluator, Executor};
use super::goal::Goal;
use super::observation::ObservationVector;

/// Selects witnesses for a single goal.
#[derive(Debug, Clone, Copy)]
pub struct DiversitySelector<'g> {
    goal: &'g Goal,
}

impl<'g> DiversitySelector<'g> {
    pub fn new(goal: &'g Goal) -> Self {
        Self { goal }
    }

    pub fn goal(&self) -> &Goal {
        self.goal
    }

    /// Re-evaluate candidates whose execution belongs to another goal and
    /// keep those that satisfy this goal. Re-evaluation goes through the
    /// evaluator's cache.
    pub fn refresh<T, E>(
        &self,
        candidates: Vec<Evaluated<T>>,
        evaluator: &Evaluator<E>,
    ) -> Vec<Evaluated<T>>
    where
        T: TestCase,
        E: Executor<T>,
    {
        candidates
            .into_iter()
            .map(|c| {
                if c.evaluated_against(self.goal) {
                    c
                } else {
                    log::debug!("re-evaluating stale candidate for {}", self.goal.id());
                    evaluator.evaluate(c.chromosome(), self.goal)
                }
            })
            .filter(Evaluated::is_covered)
            .collect()
    }

    /// Index of the most representative candidate.
    ///
    /// Panics on an empty candidate list or on a candidate evaluated against
    /// another goal; both are caller bugs. Pass stale candidates through
    /// [`refresh`](Self::refresh) first.
    pub fn select_best<T>(&self, candidates: &[Evaluated<T>]) -> usize {
        assert!(
            !candidates.is_empty(),
            "no covering candidates for goal {}",
            self.goal
        );
        let observations = self.observations(candidates);
        let pool: Vec<usize> = (0..observations.len()).collect();
        pool[select_from(&observations, &pool)]
    }

    /// Induction order: repeatedly pick the best of the candidates not yet
    /// picked. The first element equals [`select_best`](Self::select_best).
    ///
    /// Expects candidates already passed through [`refresh`](Self::refresh);
    /// panics on one evaluated against another goal.
    pub fn rank<T>(&self, candidates: &[Evaluated<T>]) -> Vec<usize> {
        let observations = self.observations(candidates);
        let mut pool: Vec<usize> = (0..observations.len()).collect();
        let mut order = Vec::with_capacity(pool.len());

        while !pool.is_empty() {
            let pos = select_from(&observations, &pool);
            order.push(pool.remove(pos));
        }

        order
    }

    fn observations<T>(&self, candidates: &[Evaluated<T>]) -> Vec<ObservationVector> {
        candidates
            .iter()
            .map(|c| {
                assert!(
                    c.evaluated_against(self.goal),
                    "candidate evaluated against {} scored for {}",
                    c.goal(),
                    self.goal
                );
                c.observation().cloned().unwrap_or_default()
            })
            .collect()
    }
}

/// Position within `pool` of the preferred observation. Ties go to the
/// earliest position.
fn select_from(observations: &[ObservationVector], pool: &[usize]) -> usize {
    debug_assert!(!pool.is_empty());

    let mut best_pos = 0;
    let mut best_diversity = observations[pool[0]].internal_diversity();
    for (pos, &i) in pool.iter().enumerate().skip(1) {
        let diversity = observations[i].internal_diversity();
        if diversity > best_diversity {
            best_diversity = diversity;
            best_pos = pos;
        }
    }

    if best_diversity > 0.0 {
        return best_pos;
    }

    let Some(centroid) = ObservationVector::centroid(pool.iter().map(|&i| &observations[i])) else {
        return 0;
    };

    let mut best_pos = 0;
    let mut best_distance = f64::NEG_INFINITY;
    for (pos, &i) in pool.iter().enumerate() {
        let distance = observations[i].distance(&centroid);
        if distance > best_distance {
            best_distance = distance;
            best_pos = pos;
        }
    }
    best_pos
}
