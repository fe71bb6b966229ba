//! Integer argument vectors as test cases.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::compute::{Chromosome, ChromosomeFactory, ConstructionFailed, TestCase};

use super::Subject;

/// One call of a subject function with fixed-arity integer arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputVector {
    function: String,
    args: Vec<i64>,
    /// Inclusive bounds kept by mutation.
    range: (i64, i64),
}

impl InputVector {
    pub fn new(function: impl Into<String>, args: Vec<i64>, range: (i64, i64)) -> Self {
        debug_assert!(range.0 <= range.1);
        Self {
            function: function.into(),
            args,
            range,
        }
    }

    pub fn args(&self) -> &[i64] {
        &self.args
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    /// Mutation step width.
    fn sigma(&self) -> f64 {
        ((self.range.1 - self.range.0) as f64 / 10.0).max(1.0)
    }
}

impl TestCase for InputVector {
    fn to_code(&self) -> String {
        let args: Vec<String> = self.args.iter().map(i64::to_string).collect();
        format!("{}({});", self.function, args.join(", "))
    }

    /// Gaussian step on one argument, clamped to the range. The argument
    /// always changes unless the range is a single value.
    fn mutate<R: Rng>(&mut self, rng: &mut R) {
        if self.args.is_empty() {
            return;
        }

        let i = rng.gen_range(0..self.args.len());
        let noise: f64 = rng.sample(StandardNormal);
        let mut delta = (noise * self.sigma()).round() as i64;
        if delta == 0 {
            delta = if rng.gen_bool(0.5) { 1 } else { -1 };
        }

        let (lo, hi) = self.range;
        let old = self.args[i];
        let mut new = old.saturating_add(delta).clamp(lo, hi);
        if new == old {
            new = old.saturating_sub(delta).clamp(lo, hi);
        }
        self.args[i] = new;
    }

    /// Single-point crossover: tails after a random cut are exchanged.
    fn crossover<R: Rng>(
        &mut self,
        other: &mut Self,
        rng: &mut R,
    ) -> Result<(), ConstructionFailed> {
        if self.args.len() != other.args.len() {
            return Err(ConstructionFailed::new(format!(
                "arity mismatch: {} vs {}",
                self.args.len(),
                other.args.len()
            )));
        }
        if self.function != other.function {
            return Err(ConstructionFailed::new(format!(
                "cannot cross {} with {}",
                self.function, other.function
            )));
        }

        let len = self.args.len();
        let cut = if len > 1 { rng.gen_range(1..len) } else { 0 };
        self.args[cut..].swap_with_slice(&mut other.args[cut..]);
        Ok(())
    }
}

/// Random argument vectors for a subject.
#[derive(Debug, Clone)]
pub struct InputFactory {
    function: String,
    arity: usize,
    range: (i64, i64),
    max_suite_size: Option<usize>,
}

impl InputFactory {
    pub fn new(function: impl Into<String>, arity: usize, range: (i64, i64)) -> Self {
        Self {
            function: function.into(),
            arity,
            range,
            max_suite_size: None,
        }
    }

    pub fn for_subject(subject: &Subject) -> Self {
        Self::new(subject.function(), subject.arity(), subject.input_range())
    }

    /// Produce suites of 1 to `max_size` tests instead of single tests.
    pub fn suites(mut self, max_size: usize) -> Self {
        self.max_suite_size = Some(max_size.max(1));
        self
    }

    /// A uniformly random test.
    pub fn random_test<R: Rng>(&self, rng: &mut R) -> InputVector {
        let (lo, hi) = self.range;
        let args = (0..self.arity).map(|_| rng.gen_range(lo..=hi)).collect();
        InputVector::new(self.function.clone(), args, self.range)
    }
}

impl ChromosomeFactory<InputVector> for InputFactory {
    fn new_random<R: Rng>(&self, rng: &mut R) -> Chromosome<InputVector> {
        match self.max_suite_size {
            None => Chromosome::Individual(self.random_test(rng)),
            Some(max) => {
                let size = rng.gen_range(1..=max);
                Chromosome::Suite((0..size).map(|_| self.random_test(rng)).collect())
            }
        }
    }
}
