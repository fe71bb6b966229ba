//! Candidate representation: tests, chromosomes and their construction.
//!
//! The internals of a test are owned by the caller; the search only needs
//! the capabilities on [`TestCase`]. A [`Chromosome`] is either a single test
//! or a whole suite, and both are driven through the same operations.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::goal::Goal;

/// Recoverable failure to apply a variation operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Construction failed: {reason}")]
pub struct ConstructionFailed {
    pub reason: String,
}

impl ConstructionFailed {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Capabilities the search needs from one test.
pub trait TestCase: Clone + Send + Sync {
    /// Structural serialization. Two tests with the same code are the same test.
    fn to_code(&self) -> String;

    /// Mutate in place.
    fn mutate<R: Rng>(&mut self, rng: &mut R);

    /// Exchange material with `other` in place.
    fn crossover<R: Rng>(&mut self, other: &mut Self, rng: &mut R)
    -> Result<(), ConstructionFailed>;
}

/// Structural identity of a chromosome, used for cache keys and suite
/// deduplication. Distinct from object identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint from an already serialized structure.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Fingerprint of a single test.
    pub fn of<T: TestCase>(test: &T) -> Self {
        Self(test.to_code())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unit of the search: a single test or a suite of tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Chromosome<T> {
    Individual(T),
    Suite(Vec<T>),
}

impl<T: TestCase> Chromosome<T> {
    /// Structural fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            Chromosome::Individual(test) => Fingerprint::of(test),
            Chromosome::Suite(tests) => {
                let body: Vec<String> = tests.iter().map(TestCase::to_code).collect();
                Fingerprint(format!("suite {{\n{}\n}}", body.join("\n\n")))
            }
        }
    }

    /// Tests contained in this chromosome.
    pub fn tests(&self) -> &[T] {
        match self {
            Chromosome::Individual(test) => std::slice::from_ref(test),
            Chromosome::Suite(tests) => tests,
        }
    }

    /// Number of tests.
    pub fn size(&self) -> usize {
        self.tests().len()
    }

    /// Mutate in place. Suites mutate each test with probability 1/size.
    pub fn mutate<R: Rng>(&mut self, rng: &mut R) {
        match self {
            Chromosome::Individual(test) => test.mutate(rng),
            Chromosome::Suite(tests) => {
                if tests.is_empty() {
                    return;
                }
                let p = 1.0 / tests.len() as f64;
                for test in tests.iter_mut() {
                    if rng.gen_bool(p) {
                        test.mutate(rng);
                    }
                }
            }
        }
    }

    /// Crossover with a peer of the same kind.
    ///
    /// Suites exchange tails at independent cut points. On failure both
    /// chromosomes are left untouched.
    pub fn crossover<R: Rng>(
        &mut self,
        other: &mut Self,
        rng: &mut R,
    ) -> Result<(), ConstructionFailed> {
        match (self, other) {
            (Chromosome::Individual(a), Chromosome::Individual(b)) => a.crossover(b, rng),
            (Chromosome::Suite(a), Chromosome::Suite(b)) => {
                if a.is_empty() || b.is_empty() {
                    return Err(ConstructionFailed::new("cannot cross an empty suite"));
                }
                let cut_a = rng.gen_range(0..=a.len());
                let cut_b = rng.gen_range(0..=b.len());
                let tail_a = a.split_off(cut_a);
                let tail_b = b.split_off(cut_b);
                a.extend(tail_b);
                b.extend(tail_a);
                Ok(())
            }
            _ => Err(ConstructionFailed::new(
                "cannot cross an individual with a suite",
            )),
        }
    }
}

/// Source of fresh chromosomes.
pub trait ChromosomeFactory<T: TestCase> {
    /// A uniformly random chromosome.
    fn new_random<R: Rng>(&self, rng: &mut R) -> Chromosome<T>;

    /// A chromosome biased towards `goal`. Defaults to uniform generation;
    /// the engine additionally runs a tournament against the goal.
    fn new_biased<R: Rng>(&self, goal: &Goal, rng: &mut R) -> Chromosome<T> {
        let _ = goal;
        self.new_random(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[derive(Debug, Clone, PartialEq)]
    struct Word(String);

    impl TestCase for Word {
        fn to_code(&self) -> String {
            format!("call({});", self.0)
        }

        fn mutate<R: Rng>(&mut self, _rng: &mut R) {
            self.0.push('!');
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

    fn word(s: &str) -> Word {
        Word(s.to_string())
    }

    #[test]
    fn test_fingerprint_is_structural() {
        let a = Chromosome::Individual(word("x"));
        let b = Chromosome::Individual(word("x"));
        let suite = Chromosome::Suite(vec![word("x")]);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), suite.fingerprint());
    }

    #[test]
    fn test_mixed_crossover_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut a = Chromosome::Individual(word("a"));
        let mut b = Chromosome::Suite(vec![word("b")]);

        let err = a.crossover(&mut b, &mut rng).unwrap_err();
        assert!(err.reason.contains("individual with a suite"));
        assert_eq!(a, Chromosome::Individual(word("a")));
        assert_eq!(b, Chromosome::Suite(vec![word("b")]));
    }

    #[test]
    fn test_suite_crossover_preserves_tests() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut a = Chromosome::Suite(vec![word("a1"), word("a2"), word("a3")]);
        let mut b = Chromosome::Suite(vec![word("b1"), word("b2")]);

        a.crossover(&mut b, &mut rng).unwrap();
        assert_eq!(a.size() + b.size(), 5);

        let mut all: Vec<String> = a.tests().iter().chain(b.tests()).map(|w| w.0.clone()).collect();
        all.sort();
        assert_eq!(all, vec!["a1", "a2", "a3", "b1", "b2"]);
    }

    #[test]
    fn test_empty_suite_crossover_fails() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut a: Chromosome<Word> = Chromosome::Suite(vec![]);
        let mut b = Chromosome::Suite(vec![word("b")]);
        assert!(a.crossover(&mut b, &mut rng).is_err());
    }

    #[test]
    fn test_individual_mutate() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut a = Chromosome::Individual(word("a"));
        a.mutate(&mut rng);
        assert_eq!(a.tests()[0].0, "a!");
    }
}
