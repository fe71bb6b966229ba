//! Subject module - Instrumented benchmark programs with integer inputs.
//!
//! A [`Subject`] is a small program whose capture points are the coverage
//! goals. Running it fills a [`Trace`] with the values captured at each
//! point reached and with branch distances towards the points missed.

mod checks;
mod executor;
mod inputs;

use std::collections::HashMap;

use crate::compute::Goal;

pub use checks::*;
pub use executor::SubjectExecutor;
pub use inputs::{InputFactory, InputVector};

/// Instrumentation record of one run.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    captures: Vec<(&'static str, Vec<i64>)>,
    distances: HashMap<&'static str, f64>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the values seen at capture point `id`.
    pub fn capture(&mut self, id: &'static str, values: &[i64]) {
        self.captures.push((id, values.to_vec()));
    }

    /// Record how far this run was from reaching `id`. The smallest
    /// distance is kept.
    pub fn distance(&mut self, id: &'static str, distance: f64) {
        let d = distance.max(0.0);
        self.distances
            .entry(id)
            .and_modify(|best| *best = best.min(d))
            .or_insert(d);
    }

    /// Check if capture point `id` was reached.
    pub fn hit(&self, id: &str) -> bool {
        self.captures.iter().any(|(c, _)| *c == id)
    }

    /// Values of the first capture at `id`.
    pub fn first_capture(&self, id: &str) -> Option<&[i64]> {
        self.captures
            .iter()
            .find(|(c, _)| *c == id)
            .map(|(_, v)| v.as_slice())
    }

    /// Number of captures at `id`.
    pub fn capture_count(&self, id: &str) -> usize {
        self.captures.iter().filter(|(c, _)| *c == id).count()
    }

    /// Best recorded distance towards `id`.
    pub fn best_distance(&self, id: &str) -> Option<f64> {
        self.distances.get(id).copied()
    }
}

/// A capture point of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePoint {
    pub id: &'static str,
    pub line: u32,
}

/// An instrumented program under test.
#[derive(Debug, Clone)]
pub struct Subject {
    name: &'static str,
    unit: &'static str,
    function: &'static str,
    arity: usize,
    input_range: (i64, i64),
    points: Vec<CapturePoint>,
    body: fn(&[i64], &mut Trace),
}

impl Subject {
    /// Name used on the command line.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn function(&self) -> &str {
        self.function
    }

    /// Number of integer arguments.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Inclusive range random inputs are drawn from.
    pub fn input_range(&self) -> (i64, i64) {
        self.input_range
    }

    pub fn capture_points(&self) -> &[CapturePoint] {
        &self.points
    }

    /// One goal per capture point.
    pub fn goals(&self) -> Vec<Goal> {
        self.points
            .iter()
            .map(|p| Goal::at(p.id, self.unit, self.function, p.line))
            .collect()
    }

    /// Run on `args`. The caller checks the arity.
    pub fn run(&self, args: &[i64]) -> Trace {
        debug_assert_eq!(args.len(), self.arity);
        let mut trace = Trace::new();
        (self.body)(args, &mut trace);
        trace
    }
}

/// All benchmark subjects.
pub fn subjects() -> Vec<Subject> {
    vec![less_than(), triangle(), bind_expands_vars2(), ex1()]
}

/// Look up a subject by name.
pub fn subject_by_name(name: &str) -> Option<Subject> {
    subjects().into_iter().find(|s| s.name == name)
}
