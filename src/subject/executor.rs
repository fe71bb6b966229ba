//! Execution of input vectors on a subject.

use crate::compute::{
    Chromosome, Execution, ExecutionError, Executor, Goal, ObservationVector,
};

use super::{InputVector, Subject, Trace};

/// Runs a [`Subject`] and measures each run against a goal's capture point.
///
/// A run satisfies a goal when its capture point is reached; the first
/// values captured there become the observation. Otherwise fitness is
/// `1 + d / (d + 1)` for the best branch distance `d`, or `2.0` when the
/// run recorded none. A suite satisfies a goal when any of its tests does.
#[derive(Debug, Clone)]
pub struct SubjectExecutor {
    subject: Subject,
}

impl SubjectExecutor {
    pub fn new(subject: Subject) -> Self {
        Self { subject }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    fn run(&self, test: &InputVector) -> Result<Trace, ExecutionError> {
        if test.args().len() != self.subject.arity() {
            return Err(ExecutionError::Failed(format!(
                "{} takes {} arguments, got {}",
                self.subject.function(),
                self.subject.arity(),
                test.args().len()
            )));
        }
        Ok(self.subject.run(test.args()))
    }
}

/// Fitness of one trace on `goal`.
fn measure(trace: &Trace, goal: &Goal) -> Execution {
    match trace.first_capture(goal.id()) {
        Some(values) => Execution::covered(Some(ObservationVector::from_ints(values))),
        None => {
            let fitness = match trace.best_distance(goal.id()) {
                Some(d) => 1.0 + d / (d + 1.0),
                None => 2.0,
            };
            Execution::uncovered(fitness)
        }
    }
}

impl Executor<InputVector> for SubjectExecutor {
    fn execute(
        &self,
        chromosome: &Chromosome<InputVector>,
        goal: &Goal,
    ) -> Result<Execution, ExecutionError> {
        let mut best: Option<Execution> = None;

        for test in chromosome.tests() {
            let execution = measure(&self.run(test)?, goal);
            if execution.is_covered() {
                return Ok(execution);
            }
            if best.as_ref().is_none_or(|b| execution.fitness < b.fitness) {
                best = Some(execution);
            }
        }

        Ok(best.unwrap_or_else(|| Execution::uncovered(2.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::{less_than, triangle};

    fn call(args: &[i64]) -> InputVector {
        InputVector::new("check_lt", args.to_vec(), (-100, 100))
    }

    fn goal(subject: &Subject, id: &str) -> Goal {
        subject.goals().into_iter().find(|g| g.id() == id).unwrap()
    }

    #[test]
    fn test_covered_with_observation() {
        let subject = less_than();
        let g = goal(&subject, "A_LT_B$a_lt_b_truebranch");
        let executor = SubjectExecutor::new(subject);

        let e = executor.execute(&Chromosome::Individual(call(&[1, 2])), &g).unwrap();
        assert!(e.is_covered());
        assert_eq!(e.observation, Some(ObservationVector::from_ints(&[1, 2])));
    }

    #[test]
    fn test_branch_distance_fitness() {
        let subject = less_than();
        let g = goal(&subject, "A_LT_B$a_lt_b_truebranch");
        let executor = SubjectExecutor::new(subject);

        // distance 4 -> 1 + 4/5
        let e = executor.execute(&Chromosome::Individual(call(&[5, 2])), &g).unwrap();
        assert!(!e.is_covered());
        assert!((e.fitness - 1.8).abs() < 1e-12);
        assert!(e.observation.is_none());

        let closer = executor.execute(&Chromosome::Individual(call(&[3, 2])), &g).unwrap();
        assert!(closer.fitness < e.fitness);
        assert!(closer.fitness > 1.0);
    }

    #[test]
    fn test_suite_covers_if_any_test_does() {
        let subject = less_than();
        let g = goal(&subject, "A_LT_B$a_lt_b_falsebranch");
        let executor = SubjectExecutor::new(subject);

        let suite = Chromosome::Suite(vec![call(&[1, 9]), call(&[4, 4]), call(&[7, 1])]);
        let e = executor.execute(&suite, &g).unwrap();
        assert_eq!(e.observation, Some(ObservationVector::from_ints(&[4, 4])));

        let suite = Chromosome::Suite(vec![call(&[1, 9]), call(&[1, 2])]);
        let e = executor.execute(&suite, &g).unwrap();
        // best distance is 1 (from [1, 2])
        assert!((e.fitness - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_arity_is_an_error() {
        let subject = triangle();
        let g = goal(&subject, "triangle_ok");
        let executor = SubjectExecutor::new(subject);

        let result = executor.execute(&Chromosome::Individual(call(&[1, 2])), &g);
        assert!(matches!(result, Err(ExecutionError::Failed(_))));
    }
}
