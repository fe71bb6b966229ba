//! Observation vectors captured when a goal is hit during execution.

use serde::{Deserialize, Serialize};

/// Fixed-arity tuple of values captured at a goal's instrumentation point.
///
/// Equality is exact component-wise equality and is what the archive uses to
/// recognise redundant witnesses. Distance is Euclidean.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationVector(Vec<f64>);

impl ObservationVector {
    /// Create from raw values.
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Create from integer values (the common case for captured locals).
    pub fn from_ints(values: &[i64]) -> Self {
        Self(values.iter().map(|&v| v as f64).collect())
    }

    /// The empty observation, recorded for goals without capture support.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Component values.
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the vector has no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mean pairwise absolute difference between the vector's components.
    ///
    /// Vectors with fewer than two components have zero internal diversity.
    pub fn internal_diversity(&self) -> f64 {
        let n = self.0.len();
        if n < 2 {
            return 0.0;
        }

        let mut sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                sum += (self.0[i] - self.0[j]).abs();
            }
        }

        let pairs = (n * (n - 1) / 2) as f64;
        sum / pairs
    }

    /// Euclidean distance to another vector of the same arity.
    pub fn distance(&self, other: &ObservationVector) -> f64 {
        assert_eq!(
            self.len(),
            other.len(),
            "observation arity mismatch: {} vs {}",
            self.len(),
            other.len()
        );

        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Component-wise mean of a set of vectors sharing one arity.
    ///
    /// Returns `None` for an empty set.
    pub fn centroid<'a, I>(vectors: I) -> Option<ObservationVector>
    where
        I: IntoIterator<Item = &'a ObservationVector>,
    {
        let mut iter = vectors.into_iter();
        let first = iter.next()?;
        let mut sum = first.0.clone();
        let mut count = 1usize;

        for v in iter {
            assert_eq!(
                sum.len(),
                v.len(),
                "observation arity mismatch in centroid: {} vs {}",
                sum.len(),
                v.len()
            );
            for (acc, value) in sum.iter_mut().zip(&v.0) {
                *acc += value;
            }
            count += 1;
        }

        let count = count as f64;
        Some(Self(sum.into_iter().map(|s| s / count).collect()))
    }
}

impl From<Vec<f64>> for ObservationVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl From<&[i64]> for ObservationVector {
    fn from(values: &[i64]) -> Self {
        Self::from_ints(values)
    }
}

impl std::fmt::Display for ObservationVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_diversity() {
        // |1-3| + |1-6| + |3-6| = 2 + 5 + 3 = 10 over 3 pairs
        let v = ObservationVector::from_ints(&[1, 3, 6]);
        assert!((v.internal_diversity() - 10.0 / 3.0).abs() < 1e-12);

        assert_eq!(ObservationVector::from_ints(&[4, 4]).internal_diversity(), 0.0);
        assert_eq!(ObservationVector::from_ints(&[7]).internal_diversity(), 0.0);
        assert_eq!(ObservationVector::empty().internal_diversity(), 0.0);
    }

    #[test]
    fn test_distance() {
        let a = ObservationVector::from_ints(&[0, 0]);
        let b = ObservationVector::from_ints(&[3, 4]);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "arity mismatch")]
    fn test_distance_arity_mismatch() {
        let a = ObservationVector::from_ints(&[0, 0]);
        let b = ObservationVector::from_ints(&[1]);
        a.distance(&b);
    }

    #[test]
    fn test_centroid() {
        let vs = [
            ObservationVector::from_ints(&[1, 1]),
            ObservationVector::from_ints(&[1, 1]),
            ObservationVector::from_ints(&[5, 5]),
        ];
        let c = ObservationVector::centroid(&vs).unwrap();
        assert!((c.values()[0] - 7.0 / 3.0).abs() < 1e-12);
        assert!((c.values()[1] - 7.0 / 3.0).abs() < 1e-12);

        assert!(ObservationVector::centroid(std::iter::empty()).is_none());
    }

    #[test]
    fn test_exact_equality() {
        assert_eq!(
            ObservationVector::from_ints(&[1, 2]),
            ObservationVector::new(vec![1.0, 2.0])
        );
        assert_ne!(
            ObservationVector::from_ints(&[1, 2]),
            ObservationVector::from_ints(&[2, 1])
        );
    }

    #[test]
    fn test_display() {
        let v = ObservationVector::from_ints(&[1, -2]);
        assert_eq!(v.to_string(), "[1, -2]");
    }
}
