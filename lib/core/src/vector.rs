use serde::{Deserialize, Serialize};

/// A fixed-length encoded wine feature vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector {
    data: Vec<f32>,
}

impl FeatureVector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    /// Squared L2 norm, accumulated in f64
    #[inline]
    pub fn squared_norm(&self) -> f64 {
        squared_norm(&self.data)
    }

    /// Cosine similarity in `[-1, 1]`; zero vectors are dissimilar to everything
    #[inline]
    pub fn cosine_similarity(&self, other: &FeatureVector) -> f64 {
        if self.dim() != other.dim() {
            return 0.0;
        }
        cosine_similarity(&self.data, self.squared_norm(), &other.data, other.squared_norm())
    }

    /// Cosine distance `1 - cos`, in `[0, 2]`
    #[inline]
    pub fn cosine_distance(&self, other: &FeatureVector) -> f64 {
        cosine_distance_from_similarity(self.cosine_similarity(other))
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

#[inline]
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f64 {
    // Two accumulators for better pipelining
    let mut sum1 = 0.0f64;
    let mut sum2 = 0.0f64;
    let chunks = a.len() / 2;
    for i in 0..chunks {
        sum1 += f64::from(a[2 * i]) * f64::from(b[2 * i]);
        sum2 += f64::from(a[2 * i + 1]) * f64::from(b[2 * i + 1]);
    }
    if a.len() % 2 == 1 {
        let last = a.len() - 1;
        sum1 += f64::from(a[last]) * f64::from(b[last]);
    }
    sum1 + sum2
}

#[inline]
pub(crate) fn squared_norm(a: &[f32]) -> f64 {
    dot(a, a)
}

/// Cosine similarity given precomputed squared norms.
///
/// The denominator is `sqrt(|a|² · |b|²)` rather than `|a| · |b|` so that a
/// vector compared with itself yields exactly `1.0`.
#[inline]
pub(crate) fn cosine_similarity(a: &[f32], a_sq_norm: f64, b: &[f32], b_sq_norm: f64) -> f64 {
    if a_sq_norm == 0.0 || b_sq_norm == 0.0 {
        return 0.0;
    }
    let similarity = dot(a, b) / (a_sq_norm * b_sq_norm).sqrt();
    if !similarity.is_finite() {
        return 0.0;
    }
    similarity.clamp(-1.0, 1.0)
}

#[inline]
pub(crate) fn cosine_distance_from_similarity(similarity: f64) -> f64 {
    (1.0 - similarity).clamp(0.0, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let v1 = FeatureVector::new(vec![1.0, 0.0]);
        let v2 = FeatureVector::new(vec![1.0, 0.0]);
        assert_eq!(v1.cosine_similarity(&v2), 1.0);

        let v3 = FeatureVector::new(vec![1.0, 0.0]);
        let v4 = FeatureVector::new(vec![0.0, 1.0]);
        assert!((v3.cosine_similarity(&v4) - 0.0).abs() < 1e-12);

        let v5 = FeatureVector::new(vec![-1.0, 0.0]);
        assert_eq!(v1.cosine_distance(&v5), 2.0);
    }

    #[test]
    fn test_self_similarity_is_exact() {
        let v = FeatureVector::new(vec![0.3, 0.7, 1.0, 0.0, 0.123_456, 4.0, 0.5]);
        assert_eq!(v.cosine_similarity(&v), 1.0);
        assert_eq!(v.cosine_distance(&v), 0.0);
    }

    #[test]
    fn test_zero_vector_is_dissimilar() {
        let zero = FeatureVector::new(vec![0.0, 0.0, 0.0]);
        let v = FeatureVector::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(zero.cosine_similarity(&v), 0.0);
        assert_eq!(zero.cosine_distance(&v), 1.0);
    }

    #[test]
    fn test_non_finite_is_dissimilar() {
        let inf = FeatureVector::new(vec![f32::INFINITY, 1.0]);
        let v = FeatureVector::new(vec![1.0, 1.0]);
        assert_eq!(inf.cosine_similarity(&v), 0.0);
        assert_eq!(inf.cosine_distance(&v), 1.0);

        let huge = FeatureVector::new(vec![f32::MAX, 1.0]);
        let similarity = huge.cosine_similarity(&v);
        assert!((-1.0..=1.0).contains(&similarity));
    }

    #[test]
    fn test_odd_length_dot() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert_eq!(dot(&a, &b), 32.0);
    }
}
