//! Exhaustive cosine nearest-neighbor index
//!
//! At catalog scale (~1e5 rows, ~80 columns) a parallel brute-force scan is
//! fast enough; approximate structures can be plugged in behind
//! [`NeighborSearch`].

use crate::vector::{cosine_distance_from_similarity, cosine_similarity, squared_norm};
use crate::{Error, FeatureVector, Result};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A single search hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Row position in the catalog the index was built from
    pub row: usize,
    /// Cosine distance in `[0, 2]`
    pub distance: f64,
}

impl Neighbor {
    /// `1 - distance`, in `[-1, 1]`
    #[inline]
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}

/// Nearest-neighbor search over an encoded catalog
pub trait NeighborSearch: Send + Sync {
    /// Number of indexed rows
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of the indexed vectors
    fn dim(&self) -> usize;

    /// The `k` nearest rows, nearest first; ties are broken by row order.
    /// `k` larger than the index is clamped.
    fn query(&self, vector: &FeatureVector, k: usize) -> Result<Vec<Neighbor>>;
}

/// Brute-force cosine index: the encoded catalog matrix plus row norms
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexState {
    dim: usize,
    rows: usize,
    data: Vec<f32>,
    sq_norms: Vec<f64>,
}

impl IndexState {
    /// Build from an encoded matrix; the width is taken from the first row
    pub fn build(matrix: &[FeatureVector]) -> Result<Self> {
        let dim = matrix.first().map(FeatureVector::dim).unwrap_or(0);
        Self::build_with_dim(dim, matrix)
    }

    /// Build from an encoded matrix whose rows must all have width `dim`
    pub fn build_with_dim(dim: usize, matrix: &[FeatureVector]) -> Result<Self> {
        let mut data = Vec::with_capacity(dim * matrix.len());
        for vector in matrix {
            if vector.dim() != dim {
                return Err(Error::InvalidDimension {
                    expected: dim,
                    actual: vector.dim(),
                });
            }
            data.extend_from_slice(vector.as_slice());
        }

        let sq_norms: Vec<f64> = matrix.par_iter().map(FeatureVector::squared_norm).collect();

        tracing::info!(rows = matrix.len(), dim, "built cosine index");

        Ok(Self {
            dim,
            rows: matrix.len(),
            data,
            sq_norms,
        })
    }

    /// The stored vector of a row
    #[inline]
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.rows {
            return None;
        }
        Some(self.row_slice(row))
    }

    #[inline]
    fn row_slice(&self, row: usize) -> &[f32] {
        &self.data[row * self.dim..(row + 1) * self.dim]
    }

    /// Check internal consistency after deserialization
    pub fn validate(&self) -> Result<()> {
        if self.data.len() != self.rows * self.dim {
            return Err(Error::Persistence(format!(
                "corrupt index: {} values for {} rows of width {}",
                self.data.len(),
                self.rows,
                self.dim
            )));
        }
        if self.sq_norms.len() != self.rows {
            return Err(Error::Persistence(format!(
                "corrupt index: {} norms for {} rows",
                self.sq_norms.len(),
                self.rows
            )));
        }
        let recomputed = (0..self.rows).all(|row| squared_norm(self.row_slice(row)) == self.sq_norms[row]);
        if !recomputed {
            return Err(Error::Persistence("corrupt index: stale row norms".to_string()));
        }
        Ok(())
    }
}

impl NeighborSearch for IndexState {
    fn len(&self) -> usize {
        self.rows
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn query(&self, vector: &FeatureVector, k: usize) -> Result<Vec<Neighbor>> {
        let k = k.min(self.rows);
        if k == 0 {
            return Ok(Vec::new());
        }
        if vector.dim() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: vector.dim(),
            });
        }

        let query = vector.as_slice();
        let query_sq_norm = vector.squared_norm();

        // (distance, row) is a total order, so selection is deterministic
        let mut scored: Vec<(OrderedFloat<f64>, usize)> = (0..self.rows)
            .into_par_iter()
            .map(|row| {
                let similarity =
                    cosine_similarity(query, query_sq_norm, self.row_slice(row), self.sq_norms[row]);
                (OrderedFloat(cosine_distance_from_similarity(similarity)), row)
            })
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable(k - 1);
            scored.truncate(k);
        }
        scored.sort_unstable();

        Ok(scored
            .into_iter()
            .map(|(distance, row)| Neighbor {
                row,
                distance: distance.into_inner(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[f32]]) -> Vec<FeatureVector> {
        rows.iter().map(|r| FeatureVector::from_slice(r)).collect()
    }

    #[test]
    fn test_nearest_first() {
        let index = IndexState::build(&matrix(&[&[0.0, 1.0], &[1.0, 0.0], &[1.0, 1.0]])).unwrap();
        let results = index.query(&FeatureVector::new(vec![1.0, 0.1]), 3).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].row, 1);
        assert_eq!(results[1].row, 2);
        assert_eq!(results[2].row, 0);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_k_is_clamped() {
        let rows: Vec<FeatureVector> = (0..100)
            .map(|i| FeatureVector::new(vec![i as f32, 1.0, (i % 7) as f32]))
            .collect();
        let index = IndexState::build(&rows).unwrap();
        let results = index.query(&FeatureVector::new(vec![3.0, 1.0, 3.0]), 10_000_000).unwrap();

        assert_eq!(results.len(), 100);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_ties_broken_by_row_order() {
        let index = IndexState::build(&matrix(&[
            &[0.0, 1.0],
            &[1.0, 0.0],
            &[2.0, 0.0],
            &[0.5, 0.0],
        ]))
        .unwrap();
        let results = index.query(&FeatureVector::new(vec![1.0, 0.0]), 3).unwrap();

        let rows: Vec<usize> = results.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![1, 2, 3]);
        assert!(results.iter().all(|n| n.distance == 0.0));
    }

    #[test]
    fn test_self_match_similarity_is_one() {
        let rows = matrix(&[&[0.2, 0.4, 3.0, 0.0], &[1.0, 0.0, 0.0, 1.0]]);
        let index = IndexState::build(&rows).unwrap();
        let results = index.query(&rows[0], 1).unwrap();

        assert_eq!(results[0].row, 0);
        assert_eq!(results[0].similarity(), 1.0);
    }

    #[test]
    fn test_similarity_bounds() {
        let index = IndexState::build(&matrix(&[&[1.0, 0.0], &[-1.0, 0.0], &[0.0, 0.0]])).unwrap();
        for n in index.query(&FeatureVector::new(vec![1.0, 0.0]), 3).unwrap() {
            assert!((0.0..=2.0).contains(&n.distance));
            assert!((-1.0..=1.0).contains(&n.similarity()));
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = IndexState::build(&matrix(&[&[1.0, 0.0]])).unwrap();
        assert!(matches!(
            index.query(&FeatureVector::new(vec![1.0, 0.0, 0.0]), 1),
            Err(Error::InvalidDimension { expected: 2, actual: 3 })
        ));
        assert!(matches!(
            IndexState::build(&matrix(&[&[1.0, 0.0], &[1.0]])),
            Err(Error::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_empty_index() {
        let index = IndexState::build_with_dim(4, &[]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dim(), 4);
        assert!(index.query(&FeatureVector::new(vec![0.0; 4]), 5).unwrap().is_empty());
    }

    #[test]
    fn test_validate_detects_corruption() {
        let mut index = IndexState::build(&matrix(&[&[1.0, 2.0], &[3.0, 4.0]])).unwrap();
        assert!(index.validate().is_ok());
        index.data.pop();
        assert!(index.validate().is_err());
    }
}
