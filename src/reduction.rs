use rayon::prelude::*;

use crate::correspondence::CorrespondenceSet;

/// Partial result of a reduction over a correspondence set.
///
/// `merge` must be associative and `Default` must be its identity, so partial
/// results computed over disjoint slices can be combined in any tree shape.
pub trait Accumulator: Default + Send {
    fn merge(self, other: Self) -> Self;
}

/// Maps every correspondence into an accumulator and merges the partial results.
///
/// Each worker folds a disjoint slice of at least `min_chunk_len` pairs into its
/// own accumulator; the inputs are only read.
///
/// # Arguments
///
/// * `correspondences` - The pairs to visit.
/// * `min_chunk_len` - Minimum number of pairs handled by one worker.
/// * `accumulate` - Adds the contribution of the pair `(source_index, target_index)`.
pub fn reduce_correspondences<A, F>(
    correspondences: &CorrespondenceSet,
    min_chunk_len: usize,
    accumulate: F,
) -> A
where
    A: Accumulator,
    F: Fn(&mut A, usize, usize) + Sync + Send,
{
    correspondences
        .as_slice()
        .par_iter()
        .with_min_len(min_chunk_len.max(1))
        .fold(A::default, |mut acc, &(source_index, target_index)| {
            accumulate(&mut acc, source_index, target_index);
            acc
        })
        .reduce(A::default, A::merge)
}

/// Sum of squared residuals and their count.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredResidualSum {
    pub sum: f64,
    pub count: usize,
}

impl SquaredResidualSum {
    pub fn add(&mut self, squared_residual: f64) {
        self.sum += squared_residual;
        self.count += 1;
    }

    /// Root of the mean squared residual. `None` when nothing was accumulated.
    pub fn rmse(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some((self.sum / self.count as f64).sqrt())
    }
}

impl Accumulator for SquaredResidualSum {
    fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            count: self.count + other.count,
        }
    }
}
