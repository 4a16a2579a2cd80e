use rayon::prelude::*;

use crate::io::Score;

const DEFAULT_SHRINKAGE: f64 = 100.0;
const DEFAULT_MIN_SUPPORT: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityOptions {
    /// Shrinks similarities computed over few common ratings towards zero.
    pub shrinkage: f64,
    /// Minimum number of common ratings for a non-zero similarity.
    pub min_support: usize,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        SimilarityOptions {
            shrinkage: DEFAULT_SHRINKAGE,
            min_support: DEFAULT_MIN_SUPPORT,
        }
    }
}

/// Dense symmetric `n x n` similarity matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.values[a * self.n + b]
    }

    pub fn row(&self, a: usize) -> &[f64] {
        &self.values[a * self.n..(a + 1) * self.n]
    }
}

/// Pearson correlation of the residuals left after subtracting the baseline estimates.
///
/// `x_ratings` lists the `(y, rating)` pairs of each entity on the similarity axis and
/// `y_ratings` the `(x, rating)` pairs of each entity on the other axis. Every row is computed
/// independently, so rows are filled in parallel.
pub fn pearson_baseline(
    x_ratings: &[Vec<(usize, Score)>],
    y_ratings: &[Vec<(usize, Score)>],
    global_mean: Score,
    x_biases: &[Score],
    y_biases: &[Score],
    options: &SimilarityOptions,
) -> SimilarityMatrix {
    let n = x_ratings.len();
    let mut values = vec![0.0; n * n];
    if n == 0 {
        return SimilarityMatrix { n, values };
    }

    values.par_chunks_mut(n).enumerate().for_each(|(xi, row)| {
        let mut freq = vec![0_usize; n];
        let mut prods = vec![0.0; n];
        let mut sq_diff_i = vec![0.0; n];
        let mut sq_diff_j = vec![0.0; n];

        for (y, r_i) in x_ratings[xi].iter() {
            let partial_bias = global_mean + y_biases[*y];
            let diff_i = r_i - (partial_bias + x_biases[xi]);
            for (xj, r_j) in y_ratings[*y].iter() {
                let diff_j = r_j - (partial_bias + x_biases[*xj]);
                freq[*xj] += 1;
                prods[*xj] += diff_i * diff_j;
                sq_diff_i[*xj] += diff_i * diff_i;
                sq_diff_j[*xj] += diff_j * diff_j;
            }
        }

        for xj in 0..n {
            row[xj] = if xj == xi {
                1.0
            } else if freq[xj] < options.min_support || freq[xj] == 0 {
                0.0
            } else {
                let denominator = (sq_diff_i[xj] * sq_diff_j[xj]).sqrt();
                let support = (freq[xj] - 1) as f64;
                if denominator == 0.0 || support + options.shrinkage == 0.0 {
                    0.0
                } else {
                    prods[xj] / denominator * support / (support + options.shrinkage)
                }
            };
        }
    });

    SimilarityMatrix { n, values }
}
