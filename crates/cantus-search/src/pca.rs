//! Principal component analysis by randomized truncated SVD.
//!
//! The data matrix is mean-centered, its range is sampled with a seeded
//! Gaussian test matrix refined by a few power iterations, and a small dense
//! SVD of the projected block yields the leading singular triplets. Signs
//! are fixed so that the largest-magnitude entry of every component is
//! positive, which makes fits reproducible for a given seed.

use cantus_core::model::FeatureMatrix;
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_pcg::Pcg64;

use crate::error::{PcaError, PcaResult};

/// Extra random directions sampled beyond the requested rank.
pub const OVERSAMPLES: usize = 10;

const SVD_MAX_ITERATIONS: usize = 10_000;

/// Fits [`PcaModel`]s. The seed drives the Gaussian test matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcaEngine {
    seed: u64,
}

impl PcaEngine {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Fit `k` principal components to the rows of `data`.
    pub fn fit(&self, data: &FeatureMatrix, k: usize) -> PcaResult<PcaModel> {
        let (rows, cols) = (data.n_rows(), data.n_cols());
        if k == 0 || k > rows.min(cols) {
            return Err(PcaError::DimensionMismatch {
                requested: k,
                rows,
                cols,
            });
        }

        let x = DMatrix::from_row_slice(rows, cols, data.as_slice());
        let mean = DMatrix::from_fn(1, cols, |_, j| x.column(j).mean());
        let centered = DMatrix::from_fn(rows, cols, |i, j| x[(i, j)] - mean[(0, j)]);

        let scale = x.amax().max(1.0);
        if centered.amax() <= scale * 1e-12 {
            return Err(PcaError::DegenerateInput);
        }

        let (u, singular_values, components) = self.randomized_svd(&centered, k)?;
        let (mut embedding, components) = flip_signs(u, components);
        for (mut column, &s) in embedding.column_iter_mut().zip(&singular_values) {
            column *= s;
        }

        let mean_projection = (&mean * components.transpose()).iter().copied().collect();
        log::debug!(
            "Fitted {} components to a {}x{} matrix",
            k,
            rows,
            cols
        );

        Ok(PcaModel {
            components,
            mean,
            mean_projection,
            singular_values,
            embedding,
        })
    }

    /// Leading `k` singular triplets of `a` as `(U, s, Vt)`.
    fn randomized_svd(
        &self,
        a: &DMatrix<f64>,
        k: usize,
    ) -> PcaResult<(DMatrix<f64>, Vec<f64>, DMatrix<f64>)> {
        let (rows, cols) = a.shape();
        let transpose = rows < cols;
        let a = if transpose { a.transpose() } else { a.clone() };
        let (m, n) = a.shape();

        let width = (k + OVERSAMPLES).min(n);
        let n_iter = if k * 10 < rows.min(cols) { 7 } else { 4 };

        let mut rng = Pcg64::seed_from_u64(self.seed);
        let mut q = DMatrix::from_fn(n, width, |_, _| rng.sample::<f64, _>(StandardNormal));
        for _ in 0..n_iter {
            q = orthonormalize(&a * &q);
            q = orthonormalize(a.tr_mul(&q));
        }
        let q = orthonormalize(&a * &q);

        let b = q.tr_mul(&a);
        let svd = b
            .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
            .ok_or(PcaError::NoConvergence)?;
        let u_hat = svd.u.ok_or(PcaError::NoConvergence)?;
        let v_t = svd.v_t.ok_or(PcaError::NoConvergence)?;
        let values = svd.singular_values;

        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&i, &j| values[j].total_cmp(&values[i]));
        let top = &order[..k];

        let lifted = &q * u_hat;
        let u_k = DMatrix::from_fn(m, k, |r, c| lifted[(r, top[c])]);
        let v_t_k = DMatrix::from_fn(k, n, |r, c| v_t[(top[r], c)]);
        let s = top.iter().map(|&i| values[i]).collect();

        if transpose {
            Ok((v_t_k.transpose(), s, u_k.transpose()))
        } else {
            Ok((u_k, s, v_t_k))
        }
    }
}

fn orthonormalize(m: DMatrix<f64>) -> DMatrix<f64> {
    m.qr().q()
}

/// Make the largest-magnitude entry of each row of `v_t` positive, flipping
/// the matching column of `u` along with it.
fn flip_signs(mut u: DMatrix<f64>, mut v_t: DMatrix<f64>) -> (DMatrix<f64>, DMatrix<f64>) {
    for i in 0..v_t.nrows() {
        let pivot = v_t
            .row(i)
            .iter()
            .copied()
            .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
        if pivot < 0.0 {
            v_t.row_mut(i).neg_mut();
            u.column_mut(i).neg_mut();
        }
    }
    (u, v_t)
}

/// A fitted principal component basis. Immutable once fit.
#[derive(Debug, Clone)]
pub struct PcaModel {
    /// `k x n_features`, orthonormal rows.
    components: DMatrix<f64>,
    /// `1 x n_features` column means of the training data.
    mean: DMatrix<f64>,
    mean_projection: Vec<f64>,
    singular_values: Vec<f64>,
    /// `n_samples x k` training rows in component coordinates.
    embedding: DMatrix<f64>,
}

impl PcaModel {
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.components.ncols()
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.embedding.nrows()
    }

    #[must_use]
    pub const fn components(&self) -> &DMatrix<f64> {
        &self.components
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        self.mean.as_slice()
    }

    /// Singular values in descending order.
    #[must_use]
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    #[must_use]
    pub const fn embedding(&self) -> &DMatrix<f64> {
        &self.embedding
    }

    /// Embedded coordinates of training row `i`.
    #[must_use]
    pub fn embedded_row(&self, i: usize) -> Vec<f64> {
        self.embedding.row(i).iter().copied().collect()
    }

    /// Project a raw feature vector: `x * Vt' - mean * Vt'`.
    pub fn project(&self, x: &[f64]) -> PcaResult<Vec<f64>> {
        let n = self.n_features();
        if x.len() != n {
            return Err(PcaError::ShapeMismatch {
                expected: n,
                actual: x.len(),
            });
        }
        let row = DMatrix::from_row_slice(1, n, x);
        let projected = row * self.components.transpose();
        Ok(projected
            .iter()
            .zip(&self.mean_projection)
            .map(|(p, m)| p - m)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> FeatureMatrix {
        let data = (0..rows)
            .flat_map(|i| (0..cols).map(move |j| (i, j)))
            .map(|(i, j)| f(i, j))
            .collect();
        FeatureMatrix::from_row_major(rows, cols, data).unwrap()
    }

    fn noisy(rows: usize, cols: usize) -> FeatureMatrix {
        matrix(rows, cols, |i, j| {
            let (i, j) = (i as f64, j as f64);
            (i * 0.7 + j * 1.3).sin() * 10.0 + ((i * j) % 7.0) + j * 0.5
        })
    }

    /// Rank two after centering.
    fn low_rank(rows: usize, cols: usize) -> FeatureMatrix {
        matrix(rows, cols, |i, j| {
            let p = (j as f64 * 0.9).cos();
            let q = j as f64 - 3.0;
            i as f64 * p + ((i * i) % 5) as f64 * q + 3.0
        })
    }

    fn assert_orthonormal_rows(m: &DMatrix<f64>) {
        let gram = m * m.transpose();
        for i in 0..gram.nrows() {
            for j in 0..gram.ncols() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (gram[(i, j)] - expected).abs() < 1e-6,
                    "gram[{i},{j}] = {}",
                    gram[(i, j)]
                );
            }
        }
    }

    #[test]
    fn test_components_are_orthonormal() {
        let model = PcaEngine::new(0).fit(&noisy(30, 20), 5).unwrap();
        assert_eq!(model.n_components(), 5);
        assert_eq!(model.n_features(), 20);
        assert_eq!(model.embedding().shape(), (30, 5));
        assert_orthonormal_rows(model.components());
    }

    #[test]
    fn test_wide_matrix_is_handled_transposed() {
        let model = PcaEngine::new(3).fit(&noisy(6, 40), 3).unwrap();
        assert_eq!(model.components().shape(), (3, 40));
        assert_eq!(model.embedding().shape(), (6, 3));
        assert_orthonormal_rows(model.components());
    }

    #[test]
    fn test_singular_values_descend() {
        let model = PcaEngine::new(0).fit(&noisy(25, 12), 6).unwrap();
        for pair in model.singular_values().windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn test_fit_is_deterministic_for_a_seed() {
        let data = noisy(20, 15);
        let a = PcaEngine::new(42).fit(&data, 4).unwrap();
        let b = PcaEngine::new(42).fit(&data, 4).unwrap();
        assert_eq!(a.components(), b.components());
        assert_eq!(a.embedding(), b.embedding());
    }

    #[test]
    fn test_sign_convention() {
        let model = PcaEngine::new(7).fit(&noisy(20, 10), 4).unwrap();
        for row in model.components().row_iter() {
            let pivot = row
                .iter()
                .copied()
                .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
            assert!(pivot > 0.0);
        }
    }

    #[test]
    fn test_projection_matches_embedding_for_low_rank_data() {
        let data = low_rank(12, 8);
        let model = PcaEngine::new(0).fit(&data, 2).unwrap();
        for i in 0..data.n_rows() {
            let projected = model.project(data.row(i)).unwrap();
            let embedded = model.embedded_row(i);
            for (p, e) in projected.iter().zip(&embedded) {
                assert!((p - e).abs() < 1e-8, "row {i}: {p} vs {e}");
            }
        }
    }

    #[test]
    fn test_mean_projects_to_origin() {
        let data = noisy(10, 6);
        let model = PcaEngine::new(0).fit(&data, 3).unwrap();
        let origin = model.project(model.mean()).unwrap();
        assert!(origin.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_dimension_mismatch() {
        let data = noisy(5, 4);
        assert!(matches!(
            PcaEngine::new(0).fit(&data, 0),
            Err(PcaError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            PcaEngine::new(0).fit(&data, 5),
            Err(PcaError::DimensionMismatch {
                requested: 5,
                rows: 5,
                cols: 4
            })
        ));
    }

    #[test]
    fn test_constant_matrix_is_degenerate() {
        let data = matrix(6, 4, |_, _| 0.1);
        assert!(matches!(
            PcaEngine::new(0).fit(&data, 2),
            Err(PcaError::DegenerateInput)
        ));
    }

    #[test]
    fn test_project_rejects_wrong_length() {
        let model = PcaEngine::new(0).fit(&noisy(8, 5), 2).unwrap();
        assert!(matches!(
            model.project(&[1.0, 2.0]),
            Err(PcaError::ShapeMismatch {
                expected: 5,
                actual: 2
            })
        ));
    }
}
