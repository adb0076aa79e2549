//! PCA — Principal Component Analysis
//!
//! Computes the top-k eigenvectors of the training covariance matrix using
//! power iteration with deflation, then projects any matrix with the same
//! column schema onto them. The reducer is fit on training data only and the
//! identical projection is reused for test data.

use super::imputer::{ImputeStrategy, Imputer};
use crate::data::{is_missing, FeatureMatrix, ModalitySplit};
use crate::error::{FusionError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// PCA configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Whether to scale features to unit variance after centering
    pub scale: bool,
    /// Random seed for power iteration initialization
    pub random_state: u64,
    /// Maximum power iterations per component
    pub max_iter: usize,
    /// Convergence tolerance on the eigenvector update
    pub tol: f64,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            scale: false,
            random_state: 42,
            max_iter: 300,
            tol: 1e-10,
        }
    }
}

/// Fitted projection state
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PcaState {
    means: Array1<f64>,
    stds: Array1<f64>,
    /// n_components x n_features, rows are unit-norm and mutually orthogonal
    components: Array2<f64>,
    eigenvalues: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
}

/// PCA dimensionality reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pca {
    config: PcaConfig,
    state: Option<PcaState>,
}

impl Default for Pca {
    fn default() -> Self {
        Self::new(PcaConfig::default())
    }
}

impl Pca {
    /// Create a new PCA instance
    pub fn new(config: PcaConfig) -> Self {
        Self { config, state: None }
    }

    /// Fit `n_components` directions on an already imputed training matrix
    pub fn fit(&mut self, x: &Array2<f64>, n_components: usize) -> Result<&mut Self> {
        let (n, d) = x.dim();
        if n < 2 {
            return Err(FusionError::InvalidInput(
                "PCA requires at least 2 samples".to_string(),
            ));
        }
        if n_components == 0 || n_components > n.min(d) {
            return Err(FusionError::InvalidParameter {
                name: "n_components".to_string(),
                value: n_components.to_string(),
                reason: format!("must be between 1 and min(n_samples, n_features) = {}", n.min(d)),
            });
        }
        if x.iter().any(|v| is_missing(*v)) {
            return Err(FusionError::InvalidInput(
                "PCA input contains missing values; impute first".to_string(),
            ));
        }

        let means = x.mean_axis(Axis(0)).ok_or_else(|| {
            FusionError::ComputationError("failed to compute column means".to_string())
        })?;
        let stds = if self.config.scale {
            x.std_axis(Axis(0), 0.0).mapv(|s| s.max(1e-12))
        } else {
            Array1::ones(d)
        };

        let centered = (x - &means) / &stds;
        let cov = centered.t().dot(&centered) / (n as f64 - 1.0);

        let (eigenvalues, components) = self.power_iteration(&cov, n_components);

        let full_variance = cov.diag().sum().max(1e-12);
        let explained_variance_ratio = eigenvalues
            .iter()
            .map(|&ev| (ev / full_variance).max(0.0))
            .collect();

        debug!(
            n_samples = n,
            n_features = d,
            n_components,
            "Fitted PCA projection"
        );

        self.state = Some(PcaState {
            means,
            stds,
            components,
            eigenvalues,
            explained_variance_ratio,
        });
        Ok(self)
    }

    /// Project a matrix onto the fitted components
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let state = self.state.as_ref().ok_or(FusionError::ModelNotFitted)?;

        if x.ncols() != state.means.len() {
            return Err(FusionError::SchemaMismatch {
                expected: format!("{} columns", state.means.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let centered = (x - &state.means) / &state.stds;
        Ok(centered.dot(&state.components.t()))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>, n_components: usize) -> Result<Array2<f64>> {
        self.fit(x, n_components)?;
        self.transform(x)
    }

    /// Explained variance ratio per component
    pub fn explained_variance_ratio(&self) -> Option<&[f64]> {
        self.state
            .as_ref()
            .map(|s| s.explained_variance_ratio.as_slice())
    }

    /// Raw variance per component
    pub fn eigenvalues(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.eigenvalues.as_slice())
    }

    pub fn n_components(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.components.nrows())
    }

    /// Power iteration with deflation to extract top-k eigenvectors.
    fn power_iteration(&self, cov: &Array2<f64>, k: usize) -> (Vec<f64>, Array2<f64>) {
        let d = cov.nrows();
        let mut eigenvalues = Vec::with_capacity(k);
        let mut components = Array2::zeros((k, d));

        let mut work = cov.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);

        for c in 0..k {
            let mut v: Array1<f64> = (0..d).map(|_| rng.gen_range(-1.0..1.0)).collect();
            orthogonalize(&mut v, &components, c);
            normalize(&mut v);

            let mut eigenvalue = 0.0f64;

            for _ in 0..self.config.max_iter {
                let mut w = work.dot(&v);
                eigenvalue = v.dot(&w);

                orthogonalize(&mut w, &components, c);
                if w.dot(&w).sqrt() < 1e-12 {
                    // Remaining variance is exhausted; keep the orthogonal start vector
                    break;
                }
                normalize(&mut w);

                let diff = (&w - &v).mapv(|x| x * x).sum().sqrt();
                v = w;
                if diff < self.config.tol {
                    break;
                }
            }

            // Deterministic sign: largest-magnitude loading is positive
            let pivot = v
                .iter()
                .copied()
                .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
            if pivot < 0.0 {
                v.mapv_inplace(|x| -x);
            }

            let eigenvalue = eigenvalue.max(0.0);
            eigenvalues.push(eigenvalue);
            components.row_mut(c).assign(&v);

            // Deflate: A = A - eigenvalue * v * v^T
            for i in 0..d {
                for j in 0..d {
                    work[[i, j]] -= eigenvalue * v[i] * v[j];
                }
            }
        }

        (eigenvalues, components)
    }
}

fn orthogonalize(v: &mut Array1<f64>, basis: &Array2<f64>, n_rows: usize) {
    for r in 0..n_rows {
        let b = basis.row(r);
        let proj = v.dot(&b);
        v.scaled_add(-proj, &b);
    }
}

fn normalize(v: &mut Array1<f64>) {
    let norm = v.dot(v).sqrt().max(1e-12);
    v.mapv_inplace(|x| x / norm);
}

/// Impute (fit on train) and reduce both splits with one train-fitted PCA
pub fn reduce_split(
    split: &ModalitySplit,
    n_components: usize,
    strategy: ImputeStrategy,
    config: PcaConfig,
) -> Result<(FeatureMatrix, FeatureMatrix, Pca)> {
    let mut imputer = Imputer::new(strategy);
    imputer.fit_matrix(&split.train)?;
    let train = imputer.transform_matrix(&split.train)?;
    let test = imputer.transform_matrix(&split.test)?;

    let mut pca = Pca::new(config);
    let train_pca = pca.fit_transform(train.values(), n_components)?;
    let test_pca = pca.transform(test.values())?;

    let names: Vec<String> = (0..n_components).map(|i| format!("pc{}", i + 1)).collect();
    Ok((
        FeatureMatrix::new(names.clone(), train_pca)?,
        FeatureMatrix::new(names, test_pca)?,
        pca,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_pca_output_shape() {
        let train = array![
            [1.0, 2.0, 0.5],
            [2.0, 4.1, 0.3],
            [3.0, 6.2, 0.8],
            [4.0, 7.9, 0.4],
            [5.0, 10.0, 0.6],
        ];
        let test = array![[1.5, 3.0, 0.5], [4.5, 9.0, 0.7]];

        let mut pca = Pca::default();
        let train_out = pca.fit_transform(&train, 2).unwrap();
        let test_out = pca.transform(&test).unwrap();

        assert_eq!(train_out.dim(), (5, 2));
        assert_eq!(test_out.dim(), (2, 2));
    }

    #[test]
    fn test_pca_first_component_dominates_linear_data() {
        let data = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0], [5.0, 10.0]];
        let mut pca = Pca::default();
        pca.fit(&data, 1).unwrap();
        let ratio = pca.explained_variance_ratio().unwrap()[0];
        assert!(ratio > 0.99, "First component should explain >99% variance, got {}", ratio);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let data = array![
            [1.0, 0.0, 0.5],
            [0.0, 1.0, 0.3],
            [1.0, 1.0, 0.8],
            [0.5, 0.5, 0.4],
            [0.2, 0.8, 0.6],
        ];
        let mut pca = Pca::default();
        pca.fit(&data, 2).unwrap();
        let a = pca.transform(&data).unwrap();
        let b = pca.transform(&data).unwrap();
        assert!(a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
    }

    #[test]
    fn test_components_are_orthonormal() {
        let data = array![
            [2.5, 2.4, 1.0],
            [0.5, 0.7, 0.2],
            [2.2, 2.9, 1.1],
            [1.9, 2.2, 0.9],
            [3.1, 3.0, 1.4],
            [2.3, 2.7, 0.8],
        ];
        let mut pca = Pca::default();
        pca.fit(&data, 2).unwrap();
        let comps = &pca.state.as_ref().unwrap().components;
        let gram = comps.dot(&comps.t());
        assert!((gram[[0, 0]] - 1.0).abs() < 1e-6);
        assert!((gram[[1, 1]] - 1.0).abs() < 1e-6);
        assert!(gram[[0, 1]].abs() < 1e-6);
    }

    #[test]
    fn test_too_many_components() {
        let data = array![[1.0, 2.0], [2.0, 3.0], [3.0, 5.0]];
        let mut pca = Pca::default();
        assert!(matches!(
            pca.fit(&data, 3),
            Err(FusionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_transform_before_fit_and_schema() {
        let pca = Pca::default();
        assert!(matches!(
            pca.transform(&array![[1.0]]),
            Err(FusionError::ModelNotFitted)
        ));

        let mut pca = Pca::default();
        pca.fit(&array![[1.0, 2.0], [2.0, 1.0], [0.0, 0.5]], 1).unwrap();
        assert!(matches!(
            pca.transform(&array![[1.0, 2.0, 3.0]]),
            Err(FusionError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_reduce_split_fits_on_train_only() {
        let train = FeatureMatrix::from_array(array![
            [1.0, f64::NAN, 3.0],
            [2.0, 1.0, 2.0],
            [3.0, 2.0, 1.0],
            [4.0, 3.0, 0.0],
        ]);
        let test = FeatureMatrix::from_array(array![[f64::NAN, 0.5, 1.0]]);
        let split = ModalitySplit::new("audio", train, test).unwrap();

        let (train_out, test_out, pca) =
            reduce_split(&split, 2, ImputeStrategy::Mean, PcaConfig::default()).unwrap();
        assert_eq!(train_out.names(), &["pc1".to_string(), "pc2".to_string()]);
        assert_eq!(train_out.ncols(), 2);
        assert_eq!(test_out.ncols(), 2);
        assert_eq!(pca.n_components(), Some(2));
        assert!(test_out.values().iter().all(|v| v.is_finite()));
    }
}
