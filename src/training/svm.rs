//! Support Vector Machine implementations
//!
//! Provides a binary SVM classifier trained with SMO (Sequential Minimal
//! Optimization), optionally with balanced per-class penalties, and an
//! epsilon-insensitive SVM regressor trained by dual coordinate descent.

use super::Model;
use crate::data::check_alignment;
use crate::error::{FusionError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training will return an error to prevent OOM.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel coefficient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// 1 / n_features
    Auto,
    /// 1 / (n_features * var(X))
    Scale,
    /// Fixed value
    Value(f64),
}

impl Gamma {
    fn resolve(&self, x: &Array2<f64>) -> f64 {
        let n_features = x.ncols().max(1) as f64;
        match self {
            Gamma::Auto => 1.0 / n_features,
            Gamma::Scale => {
                let var = x.var(0.0);
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
            Gamma::Value(g) => *g,
        }
    }
}

/// Kernel function type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Linear kernel: K(x, y) = x · y
    Linear,
    /// Polynomial kernel: K(x, y) = (γ * x · y + r)^d
    Polynomial { degree: u32, gamma: Gamma, coef0: f64 },
    /// Radial Basis Function (Gaussian): K(x, y) = exp(-γ * ||x - y||²)
    RBF { gamma: Gamma },
    /// Sigmoid kernel: K(x, y) = tanh(γ * x · y + r)
    Sigmoid { gamma: Gamma, coef0: f64 },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::RBF { gamma: Gamma::Auto }
    }
}

impl KernelType {
    /// Fix data-dependent coefficients against the training matrix
    fn resolve(&self, x: &Array2<f64>) -> Kernel {
        match self {
            KernelType::Linear => Kernel::Linear,
            KernelType::Polynomial { degree, gamma, coef0 } => Kernel::Polynomial {
                degree: (*degree).min(i32::MAX as u32) as i32,
                gamma: gamma.resolve(x),
                coef0: *coef0,
            },
            KernelType::RBF { gamma } => Kernel::Rbf {
                gamma: gamma.resolve(x),
            },
            KernelType::Sigmoid { gamma, coef0 } => Kernel::Sigmoid {
                gamma: gamma.resolve(x),
                coef0: *coef0,
            },
        }
    }
}

/// Kernel with concrete coefficients, stored with the fitted model
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum Kernel {
    Linear,
    Polynomial { degree: i32, gamma: f64, coef0: f64 },
    Rbf { gamma: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    fn eval(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match *self {
            Kernel::Linear => a.dot(&b),
            Kernel::Polynomial { degree, gamma, coef0 } => (gamma * a.dot(&b) + coef0).powi(degree),
            Kernel::Rbf { gamma } => {
                let norm_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
                (-gamma * norm_sq).exp()
            }
            Kernel::Sigmoid { gamma, coef0 } => (gamma * a.dot(&b) + coef0).tanh(),
        }
    }

    /// Compute kernel matrix (parallelized for large datasets)
    fn matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));

        // For small matrices, sequential is faster due to overhead
        if n < 100 {
            for i in 0..n {
                for j in i..n {
                    let val = self.eval(x.row(i), x.row(j));
                    k[[i, j]] = val;
                    k[[j, i]] = val;
                }
            }
            return k;
        }

        // Parallel: compute upper triangle rows in parallel
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| (i..n).map(|j| self.eval(x.row(i), x.row(j))).collect())
            .collect();

        for (i, row_vals) in rows.into_iter().enumerate() {
            for (offset, val) in row_vals.into_iter().enumerate() {
                let j = i + offset;
                k[[i, j]] = val;
                k[[j, i]] = val;
            }
        }
        k
    }
}

/// Per-class penalty weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassWeight {
    /// Every class uses C unchanged
    #[default]
    None,
    /// Class c uses C * n_samples / (n_classes * n_c), up-weighting the minority
    Balanced,
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// Kernel function
    pub kernel: KernelType,
    /// Tolerance for stopping criterion
    pub tol: f64,
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Random seed
    pub random_state: Option<u64>,
    /// Epsilon for regression (SVR tube width)
    pub epsilon: f64,
    /// Class weighting (classification only)
    pub class_weight: ClassWeight,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::default(),
            tol: 1e-3,
            max_iter: 1000,
            random_state: Some(42),
            epsilon: 0.1,
            class_weight: ClassWeight::None,
        }
    }
}

impl SVMConfig {
    /// Default configuration with balanced class weights
    pub fn balanced() -> Self {
        Self {
            class_weight: ClassWeight::Balanced,
            ..Default::default()
        }
    }

    /// Set the regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set the kernel
    pub fn with_kernel(mut self, kernel: KernelType) -> Self {
        self.kernel = kernel;
        self
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(FusionError::InvalidParameter {
                name: "c".to_string(),
                value: self.c.to_string(),
                reason: "must be positive and finite".to_string(),
            });
        }
        if self.epsilon < 0.0 {
            return Err(FusionError::InvalidParameter {
                name: "epsilon".to_string(),
                value: self.epsilon.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

fn check_training_input(x: &Array2<f64>, y: &Array1<f64>, config: &SVMConfig) -> Result<()> {
    config.validate()?;
    check_alignment(x.nrows(), y)?;
    let n = x.nrows();
    if n == 0 {
        return Err(FusionError::InvalidInput("no training samples".to_string()));
    }
    if n > MAX_KERNEL_MATRIX_SAMPLES {
        return Err(FusionError::InvalidInput(format!(
            "Dataset has {} samples, exceeding the maximum {} for the SVM kernel matrix. \
             Consider subsampling or reducing dimensionality.",
            n, MAX_KERNEL_MATRIX_SAMPLES
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(FusionError::InvalidInput(
            "SVM input contains missing or non-finite values; impute first".to_string(),
        ));
    }
    Ok(())
}

/// Fitted support vectors and decision parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SupportSet {
    kernel: Kernel,
    support_vectors: Array2<f64>,
    /// Signed dual coefficients (alpha * y for SVC, beta for SVR)
    coefs: Array1<f64>,
    bias: f64,
    n_features: usize,
}

impl SupportSet {
    fn from_indices(kernel: Kernel, x: &Array2<f64>, coefs: &Array1<f64>, bias: f64) -> Self {
        let support_indices: Vec<usize> = coefs
            .iter()
            .enumerate()
            .filter(|(_, &a)| a.abs() > 1e-8)
            .map(|(i, _)| i)
            .collect();

        Self {
            kernel,
            support_vectors: x.select(ndarray::Axis(0), &support_indices),
            coefs: support_indices.iter().map(|&i| coefs[i]).collect(),
            bias,
            n_features: x.ncols(),
        }
    }

    fn decision(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.n_features {
            return Err(FusionError::SchemaMismatch {
                expected: format!("{} columns", self.n_features),
                actual: format!("{} columns", x.ncols()),
            });
        }
        let scores = x
            .rows()
            .into_iter()
            .map(|sample| {
                self.support_vectors
                    .rows()
                    .into_iter()
                    .zip(self.coefs.iter())
                    .fold(self.bias, |acc, (sv, &coef)| {
                        acc + coef * self.kernel.eval(sample, sv)
                    })
            })
            .collect();
        Ok(scores)
    }
}

/// Support Vector Classifier (binary)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMClassifier {
    config: SVMConfig,
    /// Sorted class labels; classes[1] is the positive side of the margin
    classes: Vec<f64>,
    fitted: Option<SupportSet>,
}

impl SVMClassifier {
    /// Create a new SVM classifier
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            fitted: None,
        }
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }

    /// Get number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.fitted
            .as_ref()
            .map(|s| s.support_vectors.nrows())
            .unwrap_or(0)
    }

    /// Signed distance to the margin; positive means classes[1]
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fitted
            .as_ref()
            .ok_or(FusionError::ModelNotFitted)?
            .decision(x)
    }

    /// Per-sample penalty bound after class weighting
    fn sample_bounds(&self, y_signed: &Array1<f64>) -> Array1<f64> {
        let n = y_signed.len() as f64;
        let n_pos = y_signed.iter().filter(|&&v| v > 0.0).count() as f64;
        let n_neg = n - n_pos;
        let (w_pos, w_neg) = match self.config.class_weight {
            ClassWeight::None => (1.0, 1.0),
            ClassWeight::Balanced => (n / (2.0 * n_pos), n / (2.0 * n_neg)),
        };
        y_signed.mapv(|v| self.config.c * if v > 0.0 { w_pos } else { w_neg })
    }

    /// SMO training algorithm
    fn smo_train(&self, k: &Array2<f64>, y: &Array1<f64>) -> (Array1<f64>, f64) {
        let n = y.len();
        let bounds = self.sample_bounds(y);
        let tol = self.config.tol;

        let mut alphas: Array1<f64> = Array1::zeros(n);
        let mut bias = 0.0;

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let decision = |alphas: &Array1<f64>, bias: f64, idx: usize| -> f64 {
            let mut sum = bias;
            for i in 0..n {
                sum += alphas[i] * y[i] * k[[i, idx]];
            }
            sum
        };

        let mut passes = 0;
        let max_passes = 5;
        let mut total_iter = 0;

        while n > 1 && passes < max_passes && total_iter < self.config.max_iter {
            let mut num_changed = 0;

            for i in 0..n {
                let e_i = decision(&alphas, bias, i) - y[i];
                let c_i = bounds[i];

                // Check KKT conditions
                if !((y[i] * e_i < -tol && alphas[i] < c_i) || (y[i] * e_i > tol && alphas[i] > 0.0)) {
                    continue;
                }

                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };
                let c_j = bounds[j];
                let e_j = decision(&alphas, bias, j) - y[j];

                let alpha_i_old = alphas[i];
                let alpha_j_old = alphas[j];

                // Bounds for alpha_j along the constraint line
                let (l, h) = if y[i] != y[j] {
                    (
                        (alpha_j_old - alpha_i_old).max(0.0),
                        (c_i + alpha_j_old - alpha_i_old).min(c_j),
                    )
                } else {
                    (
                        (alpha_i_old + alpha_j_old - c_i).max(0.0),
                        (alpha_i_old + alpha_j_old).min(c_j),
                    )
                };

                if h - l < 1e-10 {
                    continue;
                }

                let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                alphas[j] = (alpha_j_old - y[j] * (e_i - e_j) / eta).clamp(l, h);
                if (alphas[j] - alpha_j_old).abs() < 1e-5 {
                    continue;
                }
                alphas[i] = alpha_i_old + y[i] * y[j] * (alpha_j_old - alphas[j]);

                let b1 = bias
                    - e_i
                    - y[i] * (alphas[i] - alpha_i_old) * k[[i, i]]
                    - y[j] * (alphas[j] - alpha_j_old) * k[[i, j]];
                let b2 = bias
                    - e_j
                    - y[i] * (alphas[i] - alpha_i_old) * k[[i, j]]
                    - y[j] * (alphas[j] - alpha_j_old) * k[[j, j]];

                bias = if alphas[i] > 0.0 && alphas[i] < c_i {
                    b1
                } else if alphas[j] > 0.0 && alphas[j] < c_j {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                num_changed += 1;
            }

            total_iter += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        debug!(iterations = total_iter, "SMO finished");
        (alphas, bias)
    }
}

impl Model for SVMClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_input(x, y, &self.config)?;

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(|a, b| a.total_cmp(b));
        classes.dedup();

        match classes.len() {
            1 => {
                return Err(FusionError::DegenerateClass {
                    label: classes[0],
                    n_samples: y.len(),
                })
            }
            2 => {}
            n => {
                return Err(FusionError::InvalidInput(format!(
                    "SVM classifier is binary, got {} distinct labels",
                    n
                )))
            }
        }

        let y_signed = y.mapv(|v| if v == classes[1] { 1.0 } else { -1.0 });
        let kernel = self.config.kernel.resolve(x);
        let k = kernel.matrix(x);
        let (alphas, bias) = self.smo_train(&k, &y_signed);

        let coefs = &alphas * &y_signed;
        self.fitted = Some(SupportSet::from_indices(kernel, x, &coefs, bias));
        self.classes = classes;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_function(x)?;
        let (neg, pos) = (self.classes[0], self.classes[1]);
        Ok(scores.mapv(|s| if s >= 0.0 { pos } else { neg }))
    }

    fn name(&self) -> &'static str {
        "svm_classifier"
    }
}

/// Support Vector Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMRegressor {
    config: SVMConfig,
    fitted: Option<SupportSet>,
}

impl SVMRegressor {
    /// Create a new SVM regressor
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }

    /// Get number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.fitted
            .as_ref()
            .map(|s| s.support_vectors.nrows())
            .unwrap_or(0)
    }
}

impl Model for SVMRegressor {
    /// Dual coordinate descent on the epsilon-insensitive objective.
    ///
    /// The bias is absorbed by augmenting the kernel with a constant 1, so
    /// every coordinate update has a closed form (soft threshold + box clip).
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_input(x, y, &self.config)?;

        let n = x.nrows();
        let c = self.config.c;
        let eps = self.config.epsilon;

        let kernel = self.config.kernel.resolve(x);
        let k = kernel.matrix(x) + 1.0;

        let mut beta: Array1<f64> = Array1::zeros(n);
        // f = K * beta, kept up to date incrementally
        let mut f: Array1<f64> = Array1::zeros(n);
        let mut iterations = 0;

        for _ in 0..self.config.max_iter {
            iterations += 1;
            let mut max_change: f64 = 0.0;

            for i in 0..n {
                let kii = k[[i, i]];
                if kii <= 1e-12 {
                    continue;
                }
                let linear = f[i] - kii * beta[i] - y[i];
                let u = -linear / kii;
                let shrunk = (u.abs() - eps / kii).max(0.0) * u.signum();
                let updated = shrunk.clamp(-c, c);

                let delta = updated - beta[i];
                if delta != 0.0 {
                    f.scaled_add(delta, &k.row(i));
                    beta[i] = updated;
                    max_change = max_change.max(delta.abs());
                }
            }

            if max_change < self.config.tol {
                break;
            }
        }

        debug!(iterations, "SVR coordinate descent finished");

        let bias = beta.sum();
        self.fitted = Some(SupportSet::from_indices(kernel, x, &beta, bias));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fitted
            .as_ref()
            .ok_or(FusionError::ModelNotFitted)?
            .decision(x)
    }

    fn name(&self) -> &'static str {
        "svm_regressor"
    }
}
