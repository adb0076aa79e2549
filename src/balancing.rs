//! Minority-class upsampling for binary training sets
//!
//! Label 0 is the majority (negative) class and label 1 the minority
//! (positive) class. Both are checked rather than assumed.

use crate::config::FusionConfig;
use crate::data::{check_alignment, check_binary_labels, ModalitySplit, SplitLabels};
use crate::error::{FusionError, Result};
use crate::metrics::ClassificationMetrics;
use crate::predictor::PredictionOutcome;
use crate::preprocessing::{impute_split, ImputeStrategy};
use crate::training::{ModelSpec, TaskType};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Balanced training set
#[derive(Debug, Clone)]
pub struct BalancedSet {
    /// Majority rows in original order, then resampled minority rows
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    /// Majority rows kept
    pub n_majority: usize,
    /// Minority rows drawn with replacement (equals `n_majority`)
    pub n_resampled: usize,
}

/// Evaluation of a classifier trained on a balanced set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancedEvaluation {
    /// Minority rows before resampling
    pub n_minority: usize,
    /// Rows per class after resampling
    pub n_per_class: usize,
    #[serde(flatten)]
    pub outcome: PredictionOutcome<ClassificationMetrics>,
}

/// Random oversampler for the positive class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassBalancer {
    seed: u64,
    imputation: ImputeStrategy,
}

impl Default for ClassBalancer {
    fn default() -> Self {
        Self::new(123)
    }
}

impl ClassBalancer {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            imputation: ImputeStrategy::default(),
        }
    }

    pub fn with_imputation(mut self, imputation: ImputeStrategy) -> Self {
        self.imputation = imputation;
        self
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(config.balancing_seed).with_imputation(config.imputation)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Upsample label-1 rows with replacement to the label-0 count
    pub fn upsample(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<BalancedSet> {
        check_alignment(x.nrows(), y)?;
        check_binary_labels(y)?;

        let (majority, minority): (Vec<usize>, Vec<usize>) =
            (0..y.len()).partition(|&i| y[i] == 0.0);

        if majority.is_empty() || minority.is_empty() {
            return Err(FusionError::DegenerateClass {
                label: if majority.is_empty() { 1.0 } else { 0.0 },
                n_samples: y.len(),
            });
        }
        if minority.len() > majority.len() {
            return Err(FusionError::InvalidInput(format!(
                "label 1 must be the minority class, got {} positives vs {} negatives",
                minority.len(),
                majority.len()
            )));
        }

        let n_majority = majority.len();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let resampled: Vec<usize> = (0..n_majority)
            .map(|_| minority[rng.gen_range(0..minority.len())])
            .collect();

        let mut order = majority;
        order.extend_from_slice(&resampled);

        let x_balanced = x.select(Axis(0), &order);
        let y_balanced: Array1<f64> = order.iter().map(|&i| y[i]).collect();

        Ok(BalancedSet {
            x: x_balanced,
            y: y_balanced,
            n_majority,
            n_resampled: resampled.len(),
        })
    }

    /// Train on the balanced train split and evaluate on the untouched test split
    ///
    /// The imputer is fit on the original training rows before balancing.
    pub fn evaluate(
        &self,
        spec: &ModelSpec,
        split: &ModalitySplit,
        labels: &SplitLabels,
    ) -> Result<BalancedEvaluation> {
        spec.expect_task(TaskType::BinaryClassification)?;
        split.check_labels(labels)?;
        labels.check_binary()?;

        let (x_train, x_test) = impute_split(self.imputation, &split.train, &split.test)?;
        let n_minority = labels.train.iter().filter(|&&v| v == 1.0).count();
        let balanced = self.upsample(&x_train, &labels.train)?;

        let mut model = spec.build();
        model.fit(&balanced.x, &balanced.y)?;
        let predictions = model.predict(&x_test)?;
        let metrics = ClassificationMetrics::compute(&labels.test, &predictions)?;

        info!(
            modality = %split.name,
            seed = self.seed,
            n_minority,
            n_per_class = balanced.n_majority,
            accuracy = metrics.accuracy,
            "Upsampled classifier evaluated"
        );
        Ok(BalancedEvaluation {
            n_minority,
            n_per_class: balanced.n_majority,
            outcome: PredictionOutcome { predictions, metrics },
        })
    }
}
