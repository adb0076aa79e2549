//! Regularization sweep for the balanced SVM classifier
//!
//! Reports metrics for every candidate C; picking a winner is left to the caller.

use crate::config::FusionConfig;
use crate::data::{ModalitySplit, SplitLabels};
use crate::error::{FusionError, Result};
use crate::metrics::ClassificationMetrics;
use crate::preprocessing::{impute_split, ImputeStrategy};
use crate::training::{ClassWeight, Model, SVMClassifier, SVMConfig};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Metrics for one regularization strength
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepCandidate {
    pub c: f64,
    pub metrics: ClassificationMetrics,
}

/// Sweep over C = 10^e for each configured exponent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperparameterSweeper {
    exponents: Vec<i32>,
    /// Kernel and solver settings shared by every candidate
    base: SVMConfig,
    imputation: ImputeStrategy,
    parallel: bool,
}

impl Default for HyperparameterSweeper {
    fn default() -> Self {
        Self::new((-5..=4).collect())
    }
}

impl HyperparameterSweeper {
    pub fn new(exponents: Vec<i32>) -> Self {
        Self {
            exponents,
            base: SVMConfig::balanced(),
            imputation: ImputeStrategy::default(),
            parallel: true,
        }
    }

    pub fn with_base(mut self, base: SVMConfig) -> Self {
        self.base = base;
        self
    }

    pub fn with_imputation(mut self, imputation: ImputeStrategy) -> Self {
        self.imputation = imputation;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(config.sweep_exponents.clone())
            .with_base(config.classifier.clone())
            .with_imputation(config.imputation)
            .with_parallel(config.parallel)
    }

    /// Candidate C values in sweep order
    pub fn candidates(&self) -> Vec<f64> {
        self.exponents.iter().map(|&e| 10f64.powi(e)).collect()
    }

    /// Fit one class-weight-balanced classifier per candidate and evaluate each
    pub fn run(&self, split: &ModalitySplit, labels: &SplitLabels) -> Result<Vec<SweepCandidate>> {
        if self.exponents.is_empty() {
            return Err(FusionError::InvalidParameter {
                name: "sweep_exponents".to_string(),
                value: "[]".to_string(),
                reason: "at least one candidate is required".to_string(),
            });
        }
        split.check_labels(labels)?;
        labels.check_binary()?;

        // Imputation does not depend on C, so it is fit once
        let (x_train, x_test) = impute_split(self.imputation, &split.train, &split.test)?;
        let candidates = self.candidates();

        let evaluate = |&c: &f64| {
            self.evaluate_candidate(c, &x_train, &x_test, labels)
                .map_err(|e| e.in_candidate(c))
        };
        let results: Vec<Result<SweepCandidate>> = if self.parallel {
            candidates.par_iter().map(evaluate).collect()
        } else {
            candidates.iter().map(evaluate).collect()
        };
        let results = results.into_iter().collect::<Result<Vec<_>>>()?;

        for candidate in &results {
            info!(
                modality = %split.name,
                c = candidate.c,
                accuracy = candidate.metrics.accuracy,
                tp = candidate.metrics.confusion.tp,
                tn = candidate.metrics.confusion.tn,
                fp = candidate.metrics.confusion.fp,
                fn_ = candidate.metrics.confusion.fn_,
                "Sweep candidate evaluated"
            );
        }
        Ok(results)
    }

    fn evaluate_candidate(
        &self,
        c: f64,
        x_train: &Array2<f64>,
        x_test: &Array2<f64>,
        labels: &SplitLabels,
    ) -> Result<SweepCandidate> {
        let mut config = self.base.clone().with_c(c);
        config.class_weight = ClassWeight::Balanced;

        let mut model = SVMClassifier::new(config);
        model.fit(x_train, &labels.train)?;
        let predictions: Array1<f64> = model.predict(x_test)?;
        let metrics = ClassificationMetrics::compute(&labels.test, &predictions)?;
        Ok(SweepCandidate { c, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureMatrix;
    use ndarray::array;

    fn split() -> (ModalitySplit, SplitLabels) {
        let train = array![
            [0.0, 0.1],
            [0.2, 0.0],
            [0.1, 0.3],
            [f64::NAN, 0.2],
            [0.3, 0.1],
            [2.0, 2.1],
            [2.2, 1.9],
        ];
        let test = array![[0.1, 0.1], [2.1, 2.0], [0.2, f64::NAN]];
        let split = ModalitySplit::new(
            "audio",
            FeatureMatrix::from_array(train),
            FeatureMatrix::from_array(test),
        )
        .unwrap();
        let labels = SplitLabels::new(
            array![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0],
            array![0.0, 1.0, 0.0],
        );
        (split, labels)
    }

    #[test]
    fn test_default_candidates() {
        let c = HyperparameterSweeper::default().candidates();
        assert_eq!(c.len(), 10);
        assert!((c[0] / 1e-5 - 1.0).abs() < 1e-12);
        assert!((c[9] / 1e4 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_run_reports_every_candidate_in_order() {
        let (split, labels) = split();
        let sweeper = HyperparameterSweeper::default();
        let results = sweeper.run(&split, &labels).unwrap();
        assert_eq!(results.len(), 10);
        for (candidate, expected) in results.iter().zip(sweeper.candidates()) {
            assert_eq!(candidate.c, expected);
            assert_eq!(candidate.metrics.confusion.total(), 3);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (split, labels) = split();
        let sweeper = HyperparameterSweeper::new(vec![-1, 0, 1]);
        let par = sweeper.run(&split, &labels).unwrap();
        let seq = sweeper.clone().with_parallel(false).run(&split, &labels).unwrap();
        for (a, b) in par.iter().zip(seq.iter()) {
            assert_eq!(a.metrics, b.metrics);
        }
    }

    #[test]
    fn test_failing_candidate_is_named() {
        let (split, labels) = split();
        let err = HyperparameterSweeper::new(vec![0])
            .with_base(SVMConfig::balanced().with_c(1.0))
            .run(&split, &SplitLabels::new(Array1::ones(7), labels.test.clone()))
            .unwrap_err();
        match err {
            FusionError::Candidate { c, source } => {
                assert_eq!(c, 1.0);
                assert!(matches!(*source, FusionError::DegenerateClass { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_sweep_rejected() {
        let (split, labels) = split();
        assert!(matches!(
            HyperparameterSweeper::new(Vec::new()).run(&split, &labels),
            Err(FusionError::InvalidParameter { .. })
        ));
    }
}
