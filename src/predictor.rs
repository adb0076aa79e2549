//! Single-modality prediction
//!
//! Runs impute → (optional PCA) → fit → predict → metrics for one modality.
//! Every fitted transform is learned on the train split only and then applied
//! unchanged to the test split.

use crate::config::FusionConfig;
use crate::data::{ModalitySplit, SplitLabels};
use crate::error::Result;
use crate::metrics::{ClassificationMetrics, RegressionMetrics};
use crate::preprocessing::{impute_split, reduce_split, ImputeStrategy, PcaConfig};
use crate::training::{Model, ModelSpec, TaskType};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Test-split predictions together with their evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOutcome<M> {
    pub predictions: Array1<f64>,
    pub metrics: M,
}

/// Predictor for one modality's train/test split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalityPredictor {
    imputation: ImputeStrategy,
    /// Number of PCA components, no reduction when None
    n_components: Option<usize>,
    pca: PcaConfig,
}

impl Default for ModalityPredictor {
    fn default() -> Self {
        Self::new(ImputeStrategy::default())
    }
}

impl ModalityPredictor {
    pub fn new(imputation: ImputeStrategy) -> Self {
        Self {
            imputation,
            n_components: None,
            pca: PcaConfig::default(),
        }
    }

    /// Insert a PCA stage with `n_components` outputs after imputation
    pub fn with_reduction(mut self, n_components: usize, pca: PcaConfig) -> Self {
        self.n_components = Some(n_components);
        self.pca = pca;
        self
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self {
            imputation: config.imputation,
            n_components: config.n_components,
            pca: PcaConfig::default(),
        }
    }

    pub fn imputation(&self) -> ImputeStrategy {
        self.imputation
    }

    /// Model-ready train and test matrices
    pub fn prepare(&self, split: &ModalitySplit) -> Result<(Array2<f64>, Array2<f64>)> {
        match self.n_components {
            Some(n) => {
                let (train, test, pca) = reduce_split(split, n, self.imputation, self.pca.clone())?;
                debug!(
                    modality = %split.name,
                    n_components = n,
                    explained = ?pca.explained_variance_ratio(),
                    "Reduced modality features"
                );
                Ok((train.values().clone(), test.values().clone()))
            }
            None => impute_split(self.imputation, &split.train, &split.test),
        }
    }

    /// Fit `model` on the prepared train split and predict the test split
    pub fn fit_predict(
        &self,
        model: &mut dyn Model,
        split: &ModalitySplit,
        labels: &SplitLabels,
    ) -> Result<Array1<f64>> {
        split.check_labels(labels)?;
        let (x_train, x_test) = self.prepare(split)?;

        let start = Instant::now();
        model.fit(&x_train, &labels.train)?;
        let predictions = model.predict(&x_test)?;

        debug!(
            modality = %split.name,
            model = model.name(),
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted modality model"
        );
        Ok(predictions)
    }

    /// Train a regressor and report MAE/RMSE on the test split
    pub fn regression(
        &self,
        spec: &ModelSpec,
        split: &ModalitySplit,
        labels: &SplitLabels,
    ) -> Result<PredictionOutcome<RegressionMetrics>> {
        spec.expect_task(TaskType::Regression)?;
        let mut model = spec.build();
        let predictions = self.fit_predict(model.as_mut(), split, labels)?;
        let metrics = RegressionMetrics::compute(&labels.test, &predictions)?;

        info!(
            modality = %split.name,
            mae = metrics.mae,
            rmse = metrics.rmse,
            "Regression evaluated"
        );
        Ok(PredictionOutcome { predictions, metrics })
    }

    /// Train a binary classifier and report accuracy, confusion counts and per-class scores
    pub fn classification(
        &self,
        spec: &ModelSpec,
        split: &ModalitySplit,
        labels: &SplitLabels,
    ) -> Result<PredictionOutcome<ClassificationMetrics>> {
        spec.expect_task(TaskType::BinaryClassification)?;
        labels.check_binary()?;
        let mut model = spec.build();
        let predictions = self.fit_predict(model.as_mut(), split, labels)?;
        let metrics = ClassificationMetrics::compute(&labels.test, &predictions)?;

        info!(
            modality = %split.name,
            accuracy = metrics.accuracy,
            tp = metrics.confusion.tp,
            tn = metrics.confusion.tn,
            fp = metrics.confusion.fp,
            fn_ = metrics.confusion.fn_,
            "Classification evaluated"
        );
        Ok(PredictionOutcome { predictions, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureMatrix;
    use crate::error::FusionError;
    use crate::training::{ForestConfig, KernelType, SVMConfig};
    use ndarray::array;

    fn matrix(values: Array2<f64>) -> FeatureMatrix {
        FeatureMatrix::from_array(values)
    }

    fn linear_split() -> (ModalitySplit, SplitLabels) {
        let train = array![[0.0], [1.0], [2.0], [3.0], [f64::NAN], [5.0], [6.0], [7.0]];
        let test = array![[1.5], [f64::NAN], [5.5]];
        let y_train = array![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let y_test = array![1.5, 3.5, 5.5];
        let split = ModalitySplit::new("audio", matrix(train), matrix(test)).unwrap();
        (split, SplitLabels::new(y_train, y_test))
    }

    #[test]
    fn test_regression_runs_end_to_end() {
        let (split, labels) = linear_split();
        let spec = ModelSpec::SvmRegressor(SVMConfig::default().with_kernel(KernelType::Linear));
        let outcome = ModalityPredictor::default()
            .regression(&spec, &split, &labels)
            .unwrap();
        assert_eq!(outcome.predictions.len(), 3);
        assert!(outcome.metrics.mae >= 0.0);
        assert!(outcome.metrics.rmse >= outcome.metrics.mae - 1e-12);
        assert!(outcome.metrics.mae < 1.5, "MAE too high: {}", outcome.metrics.mae);
    }

    #[test]
    fn test_prepare_imputes_test_with_train_mean() {
        let (split, _) = linear_split();
        let (_, test) = ModalityPredictor::default().prepare(&split).unwrap();
        // Train mean of observed values 0,1,2,3,5,6,7
        assert!((test[[1, 0]] - 24.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_prepare_with_reduction_shape() {
        let train = array![
            [1.0, 2.0, 0.1],
            [2.0, 4.2, 0.3],
            [3.0, 5.9, 0.2],
            [4.0, 8.1, 0.5],
        ];
        let test = array![[2.5, 5.0, 0.2]];
        let split = ModalitySplit::new("video", matrix(train), matrix(test)).unwrap();
        let predictor = ModalityPredictor::default().with_reduction(2, PcaConfig::default());
        let (x_train, x_test) = predictor.prepare(&split).unwrap();
        assert_eq!(x_train.ncols(), 2);
        assert_eq!(x_test.ncols(), 2);
    }

    #[test]
    fn test_classification_with_forest() {
        let train = array![[0.0], [0.2], [0.4], [1.0], [1.2], [1.4]];
        let test = array![[0.1], [1.3]];
        let split = ModalitySplit::new("text", matrix(train), matrix(test)).unwrap();
        let labels = SplitLabels::new(array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0], array![0.0, 1.0]);

        let spec = ModelSpec::RandomForest(ForestConfig::default());
        let outcome = ModalityPredictor::default()
            .classification(&spec, &split, &labels)
            .unwrap();
        assert_eq!(outcome.metrics.n_samples, 2);
        assert_eq!(outcome.metrics.confusion.total(), 2);
    }

    #[test]
    fn test_label_misalignment_surfaces() {
        let (split, _) = linear_split();
        let labels = SplitLabels::new(array![1.0, 2.0], array![1.0, 2.0, 3.0]);
        let spec = ModelSpec::SvmRegressor(SVMConfig::default());
        let err = ModalityPredictor::default()
            .regression(&spec, &split, &labels)
            .unwrap_err();
        assert!(matches!(err, FusionError::LabelAlignment { rows: 8, labels: 2 }));
    }

    #[test]
    fn test_wrong_task_rejected() {
        let (split, labels) = linear_split();
        let spec = ModelSpec::SvmClassifier(SVMConfig::balanced());
        assert!(matches!(
            ModalityPredictor::default().regression(&spec, &split, &labels),
            Err(FusionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_all_missing_column_surfaces() {
        let train = array![[f64::NAN, 1.0], [f64::NAN, 2.0]];
        let test = array![[1.0, 1.0]];
        let split = ModalitySplit::new("audio", matrix(train), matrix(test)).unwrap();
        let labels = SplitLabels::new(array![0.0, 1.0], array![1.0]);
        let spec = ModelSpec::SvmRegressor(SVMConfig::default());
        assert!(matches!(
            ModalityPredictor::default().regression(&spec, &split, &labels),
            Err(FusionError::AllMissingColumn { .. })
        ));
    }
}
