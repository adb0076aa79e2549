//! Late fusion across modalities
//!
//! Trains one model per modality, each with its own train-fitted imputer,
//! then merges the test-split predictions with a [`Combiner`].

use super::voting::Combiner;
use crate::config::FusionConfig;
use crate::data::{check_alignment, ModalitySplit, SplitLabels};
use crate::error::{FusionError, Result};
use crate::metrics::{ClassificationMetrics, RegressionMetrics};
use crate::predictor::{ModalityPredictor, PredictionOutcome};
use crate::training::{ModelSpec, TaskType};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One modality's own predictions and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalityOutcome<M> {
    pub modality: String,
    #[serde(flatten)]
    pub outcome: PredictionOutcome<M>,
}

/// Fused result plus the per-modality results it was built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LateFusionOutcome<M> {
    /// Per-modality outcomes in input order
    pub modalities: Vec<ModalityOutcome<M>>,
    pub combiner: Combiner,
    pub fused: PredictionOutcome<M>,
}

/// Late-fusion runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LateFusion {
    predictor: ModalityPredictor,
    /// Fit modalities on the rayon pool
    parallel: bool,
}

impl Default for LateFusion {
    fn default() -> Self {
        Self::new(ModalityPredictor::default())
    }
}

impl LateFusion {
    pub fn new(predictor: ModalityPredictor) -> Self {
        Self {
            predictor,
            parallel: true,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(ModalityPredictor::from_config(config)).with_parallel(config.parallel)
    }

    /// Regression late fusion: elementwise mean of per-modality predictions
    pub fn average(
        &self,
        modalities: &[ModalitySplit],
        labels: &SplitLabels,
        spec: &ModelSpec,
    ) -> Result<LateFusionOutcome<RegressionMetrics>> {
        spec.expect_task(TaskType::Regression)?;
        self.check_inputs(modalities, labels)?;

        let per_modality =
            self.run_each(modalities, |split| self.predictor.regression(spec, split, labels))?;
        let fused = Self::fuse(Combiner::Average, &per_modality, labels, |y, p| {
            RegressionMetrics::compute(y, p)
        })?;

        info!(
            n_modalities = modalities.len(),
            mae = fused.metrics.mae,
            rmse = fused.metrics.rmse,
            "Averaged late fusion evaluated"
        );
        Ok(LateFusionOutcome {
            modalities: per_modality,
            combiner: Combiner::Average,
            fused,
        })
    }

    /// Classification late fusion: per-row majority vote across modalities
    pub fn majority_vote(
        &self,
        modalities: &[ModalitySplit],
        labels: &SplitLabels,
        spec: &ModelSpec,
    ) -> Result<LateFusionOutcome<ClassificationMetrics>> {
        spec.expect_task(TaskType::BinaryClassification)?;
        self.check_inputs(modalities, labels)?;
        labels.check_binary()?;

        let per_modality = self.run_each(modalities, |split| {
            self.predictor.classification(spec, split, labels)
        })?;
        let fused = Self::fuse(Combiner::MajorityVote, &per_modality, labels, |y, p| {
            ClassificationMetrics::compute(y, p)
        })?;

        info!(
            n_modalities = modalities.len(),
            accuracy = fused.metrics.accuracy,
            "Majority-vote late fusion evaluated"
        );
        Ok(LateFusionOutcome {
            modalities: per_modality,
            combiner: Combiner::MajorityVote,
            fused,
        })
    }

    fn check_inputs(&self, modalities: &[ModalitySplit], labels: &SplitLabels) -> Result<()> {
        if modalities.len() < 2 {
            return Err(FusionError::InvalidInput(format!(
                "late fusion needs at least 2 modalities, got {}",
                modalities.len()
            )));
        }
        for split in modalities {
            check_alignment(split.test.nrows(), &labels.test)
                .map_err(|e| e.in_modality(split.name.clone()))?;
        }
        Ok(())
    }

    /// Run `task` per modality; the first failing modality (in input order) is reported
    fn run_each<M, F>(&self, modalities: &[ModalitySplit], task: F) -> Result<Vec<ModalityOutcome<M>>>
    where
        M: Send,
        F: Fn(&ModalitySplit) -> Result<PredictionOutcome<M>> + Sync,
    {
        let run = |split: &ModalitySplit| {
            task(split)
                .map(|outcome| ModalityOutcome {
                    modality: split.name.clone(),
                    outcome,
                })
                .map_err(|e| e.in_modality(split.name.clone()))
        };

        let results: Vec<Result<ModalityOutcome<M>>> = if self.parallel {
            modalities.par_iter().map(run).collect()
        } else {
            modalities.iter().map(run).collect()
        };
        results.into_iter().collect()
    }

    fn fuse<M>(
        combiner: Combiner,
        per_modality: &[ModalityOutcome<M>],
        labels: &SplitLabels,
        evaluate: impl Fn(&ndarray::Array1<f64>, &ndarray::Array1<f64>) -> Result<M>,
    ) -> Result<PredictionOutcome<M>> {
        let predictions: Vec<_> = per_modality
            .iter()
            .map(|m| m.outcome.predictions.clone())
            .collect();
        let fused = combiner.combine(&predictions)?;
        let metrics = evaluate(&labels.test, &fused)?;
        Ok(PredictionOutcome {
            predictions: fused,
            metrics,
        })
    }
}
