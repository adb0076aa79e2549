//! Trainable models
//!
//! Provides the models used per modality:
//! - Support Vector Machines (kernel classifier with class-weight balancing, kernel regressor)
//! - Random Forest of bounded-depth decision trees (classifier)
//!
//! All models share the [`Model`] fit/predict contract so the pipeline is
//! agnostic to which variant it trains.

pub mod decision_tree;
pub mod random_forest;
pub mod svm;

pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use random_forest::{ForestConfig, MaxFeatures, RandomForest};
pub use svm::{ClassWeight, Gamma, KernelType, SVMClassifier, SVMConfig, SVMRegressor};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Type of prediction task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    /// Continuous score
    Regression,
    /// Binary class (0/1)
    BinaryClassification,
}

/// Trait for ML models
pub trait Model: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions, one per input row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Short model name for logs
    fn name(&self) -> &'static str;
}

/// Serializable description of which model to train
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    SvmRegressor(SVMConfig),
    SvmClassifier(SVMConfig),
    RandomForest(ForestConfig),
}

impl ModelSpec {
    /// Task this model solves
    pub fn task(&self) -> TaskType {
        match self {
            ModelSpec::SvmRegressor(_) => TaskType::Regression,
            ModelSpec::SvmClassifier(_) | ModelSpec::RandomForest(_) => {
                TaskType::BinaryClassification
            }
        }
    }

    /// Build a fresh, unfitted model
    pub fn build(&self) -> Box<dyn Model> {
        match self {
            ModelSpec::SvmRegressor(config) => Box::new(SVMRegressor::new(config.clone())),
            ModelSpec::SvmClassifier(config) => Box::new(SVMClassifier::new(config.clone())),
            ModelSpec::RandomForest(config) => Box::new(RandomForest::new(config.clone())),
        }
    }

    /// Fail unless this spec solves `task`
    pub fn expect_task(&self, task: TaskType) -> Result<()> {
        if self.task() != task {
            return Err(crate::error::FusionError::InvalidParameter {
                name: "model".to_string(),
                value: format!("{:?}", self.task()),
                reason: format!("a {:?} model is required here", task),
            });
        }
        Ok(())
    }
}
