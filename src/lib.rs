//! Kolosal Fusion - Multimodal feature fusion and ensemble prediction
//!
//! This crate provides an offline pipeline for combining several modalities
//! (e.g. audio, video and text features of the same subjects):
//! - Early fusion: NaN-aware aggregation of per-frame tables into one vector per subject
//! - Leakage-safe preprocessing: imputation and PCA fit on train, applied to test
//! - Per-modality kernel and forest models behind one fit/predict trait
//! - Late fusion: prediction averaging and majority voting across modalities
//! - Class balancing by minority upsampling and a regularization sweep
//!
//! # Modules
//!
//! ## Data
//! - [`data`] - Feature vectors, matrices, train/test splits and labels
//! - [`aggregation`] - Early fusion over `polars` tables
//! - [`preprocessing`] - Imputation and PCA
//!
//! ## Modeling
//! - [`training`] - SVM classifier/regressor and random forest
//! - [`predictor`] - Single-modality impute, fit, predict and evaluate
//! - [`metrics`] - MAE/RMSE, accuracy, confusion counts, per-class report
//!
//! ## Fusion policies
//! - [`ensemble`] - Averaging and majority-vote late fusion
//! - [`balancing`] - Minority-class upsampling
//! - [`sweep`] - C sweep for the balanced classifier
//!
//! # Example
//!
//! ```no_run
//! use kolosal_fusion::prelude::*;
//! use ndarray::array;
//!
//! # fn main() -> kolosal_fusion::Result<()> {
//! let audio = ModalitySplit::new(
//!     "audio",
//!     FeatureMatrix::from_array(array![[0.1], [0.4], [0.9], [1.3]]),
//!     FeatureMatrix::from_array(array![[0.2], [1.1]]),
//! )?;
//! let video = ModalitySplit::new(
//!     "video",
//!     FeatureMatrix::from_array(array![[1.0], [2.0], [f64::NAN], [4.0]]),
//!     FeatureMatrix::from_array(array![[1.5], [3.5]]),
//! )?;
//! let labels = SplitLabels::new(array![1.0, 2.0, 3.0, 4.0], array![1.5, 3.5]);
//!
//! let config = FusionConfig::default();
//! let outcome = LateFusion::from_config(&config)
//!     .average(&[audio, video], &labels, &config.regressor_spec())?;
//! println!("fused MAE = {:.3}", outcome.fused.metrics.mae);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;
pub mod config;

// Data
pub mod data;
pub mod aggregation;
pub mod preprocessing;

// Modeling
pub mod training;
pub mod metrics;
pub mod predictor;

// Fusion policies
pub mod ensemble;
pub mod balancing;
pub mod sweep;

pub use error::{FusionError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{FusionError, Result};

    // Configuration
    pub use crate::config::FusionConfig;

    // Data
    pub use crate::data::{FeatureMatrix, FeatureVector, ModalitySplit, SplitLabels};
    pub use crate::aggregation::{FeatureAggregator, Statistic};

    // Preprocessing
    pub use crate::preprocessing::{ImputeStrategy, Imputer, Pca, PcaConfig};

    // Training
    pub use crate::training::{
        ClassWeight, ForestConfig, Gamma, KernelType, Model, ModelSpec, RandomForest,
        SVMClassifier, SVMConfig, SVMRegressor, TaskType,
    };

    // Evaluation
    pub use crate::metrics::{ClassificationMetrics, ConfusionCounts, RegressionMetrics};
    pub use crate::predictor::{ModalityPredictor, PredictionOutcome};

    // Fusion
    pub use crate::ensemble::{Combiner, LateFusion, LateFusionOutcome};
    pub use crate::balancing::ClassBalancer;
    pub use crate::sweep::{HyperparameterSweeper, SweepCandidate};
}
