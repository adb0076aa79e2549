//! Data preprocessing module
//!
//! Provides the train-fitted transforms applied before model fitting:
//! - Missing value imputation (mean or median)
//! - Principal component projection

mod imputer;
mod pca;

pub use imputer::{impute_split, ImputeStrategy, Imputer};
pub use pca::{reduce_split, Pca, PcaConfig};
