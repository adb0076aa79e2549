//! Core data containers shared across the pipeline
//!
//! Missing values are represented as `f64::NAN` throughout. Labels are
//! aligned to feature rows by index.

use crate::error::{FusionError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Check if a value is missing (NaN)
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}

/// Aggregated features for a single subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature names, `<column>_<statistic>`, unique and in first-seen order
    pub names: Vec<String>,
    /// One value per name; NaN when every input value was missing
    pub values: Array1<f64>,
}

impl FeatureVector {
    /// Build a feature vector, rejecting duplicate names
    pub fn new(names: Vec<String>, values: Array1<f64>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(FusionError::ShapeError {
                expected: format!("{} values", names.len()),
                actual: format!("{} values", values.len()),
            });
        }
        ensure_unique(&names)?;
        Ok(Self { names, values })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Look up a feature by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }
}

/// A named-column feature matrix, one row per subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    names: Vec<String>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    /// Create a matrix with explicit column names
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if names.len() != values.ncols() {
            return Err(FusionError::ShapeError {
                expected: format!("{} columns", names.len()),
                actual: format!("{} columns", values.ncols()),
            });
        }
        ensure_unique(&names)?;
        Ok(Self { names, values })
    }

    /// Create a matrix with generated names `f0`, `f1`, ...
    pub fn from_array(values: Array2<f64>) -> Self {
        let names = (0..values.ncols()).map(|i| format!("f{}", i)).collect();
        Self { names, values }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Fail unless `other` has the same columns in the same order
    pub fn check_schema(&self, other: &FeatureMatrix) -> Result<()> {
        if self.names != other.names {
            return Err(FusionError::SchemaMismatch {
                expected: describe_schema(&self.names),
                actual: describe_schema(&other.names),
            });
        }
        Ok(())
    }
}

fn describe_schema(names: &[String]) -> String {
    const SHOWN: usize = 6;
    if names.len() <= SHOWN {
        format!("{} columns [{}]", names.len(), names.join(", "))
    } else {
        format!(
            "{} columns [{}, ...]",
            names.len(),
            names[..SHOWN].join(", ")
        )
    }
}

fn ensure_unique(names: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(FusionError::DuplicateFeature(name.clone()));
        }
    }
    Ok(())
}

/// Train/test features for one modality
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalitySplit {
    /// Modality name used in logs and error attribution
    pub name: String,
    pub train: FeatureMatrix,
    pub test: FeatureMatrix,
}

impl ModalitySplit {
    /// Create a split, validating that train and test share one schema
    pub fn new(name: impl Into<String>, train: FeatureMatrix, test: FeatureMatrix) -> Result<Self> {
        let name = name.into();
        train
            .check_schema(&test)
            .map_err(|e| e.in_modality(name.clone()))?;
        Ok(Self { name, train, test })
    }

    /// Validate that labels line up with this split's rows
    pub fn check_labels(&self, labels: &SplitLabels) -> Result<()> {
        check_alignment(self.train.nrows(), &labels.train)?;
        check_alignment(self.test.nrows(), &labels.test)
    }
}

/// Labels for a train/test split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitLabels {
    pub train: Array1<f64>,
    pub test: Array1<f64>,
}

impl SplitLabels {
    pub fn new(train: Array1<f64>, test: Array1<f64>) -> Self {
        Self { train, test }
    }

    /// Fail unless both label sets only contain 0 and 1
    pub fn check_binary(&self) -> Result<()> {
        check_binary_labels(&self.train)?;
        check_binary_labels(&self.test)
    }
}

/// Fail unless `labels.len() == rows`
pub fn check_alignment(rows: usize, labels: &Array1<f64>) -> Result<()> {
    if rows != labels.len() {
        return Err(FusionError::LabelAlignment {
            rows,
            labels: labels.len(),
        });
    }
    Ok(())
}

/// Fail unless every label is exactly 0 or 1
pub fn check_binary_labels(labels: &Array1<f64>) -> Result<()> {
    for (index, &value) in labels.iter().enumerate() {
        if value != 0.0 && value != 1.0 {
            return Err(FusionError::NonBinaryLabel { index, value });
        }
    }
    Ok(())
}
