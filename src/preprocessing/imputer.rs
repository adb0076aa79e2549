//! Missing value imputation
//!
//! The imputer is fit once on a training matrix and the same fill values are
//! applied to every matrix transformed for that modeling task, test data
//! included.

use crate::data::{is_missing, FeatureMatrix};
use crate::error::{FusionError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the column mean of observed training values
    #[default]
    Mean,
    /// Replace with the column median of observed training values
    Median,
}

/// Column-wise imputer for NaN-encoded missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Option<Vec<f64>>,
    feature_names: Option<Vec<String>>,
}

impl Default for Imputer {
    fn default() -> Self {
        Self::new(ImputeStrategy::Mean)
    }
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: None,
            feature_names: None,
        }
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    /// Fitted fill value per column
    pub fn fill_values(&self) -> Option<&[f64]> {
        self.fill_values.as_deref()
    }

    pub fn is_fitted(&self) -> bool {
        self.fill_values.is_some()
    }

    /// Fit fill values from a training matrix
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let mut fills = Vec::with_capacity(x.ncols());

        for (j, column) in x.columns().into_iter().enumerate() {
            let mut observed: Vec<f64> = column.iter().copied().filter(|v| !is_missing(*v)).collect();
            if observed.is_empty() {
                return Err(FusionError::AllMissingColumn {
                    column: self.column_label(j),
                });
            }
            let fill = match self.strategy {
                ImputeStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
                ImputeStrategy::Median => {
                    observed.sort_by(|a, b| a.total_cmp(b));
                    let mid = observed.len() / 2;
                    if observed.len() % 2 == 0 {
                        (observed[mid - 1] + observed[mid]) / 2.0
                    } else {
                        observed[mid]
                    }
                }
            };
            fills.push(fill);
        }

        self.fill_values = Some(fills);
        Ok(self)
    }

    /// Fit on a named matrix; names are kept for schema checks and errors
    pub fn fit_matrix(&mut self, x: &FeatureMatrix) -> Result<&mut Self> {
        self.feature_names = Some(x.names().to_vec());
        self.fit(x.values())
    }

    /// Replace missing entries with the fitted fill values
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let fills = self.fill_values.as_ref().ok_or(FusionError::ModelNotFitted)?;

        if x.ncols() != fills.len() {
            return Err(FusionError::SchemaMismatch {
                expected: format!("{} columns", fills.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (mut column, &fill) in out.columns_mut().into_iter().zip(fills.iter()) {
            column.mapv_inplace(|v| if is_missing(v) { fill } else { v });
        }
        Ok(out)
    }

    /// Transform a named matrix, checking the column names against fit
    pub fn transform_matrix(&self, x: &FeatureMatrix) -> Result<FeatureMatrix> {
        if let Some(names) = &self.feature_names {
            if names.as_slice() != x.names() {
                return Err(FusionError::SchemaMismatch {
                    expected: format!("{} fitted columns", names.len()),
                    actual: format!("{} columns with different names or order", x.ncols()),
                });
            }
        }
        let values = self.transform(x.values())?;
        FeatureMatrix::new(x.names().to_vec(), values)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    fn column_label(&self, j: usize) -> String {
        self.feature_names
            .as_ref()
            .and_then(|names| names.get(j).cloned())
            .unwrap_or_else(|| format!("#{}", j))
    }
}

/// Fit on train, then impute both splits with the train-fitted values
pub fn impute_split(
    strategy: ImputeStrategy,
    train: &FeatureMatrix,
    test: &FeatureMatrix,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let mut imputer = Imputer::new(strategy);
    imputer.fit_matrix(train)?;
    let train_imp = imputer.transform_matrix(train)?;
    let test_imp = imputer.transform_matrix(test)?;
    Ok((train_imp.values().clone(), test_imp.values().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mean_fit_and_transform() {
        let train = array![[1.0], [2.0], [f64::NAN]];
        let mut imputer = Imputer::new(ImputeStrategy::Mean);
        imputer.fit(&train).unwrap();
        assert_eq!(imputer.fill_values().unwrap(), &[1.5]);

        let out = imputer.transform(&array![[f64::NAN], [3.0]]).unwrap();
        assert_eq!(out, array![[1.5], [3.0]]);
    }

    #[test]
    fn test_test_split_uses_train_statistics() {
        let train = array![[0.0, 10.0], [2.0, f64::NAN]];
        let test = array![[f64::NAN, f64::NAN], [100.0, 50.0]];

        let mut imputer = Imputer::default();
        imputer.fit(&train).unwrap();
        let out = imputer.transform(&test).unwrap();

        // Test's own means (100, 50) must not leak in
        assert_eq!(out[[0, 0]], 1.0);
        assert_eq!(out[[0, 1]], 10.0);
    }

    #[test]
    fn test_no_missing_after_transform() {
        let train = array![[1.0, f64::NAN, 3.0], [f64::NAN, 5.0, 6.0], [7.0, 8.0, f64::NAN]];
        let mut imputer = Imputer::default();
        let out = imputer.fit_transform(&train).unwrap();
        assert!(out.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_median_strategy() {
        let train = array![[1.0], [10.0], [2.0], [f64::NAN]];
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        imputer.fit(&train).unwrap();
        assert_eq!(imputer.fill_values().unwrap(), &[2.0]);
    }

    #[test]
    fn test_all_missing_column_error_names_column() {
        let train = FeatureMatrix::new(
            vec!["ok".to_string(), "gaze_mean".to_string()],
            array![[1.0, f64::NAN], [2.0, f64::NAN]],
        )
        .unwrap();
        let err = Imputer::default().fit_matrix(&train).unwrap_err();
        assert!(matches!(err, FusionError::AllMissingColumn { ref column } if column == "gaze_mean"));
    }

    #[test]
    fn test_transform_before_fit() {
        let imputer = Imputer::default();
        assert!(matches!(
            imputer.transform(&array![[1.0]]),
            Err(FusionError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_transform_column_count_mismatch() {
        let mut imputer = Imputer::default();
        imputer.fit(&array![[1.0, 2.0]]).unwrap();
        assert!(matches!(
            imputer.transform(&array![[1.0]]),
            Err(FusionError::SchemaMismatch { .. })
        ));
    }
}
