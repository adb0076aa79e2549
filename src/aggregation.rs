//! Early fusion: reduce per-frame modality tables to per-subject features
//!
//! Each modality table holds one row per observation unit (frame, sentence)
//! for a single subject. Every column is reduced to one value per configured
//! statistic, ignoring missing entries (nulls and NaN). A column with no
//! observed values aggregates to NaN so the gap stays visible downstream.

use crate::data::{is_missing, FeatureMatrix, FeatureVector};
use crate::error::{FusionError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// NaN-aware aggregate statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Mean,
    Min,
    Max,
    Median,
    /// Population standard deviation
    Std,
}

impl Statistic {
    /// Suffix appended to the column name
    pub fn suffix(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Median => "median",
            Statistic::Std => "std",
        }
    }

    /// Compute over observed values; NaN when there are none
    pub fn compute(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        let n = values.len() as f64;
        match self {
            Statistic::Mean => values.iter().sum::<f64>() / n,
            Statistic::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Statistic::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Statistic::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Statistic::Std => {
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                var.sqrt()
            }
        }
    }
}

/// Aggregates modality tables into feature vectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAggregator {
    statistics: Vec<Statistic>,
}

impl Default for FeatureAggregator {
    fn default() -> Self {
        Self {
            statistics: vec![Statistic::Mean],
        }
    }
}

impl FeatureAggregator {
    /// Create an aggregator using the mean statistic
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the statistics computed for every column
    pub fn with_statistics(mut self, statistics: Vec<Statistic>) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn statistics(&self) -> &[Statistic] {
        &self.statistics
    }

    /// Aggregate one subject's modality tables into a single feature vector.
    ///
    /// Names follow table order, then column order, then statistic order.
    pub fn aggregate(&self, tables: &[DataFrame]) -> Result<FeatureVector> {
        if tables.is_empty() {
            return Err(FusionError::InvalidInput(
                "at least one modality table is required".to_string(),
            ));
        }
        if self.statistics.is_empty() {
            return Err(FusionError::InvalidParameter {
                name: "statistics".to_string(),
                value: "[]".to_string(),
                reason: "at least one statistic is required".to_string(),
            });
        }

        let mut names = Vec::new();
        let mut values = Vec::new();

        for table in tables {
            for column in table.get_columns() {
                let observed = observed_values(column)?;
                let base = column.name().as_str().trim();
                for stat in &self.statistics {
                    names.push(format!("{}_{}", base, stat.suffix()));
                    values.push(stat.compute(&observed));
                }
            }
        }

        debug!(
            tables = tables.len(),
            features = names.len(),
            "Aggregated modality tables"
        );

        FeatureVector::new(names, Array1::from_vec(values))
    }

    /// Aggregate several subjects and stack them into a feature matrix.
    ///
    /// Every subject must produce the same feature names in the same order.
    pub fn aggregate_subjects(&self, subjects: &[Vec<DataFrame>]) -> Result<FeatureMatrix> {
        let vectors = subjects
            .iter()
            .map(|tables| self.aggregate(tables))
            .collect::<Result<Vec<_>>>()?;
        stack_vectors(&vectors)
    }
}

/// Stack per-subject feature vectors into one matrix
pub fn stack_vectors(vectors: &[FeatureVector]) -> Result<FeatureMatrix> {
    let first = vectors.first().ok_or_else(|| {
        FusionError::InvalidInput("at least one feature vector is required".to_string())
    })?;

    let n_features = first.len();
    let mut matrix = Array2::zeros((vectors.len(), n_features));

    for (i, vector) in vectors.iter().enumerate() {
        if vector.names != first.names {
            return Err(FusionError::SchemaMismatch {
                expected: format!("{} features as in subject 0", n_features),
                actual: format!("{} features in subject {}", vector.len(), i),
            });
        }
        matrix.row_mut(i).assign(&vector.values);
    }

    FeatureMatrix::new(first.names.clone(), matrix)
}

fn observed_values(column: &Column) -> Result<Vec<f64>> {
    let series = column
        .as_materialized_series()
        .strict_cast(&DataType::Float64)?;
    let values = series
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !is_missing(*v))
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_ignores_missing() {
        let df = df!(
            "pitch" => &[Some(1.0), None, Some(3.0), Some(f64::NAN)],
            "energy" => &[0.5, 0.5, 0.5, 0.5]
        )
        .unwrap();

        let fv = FeatureAggregator::new().aggregate(&[df]).unwrap();
        assert_eq!(fv.names, vec!["pitch_mean", "energy_mean"]);
        assert!((fv.values[0] - 2.0).abs() < 1e-12);
        assert!((fv.values[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_all_missing_column_propagates_nan() {
        let df = df!(
            "gaze" => &[None::<f64>, None, None],
            "au01" => &[1.0, 2.0, 3.0]
        )
        .unwrap();

        let fv = FeatureAggregator::new().aggregate(&[df]).unwrap();
        assert!(fv.values[0].is_nan(), "all-missing column must stay missing");
        assert!((fv.values[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_column_order_across_tables() {
        let audio = df!("b" => &[1.0], "a" => &[2.0]).unwrap();
        let video = df!(" z " => &[3.0]).unwrap();

        let fv = FeatureAggregator::new().aggregate(&[audio, video]).unwrap();
        assert_eq!(fv.names, vec!["b_mean", "a_mean", "z_mean"]);
    }

    #[test]
    fn test_duplicate_columns_across_tables_rejected() {
        let a = df!("x" => &[1.0]).unwrap();
        let b = df!("x" => &[2.0]).unwrap();
        let err = FeatureAggregator::new().aggregate(&[a, b]).unwrap_err();
        assert!(matches!(err, FusionError::DuplicateFeature(_)));
    }

    #[test]
    fn test_extended_statistics() {
        let df = df!("v" => &[Some(4.0), Some(1.0), None, Some(7.0)]).unwrap();
        let agg = FeatureAggregator::new().with_statistics(vec![
            Statistic::Min,
            Statistic::Max,
            Statistic::Median,
            Statistic::Std,
        ]);
        let fv = agg.aggregate(&[df]).unwrap();

        assert_eq!(fv.names, vec!["v_min", "v_max", "v_median", "v_std"]);
        assert_eq!(fv.values[0], 1.0);
        assert_eq!(fv.values[1], 7.0);
        assert_eq!(fv.values[2], 4.0);
        assert!((fv.values[3] - 6.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_subjects_stacks_rows() {
        let s1 = vec![df!("f" => &[1.0, 3.0]).unwrap()];
        let s2 = vec![df!("f" => &[5.0]).unwrap()];

        let matrix = FeatureAggregator::new().aggregate_subjects(&[s1, s2]).unwrap();
        assert_eq!(matrix.names(), &["f_mean".to_string()]);
        assert_eq!(matrix.nrows(), 2);
        assert_eq!(matrix.values()[[0, 0]], 2.0);
        assert_eq!(matrix.values()[[1, 0]], 5.0);
    }

    #[test]
    fn test_aggregate_subjects_schema_mismatch() {
        let s1 = vec![df!("f" => &[1.0]).unwrap()];
        let s2 = vec![df!("g" => &[1.0]).unwrap()];
        let err = FeatureAggregator::new().aggregate_subjects(&[s1, s2]).unwrap_err();
        assert!(matches!(err, FusionError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_non_numeric_column_is_data_error() {
        let df = df!("label" => &["happy", "sad"]).unwrap();
        let err = FeatureAggregator::new().aggregate(&[df]).unwrap_err();
        assert!(matches!(err, FusionError::DataError(_)));
    }
}
