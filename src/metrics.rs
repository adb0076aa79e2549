//! Evaluation metrics for regression and binary classification

use crate::data::check_binary_labels;
use crate::error::{FusionError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

fn check_pair(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(FusionError::LabelAlignment {
            rows: y_pred.len(),
            labels: y_true.len(),
        });
    }
    if y_true.is_empty() {
        return Err(FusionError::InvalidInput(
            "cannot evaluate an empty prediction vector".to_string(),
        ));
    }
    Ok(())
}

/// Error summary for continuous predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute MAE and RMSE of `y_pred` against `y_true`
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_pair(y_true, y_pred)?;

        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| p - t)
            .collect();

        let mse: f64 = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae: f64 = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        Ok(Self {
            mae,
            rmse: mse.sqrt(),
            n_samples: y_true.len(),
        })
    }
}

/// Binary confusion counts with label 1 as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionCounts {
    /// Tally counts; both vectors must already be validated as binary
    pub fn tally(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == 1.0, p == 1.0) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true samples of this class
    pub support: usize,
}

impl ClassReport {
    /// Build from hit, false-alarm and miss counts; zero denominators give 0
    fn from_counts(hits: usize, false_alarms: usize, misses: usize) -> Self {
        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
        let precision = ratio(hits, hits + false_alarms);
        let recall = ratio(hits, hits + misses);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support: hits + misses,
        }
    }

    fn averaged(reports: [&ClassReport; 2], weights: [f64; 2]) -> Self {
        let total: f64 = weights.iter().sum();
        let avg = |f: fn(&ClassReport) -> f64| {
            if total > 0.0 {
                reports.iter().zip(weights).map(|(r, w)| f(*r) * w).sum::<f64>() / total
            } else {
                0.0
            }
        };
        Self {
            precision: avg(|r| r.precision),
            recall: avg(|r| r.recall),
            f1: avg(|r| r.f1),
            support: reports.iter().map(|r| r.support).sum(),
        }
    }
}

/// Accuracy, confusion counts and per-class report for binary labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub confusion: ConfusionCounts,
    /// Report for class 0
    pub negative: ClassReport,
    /// Report for class 1
    pub positive: ClassReport,
    /// Unweighted mean of both class reports
    pub macro_avg: ClassReport,
    /// Support-weighted mean of both class reports
    pub weighted_avg: ClassReport,
    pub n_samples: usize,
}

impl ClassificationMetrics {
    /// Compute metrics of `y_pred` against `y_true`; both must hold only 0 and 1
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_pair(y_true, y_pred)?;
        check_binary_labels(y_true)?;
        check_binary_labels(y_pred)?;

        let confusion = ConfusionCounts::tally(y_true, y_pred);
        let n = confusion.total();

        let positive = ClassReport::from_counts(confusion.tp, confusion.fp, confusion.fn_);
        let negative = ClassReport::from_counts(confusion.tn, confusion.fn_, confusion.fp);
        let macro_avg = ClassReport::averaged([&negative, &positive], [1.0, 1.0]);
        let weighted_avg = ClassReport::averaged(
            [&negative, &positive],
            [negative.support as f64, positive.support as f64],
        );

        Ok(Self {
            accuracy: (confusion.tp + confusion.tn) as f64 / n as f64,
            confusion,
            negative,
            positive,
            macro_avg,
            weighted_avg,
            n_samples: n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_confusion_counts_scenario() {
        let preds = array![1.0, 0.0, 1.0, 1.0];
        let labels = array![1.0, 0.0, 0.0, 1.0];
        let m = ClassificationMetrics::compute(&labels, &preds).unwrap();

        assert_eq!(
            m.confusion,
            ConfusionCounts { tn: 1, fp: 1, fn_: 0, tp: 2 }
        );
        assert!((m.accuracy - 0.75).abs() < 1e-12);
        assert!((m.positive.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.positive.recall - 1.0).abs() < 1e-12);
        assert!((m.negative.precision - 1.0).abs() < 1e-12);
        assert!((m.negative.recall - 0.5).abs() < 1e-12);
        assert_eq!(m.positive.support, 2);
        assert_eq!(m.negative.support, 2);
    }

    #[test]
    fn test_zero_division_gives_zero() {
        let labels = array![0.0, 0.0, 0.0];
        let preds = array![0.0, 0.0, 0.0];
        let m = ClassificationMetrics::compute(&labels, &preds).unwrap();
        assert_eq!(m.positive.precision, 0.0);
        assert_eq!(m.positive.recall, 0.0);
        assert_eq!(m.positive.f1, 0.0);
        assert_eq!(m.accuracy, 1.0);
        // Weighted average ignores the absent class
        assert_eq!(m.weighted_avg.f1, 1.0);
        assert_eq!(m.macro_avg.f1, 0.5);
    }

    #[test]
    fn test_non_binary_rejected() {
        let labels = array![0.0, 2.0];
        let preds = array![0.0, 1.0];
        assert!(matches!(
            ClassificationMetrics::compute(&labels, &preds),
            Err(FusionError::NonBinaryLabel { index: 1, .. })
        ));
    }

    #[test]
    fn test_regression_exact_predictions() {
        let y = array![3.0, 5.0];
        let m = RegressionMetrics::compute(&y, &y.clone()).unwrap();
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
    }

    #[test]
    fn test_regression_values() {
        let y_true = array![1.0, 2.0, 3.0, 4.0];
        let y_pred = array![2.0, 2.0, 3.0, 1.0];
        let m = RegressionMetrics::compute(&y_true, &y_pred).unwrap();
        assert!((m.mae - 1.0).abs() < 1e-12);
        assert!((m.rmse - (10.0f64 / 4.0).sqrt()).abs() < 1e-12);
        assert!(m.rmse >= 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let y_true = array![1.0, 2.0];
        let y_pred = array![1.0];
        assert!(matches!(
            RegressionMetrics::compute(&y_true, &y_pred),
            Err(FusionError::LabelAlignment { rows: 1, labels: 2 })
        ));
    }

    #[test]
    fn test_serialized_confusion_uses_fn_key() {
        let counts = ConfusionCounts { tn: 1, fp: 2, fn_: 3, tp: 4 };
        let json = serde_json::to_string(&counts).unwrap();
        assert!(json.contains("\"fn\":3"));
    }
}
