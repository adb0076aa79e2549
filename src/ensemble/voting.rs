//! Prediction-level combiners
//!
//! Both combiners take one prediction vector per source (modality or tree)
//! and reduce them row by row.

use crate::error::{FusionError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Rule used to merge per-source predictions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Combiner {
    /// Elementwise arithmetic mean (regression)
    Average,
    /// Most frequent label per row (classification)
    MajorityVote,
}

impl Combiner {
    pub fn combine(&self, predictions: &[Array1<f64>]) -> Result<Array1<f64>> {
        match self {
            Combiner::Average => average(predictions),
            Combiner::MajorityVote => majority_vote(predictions),
        }
    }
}

/// Row count shared by every prediction vector
fn shared_len(predictions: &[Array1<f64>]) -> Result<usize> {
    let first = predictions.first().ok_or_else(|| {
        FusionError::InvalidInput("No predictions provided".to_string())
    })?;
    let n_samples = first.len();

    if let Some(bad) = predictions.iter().find(|p| p.len() != n_samples) {
        return Err(FusionError::ShapeError {
            expected: format!("{} predictions per source", n_samples),
            actual: format!("{} predictions", bad.len()),
        });
    }
    Ok(n_samples)
}

/// Elementwise mean of equally long prediction vectors
pub fn average(predictions: &[Array1<f64>]) -> Result<Array1<f64>> {
    let n_samples = shared_len(predictions)?;
    let n_sources = predictions.len() as f64;

    let mut sum = Array1::<f64>::zeros(n_samples);
    for pred in predictions {
        sum += pred;
    }
    Ok(sum / n_sources)
}

/// Per-row majority label across equally long prediction vectors
///
/// Ties go to the label that was seen first when scanning sources in order.
pub fn majority_vote(predictions: &[Array1<f64>]) -> Result<Array1<f64>> {
    let n_samples = shared_len(predictions)?;

    (0..n_samples)
        .map(|i| {
            vote(predictions.iter().map(|p| p[i])).ok_or_else(|| {
                FusionError::ComputationError(format!("no votes for row {}", i))
            })
        })
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from_vec)
}

/// Most frequent value, first-seen wins ties; `None` for no votes
pub(crate) fn vote(labels: impl IntoIterator<Item = f64>) -> Option<f64> {
    // Insertion-ordered tally; the label sets here are tiny
    let mut tally: Vec<(f64, usize)> = Vec::new();
    for label in labels {
        match tally.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => *count += 1,
            None => tally.push((label, 1)),
        }
    }

    let mut best: Option<(f64, usize)> = None;
    for (label, count) in tally {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_average_two_sources() {
        let combined = average(&[array![2.0, 4.0], array![4.0, 6.0]]).unwrap();
        assert_eq!(combined, array![3.0, 5.0]);
    }

    #[test]
    fn test_majority_vote_three_sources() {
        let m1 = array![1.0, 0.0, 1.0];
        let m2 = array![1.0, 1.0, 0.0];
        let m3 = array![1.0, 0.0, 0.0];
        let combined = majority_vote(&[m1, m2, m3]).unwrap();
        assert_eq!(combined, array![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_majority_vote_tie_takes_first_seen() {
        let combined = majority_vote(&[array![0.0, 1.0], array![1.0, 0.0]]).unwrap();
        assert_eq!(combined, array![0.0, 1.0]);
    }

    #[test]
    fn test_vote_single_source_is_identity() {
        let p = array![1.0, 0.0, 1.0];
        assert_eq!(majority_vote(&[p.clone()]).unwrap(), p);
        assert_eq!(average(&[p.clone()]).unwrap(), p);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = Combiner::Average.combine(&[array![1.0, 2.0], array![1.0]]);
        assert!(matches!(result, Err(FusionError::ShapeError { .. })));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            Combiner::MajorityVote.combine(&[]),
            Err(FusionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_vote_helper() {
        assert_eq!(vote([2.0, 1.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(vote([0.0, 1.0, 1.0]), Some(1.0));
        assert_eq!(vote(std::iter::empty()), None);
    }
}
