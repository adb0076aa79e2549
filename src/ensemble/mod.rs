//! Ensemble combination module
//!
//! Provides prediction-level fusion:
//! - Averaging (regression)
//! - Majority vote with first-seen tie-break (classification)
//! - Late fusion across modalities, one independently trained model each

pub mod late_fusion;
pub mod voting;

pub use late_fusion::{LateFusion, LateFusionOutcome, ModalityOutcome};
pub use voting::{average, majority_vote, Combiner};
