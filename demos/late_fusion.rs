//! Late Fusion Example
//!
//! Aggregates synthetic frame-level tables for three modalities, then runs
//! averaged regression fusion, majority-vote classification fusion, minority
//! upsampling and the C sweep on the result.
//!
//! Run with `RUST_LOG=kolosal_fusion=info cargo run --example late_fusion`.

use kolosal_fusion::prelude::*;
use ndarray::Array1;
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const MODALITIES: [&str; 3] = ["audio", "video", "text"];

/// Frame-level table whose columns drift with the subject's score
fn frames(rng: &mut ChaCha8Rng, score: f64, modality: usize) -> PolarsResult<DataFrame> {
    let n_frames = 20;
    let noise = 0.5 + modality as f64 * 0.5;
    let signal: Vec<Option<f64>> = (0..n_frames)
        .map(|_| {
            // Roughly one frame in ten is dropped by the tracker
            if rng.gen_bool(0.1) {
                None
            } else {
                Some(score + rng.gen_range(-noise..noise))
            }
        })
        .collect();
    let texture: Vec<f64> = (0..n_frames).map(|_| rng.gen_range(0.0..1.0)).collect();
    df!("signal" => signal, "texture" => texture)
}

fn modality_split(
    rng: &mut ChaCha8Rng,
    modality: usize,
    train_scores: &[f64],
    test_scores: &[f64],
) -> anyhow::Result<ModalitySplit> {
    let aggregator = FeatureAggregator::new().with_statistics(vec![Statistic::Mean, Statistic::Std]);
    let mut subjects = |scores: &[f64]| -> anyhow::Result<FeatureMatrix> {
        let tables = scores
            .iter()
            .map(|&s| frames(rng, s, modality).map(|df| vec![df]))
            .collect::<PolarsResult<Vec<_>>>()?;
        Ok(aggregator.aggregate_subjects(&tables)?)
    };
    let train = subjects(train_scores)?;
    let test = subjects(test_scores)?;
    Ok(ModalitySplit::new(MODALITIES[modality], train, test)?)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolosal_fusion=info".into()),
        )
        .init();

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let train_scores: Vec<f64> = (0..60).map(|_| rng.gen_range(0.0..25.0)).collect();
    let test_scores: Vec<f64> = (0..20).map(|_| rng.gen_range(0.0..25.0)).collect();

    let modalities = (0..MODALITIES.len())
        .map(|m| modality_split(&mut rng, m, &train_scores, &test_scores))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let config = FusionConfig::default();
    let fusion = LateFusion::from_config(&config);

    // Regression: average per-modality scores
    let labels = SplitLabels::new(Array1::from_vec(train_scores.clone()), Array1::from_vec(test_scores.clone()));
    let regression = fusion.average(&modalities, &labels, &config.regressor_spec())?;

    println!("Averaged late fusion:");
    for m in &regression.modalities {
        println!("  {:<6} MAE {:.3}  RMSE {:.3}", m.modality, m.outcome.metrics.mae, m.outcome.metrics.rmse);
    }
    println!("  fused  MAE {:.3}  RMSE {:.3}", regression.fused.metrics.mae, regression.fused.metrics.rmse);

    // Classification: high scores are the minority positive class
    let to_class = |scores: &[f64]| scores.iter().map(|&s| if s >= 18.0 { 1.0 } else { 0.0 }).collect::<Array1<f64>>();
    let class_labels = SplitLabels::new(to_class(&train_scores), to_class(&test_scores));

    let vote = fusion.majority_vote(&modalities, &class_labels, &config.classifier_spec())?;
    let c = vote.fused.metrics.confusion;
    println!("\nMajority-vote late fusion:");
    println!("  accuracy {:.3}  tn={} fp={} fn={} tp={}", vote.fused.metrics.accuracy, c.tn, c.fp, c.fn_, c.tp);
    println!("  positive F1 {:.3}  macro F1 {:.3}", vote.fused.metrics.positive.f1, vote.fused.metrics.macro_avg.f1);

    let balanced = ClassBalancer::from_config(&config).evaluate(
        &config.upsampled_classifier_spec(),
        &modalities[0],
        &class_labels,
    )?;
    println!("\nUpsampled {} classifier ({} -> {} positives):", modalities[0].name, balanced.n_minority, balanced.n_per_class);
    println!("  accuracy {:.3}", balanced.outcome.metrics.accuracy);

    println!("\nC sweep on {}:", modalities[0].name);
    for candidate in HyperparameterSweeper::from_config(&config).run(&modalities[0], &class_labels)? {
        let c = candidate.metrics.confusion;
        println!(
            "  C={:<8e} accuracy {:.3}  tn={} fp={} fn={} tp={}",
            candidate.c, candidate.metrics.accuracy, c.tn, c.fp, c.fn_, c.tp
        );
    }

    Ok(())
}
