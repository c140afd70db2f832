// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Trains one fold of the ensemble with Burn's DataLoader and Adam.
//
//   - Training uses TrainBackend (Autodiff<NdArray>) for gradients
//   - model.valid() returns the model on InnerBackend (NdArray),
//     which is what evaluation and checkpointing use
//   - learning rate: linear warmup over `warmup_steps`, then linear
//     decay to zero at the last step
//   - evaluation every `evaluation_steps` steps and at the end of
//     every epoch; the checkpoint with the best eval Spearman wins
//   - with an empty eval partition there is nothing to select on,
//     so the final weights become the checkpoint
//   - the plan's seed drives both the weight initialisation and the
//     batch shuffle, so a fold is reproducible
//
// Reference: Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use std::sync::Arc;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::data::{batcher::{PairBatch, PairBatcher}, dataset::PairDataset};
use crate::domain::plan::TrainingPlan;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{pearson, spearman, EvalMetrics, MetricsLogger};
use crate::ml::model::{SiameseConfig, SiameseRegressor};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
pub type InnerBackend = burn::backend::NdArray;

/// Linear warmup followed by linear decay to zero.
#[derive(Debug, Clone, Copy)]
pub struct WarmupLinear {
    pub learning_rate: f64,
    pub warmup_steps:  usize,
    pub total_steps:   usize,
}

impl WarmupLinear {
    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.learning_rate * (step + 1) as f64 / self.warmup_steps as f64;
        }
        let remaining = self.total_steps.saturating_sub(step) as f64;
        let decay     = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
        self.learning_rate * (remaining / decay).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub steps:      usize,
    pub best_step:  usize,
    /// Best eval Spearman, or None when the eval partition was empty.
    pub best_score: Option<f64>,
}

pub fn run_training(
    plan:      &TrainingPlan,
    model_cfg: &SiameseConfig,
    train:     PairDataset,
    eval:      PairDataset,
    ckpt:      &CheckpointManager,
) -> Result<FitOutcome> {
    if train.sample_count() == 0 {
        bail!("fold {} has an empty train partition", plan.fold);
    }
    if plan.batch_size == 0 {
        bail!("train batch size must be at least 1");
    }

    let device = burn::backend::ndarray::NdArrayDevice::default();
    let mut model: SiameseRegressor<TrainBackend> = model_cfg.init(plan.seed, &device);
    let mut optim = AdamConfig::new()
        .with_epsilon(plan.adam_epsilon as f32)
        .init();

    let steps_per_epoch = train.sample_count().div_ceil(plan.batch_size);
    let schedule = WarmupLinear {
        learning_rate: plan.learning_rate,
        warmup_steps:  plan.warmup_steps,
        total_steps:   steps_per_epoch * plan.epochs,
    };

    let train_loader = DataLoaderBuilder::new(PairBatcher::<TrainBackend>::new(device.clone()))
        .batch_size(plan.batch_size)
        .shuffle(plan.seed)
        .build(train);

    let has_eval    = eval.sample_count() > 0;
    let eval_labels = eval.labels();
    let eval_loader = DataLoaderBuilder::new(PairBatcher::<InnerBackend>::new(device.clone()))
        .batch_size(plan.eval_batch_size.max(1))
        .build(eval);

    let logger = MetricsLogger::new(&plan.cache_dir)?;
    let mut best_score: Option<f64> = None;
    let mut best_step   = 0usize;
    let mut step        = 0usize;

    for epoch in 1..=plan.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(batch.features_a, batch.features_b, batch.labels);

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(schedule.lr_at(step), model, grads);
            step += 1;

            if has_eval && plan.evaluation_steps > 0 && step % plan.evaluation_steps == 0 {
                let metrics = evaluate(&model.valid(), &eval_loader, &eval_labels, step, epoch, loss_sum / batches as f64);
                logger.log(&metrics)?;
                if metrics.is_improvement(best_score) {
                    ckpt.save_model(&model.valid(), step)?;
                    best_score = Some(metrics.selection_score());
                    best_step  = step;
                }
            }
        }

        let avg_train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };

        if has_eval {
            let metrics = evaluate(&model.valid(), &eval_loader, &eval_labels, step, epoch, avg_train_loss);
            logger.log(&metrics)?;
            println!(
                "Fold {} | Epoch {:>3}/{} | train_loss={:.4} | eval_pearson={:.4} | eval_spearman={:.4}",
                plan.fold, epoch, plan.epochs, avg_train_loss, metrics.eval_pearson, metrics.eval_spearman,
            );
            if metrics.is_improvement(best_score) {
                ckpt.save_model(&model.valid(), step)?;
                best_score = Some(metrics.selection_score());
                best_step  = step;
            }
        } else {
            println!(
                "Fold {} | Epoch {:>3}/{} | train_loss={:.4}",
                plan.fold, epoch, plan.epochs, avg_train_loss,
            );
        }
    }

    if !has_eval || !ckpt.has_checkpoint() {
        ckpt.save_model(&model.valid(), step)?;
        best_step = step;
    }

    tracing::info!(
        "Fold {} trained for {} steps; best checkpoint at step {} (eval spearman {:?})",
        plan.fold, step, best_step, best_score,
    );
    Ok(FitOutcome { steps: step, best_step, best_score })
}

/// Score the eval partition and compare against its labels.
fn evaluate(
    model:      &SiameseRegressor<InnerBackend>,
    loader:     &Arc<dyn DataLoader<PairBatch<InnerBackend>>>,
    labels:     &[f64],
    step:       usize,
    epoch:      usize,
    train_loss: f64,
) -> EvalMetrics {
    let predictions = predict(model, loader);
    EvalMetrics {
        step,
        epoch,
        train_loss,
        eval_pearson:  pearson(labels, &predictions),
        eval_spearman: spearman(labels, &predictions),
    }
}

/// Run `model` over every batch of `loader`, in loader order.
pub fn predict<B: Backend>(
    model:  &SiameseRegressor<B>,
    loader: &Arc<dyn DataLoader<PairBatch<B>>>,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(loader.num_items());
    for batch in loader.iter() {
        let scores = model.forward(batch.features_a, batch.features_b);
        out.extend(scores.into_data().iter::<f32>().map(f64::from));
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::features::BagOfWordsFeaturizer;
    use crate::infra::tokenizer_store::TokenizerStore;
    use crate::domain::dataset::{LanguagePair, PooledRow, RowOrigin, TextPair};
    use tempfile::tempdir;

    #[test]
    fn test_warmup_then_decay() {
        let s = WarmupLinear { learning_rate: 1.0, warmup_steps: 4, total_steps: 12 };
        assert!((s.lr_at(0) - 0.25).abs() < 1e-12);
        assert!((s.lr_at(3) - 1.0).abs() < 1e-12);
        assert!((s.lr_at(4) - 1.0).abs() < 1e-12);
        assert!((s.lr_at(8) - 0.5).abs() < 1e-12);
        assert_eq!(s.lr_at(12), 0.0);
    }

    #[test]
    fn test_no_warmup_starts_at_full_rate() {
        let s = WarmupLinear { learning_rate: 0.1, warmup_steps: 0, total_steps: 10 };
        assert!((s.lr_at(0) - 0.1).abs() < 1e-12);
    }

    fn rows(n: usize) -> Vec<PooledRow> {
        (0..n)
            .map(|i| PooledRow {
                origin: RowOrigin { language: LanguagePair::new("EN-DE"), row: i },
                pair:   TextPair::new(format!("sentence number {i}"), format!("Satz Nummer {i}")),
                label:  (i % 5) as f64 / 4.0,
            })
            .collect()
    }

    fn featurizer(dir: &std::path::Path, rows: &[PooledRow]) -> BagOfWordsFeaturizer {
        let texts     = rows.iter().flat_map(|r| [r.pair.text_a.as_str(), r.pair.text_b.as_str()]);
        let tokenizer = TokenizerStore::new(dir.join("vocab")).build_and_save(texts, 32).unwrap();
        BagOfWordsFeaturizer::new(tokenizer, 32, 16)
    }

    fn plan(dir: &std::path::Path) -> TrainingPlan {
        TrainingPlan {
            fold:             0,
            cache_dir:        dir.join("cache"),
            best_model_dir:   dir.join("best"),
            epochs:           2,
            batch_size:       4,
            eval_batch_size:  8,
            learning_rate:    1e-3,
            adam_epsilon:     1e-8,
            warmup_steps:     1,
            evaluation_steps: 3,
            max_seq_length:   16,
            seed:             7,
        }
    }

    #[test]
    fn test_training_saves_a_checkpoint() {
        let dir        = tempdir().unwrap();
        let plan       = plan(dir.path());
        let ckpt       = CheckpointManager::new(&plan.best_model_dir).unwrap();
        let all        = rows(12);
        let featurizer = featurizer(dir.path(), &all[..10]);

        let outcome = run_training(
            &plan,
            &SiameseConfig::new(32, 16, 8),
            PairDataset::from_rows(&all[..10], &featurizer).unwrap(),
            PairDataset::from_rows(&all[10..], &featurizer).unwrap(),
            &ckpt,
        )
        .unwrap();

        assert_eq!(outcome.steps, 6);
        assert!(ckpt.has_checkpoint());
        assert!(plan.cache_dir.join("metrics.csv").exists());
    }

    #[test]
    fn test_empty_eval_still_checkpoints_final_weights() {
        let dir        = tempdir().unwrap();
        let plan       = plan(dir.path());
        let ckpt       = CheckpointManager::new(&plan.best_model_dir).unwrap();
        let train      = rows(5);
        let featurizer = featurizer(dir.path(), &train);

        let outcome = run_training(
            &plan,
            &SiameseConfig::new(32, 16, 8),
            PairDataset::from_rows(&train, &featurizer).unwrap(),
            PairDataset::new(Vec::new()),
            &ckpt,
        )
        .unwrap();

        assert_eq!(outcome.best_score, None);
        assert_eq!(outcome.best_step, outcome.steps);
        assert!(ckpt.has_checkpoint());
    }

    #[test]
    fn test_empty_train_partition_fails() {
        let dir  = tempdir().unwrap();
        let plan = plan(dir.path());
        let ckpt = CheckpointManager::new(&plan.best_model_dir).unwrap();
        let res  = run_training(
            &plan,
            &SiameseConfig::new(32, 16, 8),
            PairDataset::new(Vec::new()),
            PairDataset::new(Vec::new()),
            &ckpt,
        );
        assert!(res.is_err());
    }
}
