// ============================================================
// Layer 2 — EnsembleTrainer
// ============================================================
// Trains the model of one fold:
//
//   1. acquire a fresh FoldWorkspace (both fold directories empty)
//   2. build the fold's TrainingPlan from the run configuration
//   3. save the plan next to the checkpoint
//   4. hand the partitions to the model collaborator
//
// The returned TrainedFold owns the workspace, so the fold's
// directories stay alive exactly as long as its artifact is used
// for scoring.

use std::fs;

use crate::application::ensemble_use_case::EnsembleConfig;
use crate::domain::dataset::PooledRow;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::plan::{warmup_steps, TrainingPlan};
use crate::domain::traits::QualityEstimator;
use crate::infra::workspace::FoldWorkspace;

const PLAN_FILE: &str = "training_plan.json";

/// A fitted fold. Dropping it releases the fold directories.
pub struct TrainedFold<A> {
    pub artifact:  A,
    pub workspace: FoldWorkspace,
}

pub struct EnsembleTrainer<'a, E: QualityEstimator> {
    estimator: &'a E,
    config:    &'a EnsembleConfig,
}

impl<'a, E: QualityEstimator> EnsembleTrainer<'a, E> {
    pub fn new(estimator: &'a E, config: &'a EnsembleConfig) -> Self {
        Self { estimator, config }
    }

    pub fn plan(&self, workspace: &FoldWorkspace, train_size: usize, seed: u64) -> TrainingPlan {
        let cfg = self.config;
        TrainingPlan {
            fold:             workspace.fold(),
            cache_dir:        workspace.cache_dir().to_path_buf(),
            best_model_dir:   workspace.best_model_dir().to_path_buf(),
            epochs:           cfg.num_train_epochs,
            batch_size:       cfg.train_batch_size,
            eval_batch_size:  cfg.eval_batch_size,
            learning_rate:    cfg.learning_rate,
            adam_epsilon:     cfg.adam_epsilon,
            warmup_steps:     warmup_steps(train_size, cfg.num_train_epochs, cfg.train_batch_size, cfg.warmup_ratio),
            evaluation_steps: cfg.evaluation_steps,
            max_seq_length:   cfg.max_seq_length,
            seed,
        }
    }

    pub fn train(
        &self,
        fold:  usize,
        seed:  u64,
        train: &[PooledRow],
        eval:  &[PooledRow],
    ) -> PipelineResult<TrainedFold<E::Artifact>> {
        let workspace = FoldWorkspace::acquire(
            &self.config.cache_dir,
            &self.config.best_model_dir,
            fold,
            self.config.keep_checkpoints,
        )?;
        let plan = self.plan(&workspace, train.len(), seed);

        let plan_path = workspace.best_model_dir().join(PLAN_FILE);
        let json = serde_json::to_string_pretty(&plan)
            .map_err(|e| PipelineError::training(fold, e.into()))?;
        fs::write(&plan_path, json).map_err(|e| PipelineError::io(&plan_path, e))?;

        tracing::info!(
            "Fold {}: training on {} rows, evaluating on {} ({} warmup steps)",
            fold,
            train.len(),
            eval.len(),
            plan.warmup_steps,
        );

        let artifact = self
            .estimator
            .fit(&plan, train, eval)
            .map_err(|e| PipelineError::training(fold, e))?;

        Ok(TrainedFold { artifact, workspace })
    }
}
