// ============================================================
// Layer 5 — Siamese Estimator
// ============================================================
// The QualityEstimator used by the real pipeline.
//
//   fit   → build the fold's vocabulary from its training text,
//           featurise both partitions, train with run_training,
//           then reload the tokenizer and the best checkpoint from
//           the fold's best-model directory
//   score → run the selected model over the rows in order,
//           write the scores to <cache_dir>/result.txt and read
//           them back, so what the ensemble sees is exactly what
//           the fold left on disk

use anyhow::Result;
use burn::data::dataloader::DataLoaderBuilder;
use std::path::PathBuf;

use crate::data::{batcher::PairBatcher, dataset::PairDataset, features::BagOfWordsFeaturizer};
use crate::domain::dataset::{PooledRow, TextPair};
use crate::domain::plan::TrainingPlan;
use crate::domain::traits::QualityEstimator;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::score_file::{read_scores, write_scores};
use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::model::{SiameseConfig, SiameseRegressor};
use crate::ml::trainer::{predict, run_training, InnerBackend};

const SCORE_FILE: &str = "result.txt";

pub struct SiameseEstimator {
    feature_dim:   usize,
    hidden_dim:    usize,
    embedding_dim: usize,
}

/// A trained fold: the selected weights plus what is needed to
/// featurise and batch new rows the same way.
pub struct SiameseArtifact {
    model:           SiameseRegressor<InnerBackend>,
    featurizer:      BagOfWordsFeaturizer,
    eval_batch_size: usize,
    scratch_dir:     PathBuf,
}

impl SiameseEstimator {
    pub fn new(feature_dim: usize, hidden_dim: usize, embedding_dim: usize) -> Self {
        Self { feature_dim, hidden_dim, embedding_dim }
    }

    fn model_config(&self) -> SiameseConfig {
        SiameseConfig::new(self.feature_dim, self.hidden_dim, self.embedding_dim)
    }
}

impl QualityEstimator for SiameseEstimator {
    type Artifact = SiameseArtifact;

    fn fit(&self, plan: &TrainingPlan, train: &[PooledRow], eval: &[PooledRow]) -> Result<SiameseArtifact> {
        let ckpt      = CheckpointManager::new(&plan.best_model_dir)?;
        let tok_store = TokenizerStore::new(&plan.best_model_dir);
        let model_cfg = self.model_config();

        let texts      = train.iter().flat_map(|r| [r.pair.text_a.as_str(), r.pair.text_b.as_str()]);
        let tokenizer  = tok_store.build_and_save(texts, self.feature_dim)?;
        let featurizer = BagOfWordsFeaturizer::new(tokenizer, self.feature_dim, plan.max_seq_length);
        ckpt.save_config(&model_cfg)?;

        let outcome = run_training(
            plan,
            &model_cfg,
            PairDataset::from_rows(train, &featurizer)?,
            PairDataset::from_rows(eval, &featurizer)?,
            &ckpt,
        )?;

        // Rebuild from what the fold left on disk: vocabulary,
        // architecture and the selected weights.
        let device     = burn::backend::ndarray::NdArrayDevice::default();
        let saved      = ckpt.load_config()?;
        let model      = ckpt.load_model(saved.init::<InnerBackend>(plan.seed, &device), &device)?;
        let featurizer = BagOfWordsFeaturizer::new(tok_store.load()?, saved.input_dim, plan.max_seq_length);
        tracing::info!("Fold {} using checkpoint from step {}", plan.fold, outcome.best_step);

        Ok(SiameseArtifact {
            model,
            featurizer,
            eval_batch_size: plan.eval_batch_size.max(1),
            scratch_dir:     plan.cache_dir.clone(),
        })
    }

    fn score(&self, artifact: &SiameseArtifact, rows: &[TextPair]) -> Result<Vec<f64>> {
        let path = artifact.scratch_dir.join(SCORE_FILE);
        if rows.is_empty() {
            write_scores(&path, &[])?;
            return read_scores(&path);
        }

        let device = burn::backend::ndarray::NdArrayDevice::default();
        let loader = DataLoaderBuilder::new(PairBatcher::<InnerBackend>::new(device))
            .batch_size(artifact.eval_batch_size)
            .build(PairDataset::from_pairs(rows, &artifact.featurizer)?);

        write_scores(&path, &predict(&artifact.model, &loader))?;
        read_scores(&path)
    }
}
