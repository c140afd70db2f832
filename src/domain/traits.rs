// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The orchestration never touches a concrete model or file
// format. It only sees these traits:
//
//   - LanguagePairSource → something that yields raw datasets
//                          (TsvLoader reads them from disk)
//   - QualityEstimator   → the regression model collaborator
//                          (SiameseEstimator trains a Burn model,
//                          tests use an in-memory estimator)

use anyhow::Result;

use crate::domain::dataset::{PooledRow, RawDataset, TextPair};
use crate::domain::plan::TrainingPlan;

// ─── LanguagePairSource ──────────────────────────────────────────────────────
/// Any component that can load the raw tables of every configured
/// language pair, in a stable order.
pub trait LanguagePairSource {
    fn load_all(&self) -> Result<Vec<RawDataset>>;
}

// ─── QualityEstimator ────────────────────────────────────────────────────────
/// The pairwise-text regression model.
///
/// `fit` trains one fold and returns whatever the estimator needs
/// to score later. `score` must return exactly one value per input
/// row, in input order.
pub trait QualityEstimator {
    type Artifact;

    fn fit(
        &self,
        plan:  &TrainingPlan,
        train: &[PooledRow],
        eval:  &[PooledRow],
    ) -> Result<Self::Artifact>;

    fn score(&self, artifact: &Self::Artifact, rows: &[TextPair]) -> Result<Vec<f64>>;
}
