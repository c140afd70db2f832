// ============================================================
// Layer 2 — Scorer
// ============================================================
// Applies a fold's artifact to the dev or test rows of one
// language pair. The collaborator must return exactly one score
// per row; anything else is a failure of that fold.

use crate::domain::dataset::TextPair;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::traits::QualityEstimator;

pub struct Scorer<'a, E: QualityEstimator> {
    estimator: &'a E,
}

impl<'a, E: QualityEstimator> Scorer<'a, E> {
    pub fn new(estimator: &'a E) -> Self {
        Self { estimator }
    }

    pub fn score(&self, fold: usize, artifact: &E::Artifact, rows: &[TextPair]) -> PipelineResult<Vec<f64>> {
        let scores = self
            .estimator
            .score(artifact, rows)
            .map_err(|e| PipelineError::training(fold, e))?;

        if scores.len() != rows.len() {
            return Err(PipelineError::training(
                fold,
                anyhow::anyhow!("scored {} rows but {} were given", scores.len(), rows.len()),
            ));
        }
        Ok(scores)
    }
}
