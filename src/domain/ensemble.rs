// ============================================================
// Layer 3 — Prediction Matrix and Ensemble Aggregator
// ============================================================
// Every fold scores every dev and test row of every language
// pair. Those scores are collected into one `rows × k` matrix
// per (language pair, table):
//
//              fold 0   fold 1   ...   fold k-1
//     row 0    0.41     0.44           0.39
//     row 1    0.77     0.70           0.74
//     ...
//
// A fold writes its whole column at once. Each column may be
// written exactly once, and the row-wise mean is only available
// once every column is present. Reducing early is a usage error,
// never a silent partial average.

use indexmap::IndexMap;

use crate::domain::dataset::{LanguagePair, Split};
use crate::domain::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone)]
pub struct PredictionMatrix {
    rows:    usize,
    columns: Vec<Option<Vec<f64>>>,
}

impl PredictionMatrix {
    pub fn new(rows: usize, folds: usize) -> Self {
        Self { rows, columns: vec![None; folds] }
    }

    pub fn write_column(&mut self, fold: usize, scores: &[f64]) -> PipelineResult<()> {
        let rows  = self.rows;
        let folds = self.columns.len();
        let slot  = self.columns.get_mut(fold).ok_or_else(|| {
            PipelineError::aggregation(format!("fold {fold} is outside 0..{folds}"))
        })?;

        if slot.is_some() {
            return Err(PipelineError::aggregation(format!(
                "fold {fold} was already recorded"
            )));
        }
        if scores.len() != rows {
            return Err(PipelineError::aggregation(format!(
                "fold {fold} produced {} scores for {rows} rows",
                scores.len()
            )));
        }

        *slot = Some(scores.to_vec());
        Ok(())
    }

    pub fn missing_folds(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(fold, _)| fold)
            .collect()
    }

    /// Row-wise arithmetic mean over all folds.
    ///
    /// Folds are summed in index order, so identical columns always
    /// give bit-identical results.
    pub fn mean(&self) -> PipelineResult<Vec<f64>> {
        if self.columns.is_empty() {
            return Err(PipelineError::aggregation("matrix has no folds to average"));
        }
        let missing = self.missing_folds();
        if !missing.is_empty() {
            return Err(PipelineError::aggregation(format!(
                "folds {missing:?} have not been recorded"
            )));
        }

        let k = self.columns.len() as f64;
        let means = (0..self.rows)
            .map(|row| {
                let sum: f64 = self
                    .columns
                    .iter()
                    .flatten()
                    .map(|column| column[row])
                    .sum();
                sum / k
            })
            .collect();
        Ok(means)
    }
}

// ─── EnsembleAggregator ──────────────────────────────────────────────────────
/// Owns one PredictionMatrix per (language pair, table), kept in
/// registration order.
#[derive(Debug)]
pub struct EnsembleAggregator {
    folds:    usize,
    matrices: IndexMap<(LanguagePair, Split), PredictionMatrix>,
}

impl EnsembleAggregator {
    pub fn new(folds: usize) -> Self {
        Self { folds, matrices: IndexMap::new() }
    }

    /// Allocate the matrix for one table. Must happen before any fold runs.
    pub fn register(&mut self, language: &LanguagePair, split: Split, rows: usize) -> PipelineResult<()> {
        let key = (language.clone(), split);
        if self.matrices.contains_key(&key) {
            return Err(PipelineError::aggregation(format!(
                "{language} {split} is already registered"
            )));
        }
        self.matrices.insert(key, PredictionMatrix::new(rows, self.folds));
        Ok(())
    }

    pub fn record(
        &mut self,
        language: &LanguagePair,
        split:    Split,
        fold:     usize,
        scores:   &[f64],
    ) -> PipelineResult<()> {
        self.matrices
            .get_mut(&(language.clone(), split))
            .ok_or_else(|| PipelineError::aggregation(format!("{language} {split} is not registered")))?
            .write_column(fold, scores)
            .map_err(|e| match e {
                PipelineError::Aggregation(msg) => {
                    PipelineError::aggregation(format!("{language} {split}: {msg}"))
                }
                other => other,
            })
    }

    pub fn reduce(&self, language: &LanguagePair, split: Split) -> PipelineResult<Vec<f64>> {
        self.matrices
            .get(&(language.clone(), split))
            .ok_or_else(|| PipelineError::aggregation(format!("{language} {split} is not registered")))?
            .mean()
            .map_err(|e| match e {
                PipelineError::Aggregation(msg) => {
                    PipelineError::aggregation(format!("{language} {split}: {msg}"))
                }
                other => other,
            })
    }
}
