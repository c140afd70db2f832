// ============================================================
// Layer 4 — Label Normalizer
// ============================================================
// Min-max scaling of a label column into [0, 1]:
//
//   fit:   y = (x - min) / (max - min)
//   unfit: x = y * (max - min) + min
//
// The (min, max) pair of every (language pair, table) column is
// kept for the whole run, because predictions are only turned
// back into the original scale after every fold has finished.
// Predictions live in the same normalised space as the labels,
// so they are denormalised with the state of the table they
// were made for.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::dataset::{LanguagePair, Split};
use crate::domain::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationState {
    pub min: f64,
    pub max: f64,
}

impl NormalizationState {
    /// Derive the state from a column. Fails on an empty column, a
    /// non-finite value, or a column where every value is equal.
    pub fn from_values(values: &[f64]) -> PipelineResult<Self> {
        if values.is_empty() {
            return Err(PipelineError::data("cannot normalise an empty column"));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(PipelineError::data(format!("cannot normalise non-finite value {bad}")));
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max == min {
            return Err(PipelineError::data(format!(
                "degenerate label range: every value is {min}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn apply(&self, x: f64) -> f64 {
        (x - self.min) / (self.max - self.min)
    }

    pub fn invert(&self, y: f64) -> f64 {
        y * (self.max - self.min) + self.min
    }
}

/// Owns every normalization state of a run.
#[derive(Debug, Default)]
pub struct Normalizer {
    states: IndexMap<(LanguagePair, Split), NormalizationState>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalise `values` in place and remember the state for
    /// (language, split). Fitting the same column twice is an error.
    pub fn fit(
        &mut self,
        language: &LanguagePair,
        split:    Split,
        values:   &mut [f64],
    ) -> PipelineResult<NormalizationState> {
        let key = (language.clone(), split);
        if self.states.contains_key(&key) {
            return Err(PipelineError::data(format!("{language} {split} labels were already normalised")));
        }

        let state = NormalizationState::from_values(values)
            .map_err(|e| PipelineError::data(format!("{language} {split}: {e}")))?;
        for v in values.iter_mut() {
            *v = state.apply(*v);
        }

        tracing::debug!(
            "Normalised {} {} labels: min={:.4}, max={:.4}",
            language, split, state.min, state.max
        );
        self.states.insert(key, state);
        Ok(state)
    }

    /// Apply the inverse transform of (language, split) in place.
    pub fn unfit(&self, language: &LanguagePair, split: Split, values: &mut [f64]) -> PipelineResult<()> {
        let state = self.state(language, split)?;
        for v in values.iter_mut() {
            *v = state.invert(*v);
        }
        Ok(())
    }

    pub fn state(&self, language: &LanguagePair, split: Split) -> PipelineResult<NormalizationState> {
        self.states
            .get(&(language.clone(), split))
            .copied()
            .ok_or_else(|| PipelineError::data(format!("{language} {split} labels were never normalised")))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn lp() -> LanguagePair {
        LanguagePair::new("NE-EN")
    }

    #[test]
    fn test_maps_into_unit_interval() {
        let mut n      = Normalizer::new();
        let mut values = vec![-2.0, 0.0, 2.0];
        let state      = n.fit(&lp(), Split::Train, &mut values).unwrap();

        assert_eq!(state, NormalizationState { min: -2.0, max: 2.0 });
        assert_eq!(values, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_round_trip() {
        let original   = vec![-1.37, 0.22, 0.91, -0.05, 1.8];
        let mut values = original.clone();
        let mut n      = Normalizer::new();
        n.fit(&lp(), Split::Dev, &mut values).unwrap();
        n.unfit(&lp(), Split::Dev, &mut values).unwrap();

        for (a, b) in original.iter().zip(&values) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_degenerate_column_is_data_error() {
        let mut n = Normalizer::new();
        let err   = n.fit(&lp(), Split::Train, &mut [0.3, 0.3]).unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn test_empty_column_is_data_error() {
        let mut n = Normalizer::new();
        assert!(n.fit(&lp(), Split::Train, &mut []).is_err());
    }

    #[test]
    fn test_unfit_without_state_fails() {
        let n = Normalizer::new();
        assert!(n.unfit(&lp(), Split::Test, &mut [0.5]).is_err());
    }

    #[test]
    fn test_states_are_per_language_and_split() {
        let mut n = Normalizer::new();
        n.fit(&lp(), Split::Train, &mut [0.0, 10.0]).unwrap();
        n.fit(&lp(), Split::Dev, &mut [0.0, 2.0]).unwrap();
        n.fit(&LanguagePair::new("SI-EN"), Split::Train, &mut [1.0, 3.0]).unwrap();

        let mut prediction = [0.5];
        n.unfit(&lp(), Split::Dev, &mut prediction).unwrap();
        assert_eq!(prediction, [1.0]);
        assert!(n.fit(&lp(), Split::Train, &mut [0.0, 1.0]).is_err());
    }
}
