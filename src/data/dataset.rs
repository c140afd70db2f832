use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::features::BagOfWordsFeaturizer;
use crate::domain::dataset::{PooledRow, TextPair};

/// One featurised (text_a, text_b, label) example.
/// Scoring rows carry a label of 0.0 that is never read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSample {
    pub features_a: Vec<f32>,
    pub features_b: Vec<f32>,
    pub label:      f32,
}

pub struct PairDataset {
    samples: Vec<PairSample>,
}

impl PairDataset {
    pub fn new(samples: Vec<PairSample>) -> Self { Self { samples } }

    pub fn from_rows(rows: &[PooledRow], featurizer: &BagOfWordsFeaturizer) -> Result<Self> {
        let samples = rows
            .iter()
            .map(|r| {
                Ok(PairSample {
                    features_a: featurizer.features(&r.pair.text_a)?,
                    features_b: featurizer.features(&r.pair.text_b)?,
                    label:      r.label as f32,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(samples))
    }

    pub fn from_pairs(pairs: &[TextPair], featurizer: &BagOfWordsFeaturizer) -> Result<Self> {
        let samples = pairs
            .iter()
            .map(|p| {
                Ok(PairSample {
                    features_a: featurizer.features(&p.text_a)?,
                    features_b: featurizer.features(&p.text_b)?,
                    label:      0.0,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(samples))
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    pub fn labels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.label as f64).collect()
    }
}

impl Dataset<PairSample> for PairDataset {
    fn get(&self, index: usize) -> Option<PairSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{LanguagePair, RowOrigin};
    use crate::infra::tokenizer_store::TokenizerStore;
    use tempfile::tempdir;

    #[test]
    fn test_from_rows_keeps_order_and_labels() {
        let dir        = tempdir().unwrap();
        let tokenizer  = TokenizerStore::new(dir.path()).build_and_save(["good morning", "早上好"], 32).unwrap();
        let featurizer = BagOfWordsFeaturizer::new(tokenizer, 32, 80);
        let rows = vec![
            PooledRow {
                origin: RowOrigin { language: LanguagePair::new("EN-ZH"), row: 4 },
                pair:   TextPair::new("good morning", "早上好"),
                label:  0.75,
            },
            PooledRow {
                origin: RowOrigin { language: LanguagePair::new("EN-ZH"), row: 9 },
                pair:   TextPair::new("bad", "坏"),
                label:  0.25,
            },
        ];
        let ds = PairDataset::from_rows(&rows, &featurizer).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.labels(), vec![0.75, 0.25]);
        assert_eq!(ds.get(0).unwrap().features_a.len(), 32);
        assert!(ds.get(2).is_none());
    }
}
