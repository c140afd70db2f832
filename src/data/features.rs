// ============================================================
// Layer 4 — Bag-of-Words Featurizer
// ============================================================
// Converts a text segment into a fixed-size dense vector that
// the siamese tower can consume:
//
//   - encode with the fold's word-level tokenizer and keep the
//     first `max_seq_length` token ids
//   - every token adds 1.0 at its id; ids outside the vector
//     count as [UNK]
//   - the vector is L2-normalised
//
// The vector length is the configured vocabulary size, so a
// tokenizer built with that size fills it exactly.

use anyhow::Result;
use tokenizers::Tokenizer;

const UNK_ID: usize = 1;

#[derive(Debug, Clone)]
pub struct BagOfWordsFeaturizer {
    tokenizer:      Tokenizer,
    dim:            usize,
    max_seq_length: usize,
}

impl BagOfWordsFeaturizer {
    pub fn new(tokenizer: Tokenizer, dim: usize, max_seq_length: usize) -> Self {
        Self { tokenizer, dim: dim.max(UNK_ID + 1), max_seq_length }
    }

    pub fn features(&self, text: &str) -> Result<Vec<f32>> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        let mut v = vec![0.0f32; self.dim];
        for &id in enc.get_ids().iter().take(self.max_seq_length) {
            let id = id as usize;
            v[if id < self.dim { id } else { UNK_ID }] += 1.0;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(v)
    }
}
