// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the TSV files on disk and the tensor
// batches the model consumes:
//
//   TSV files (one train/dev/test triple per language pair)
//       │
//       ▼
//   reader          → raw rows, missing fields as None
//       │
//       ▼
//   preprocessor    → drops incomplete rows, cleans whitespace
//       │
//       ▼
//   normalizer      → labels into [0, 1], state kept per table
//       │
//       ▼
//   splitter        → seeded (train, eval) partition per fold
//       │
//       ▼
//   features        → bag-of-words vectors over the fold vocabulary
//       │
//       ▼
//   dataset/batcher → Burn Dataset + Batcher for the training loop

/// Reads the manifest and the per-language TSV tables
pub mod reader;

/// Drops incomplete rows and normalises whitespace
pub mod preprocessor;

/// Reversible min-max label scaling
pub mod normalizer;

/// Seeded per-fold train/eval resampling
pub mod splitter;

/// Bag-of-words featurizer for text segments
pub mod features;

/// Implements Burn's Dataset trait for text-pair samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
