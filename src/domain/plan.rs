// ============================================================
// Layer 3 — Training Plan
// ============================================================
// Everything the model collaborator needs to fit one fold.
// The EnsembleTrainer builds one plan per fold; the collaborator
// never reads the global configuration directly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub fold:             usize,
    /// Scratch directory owned by this fold (score files, metrics).
    pub cache_dir:        PathBuf,
    /// Where the best checkpoint of this fold is persisted.
    pub best_model_dir:   PathBuf,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub eval_batch_size:  usize,
    pub learning_rate:    f64,
    pub adam_epsilon:     f64,
    pub warmup_steps:     usize,
    pub evaluation_steps: usize,
    pub max_seq_length:   usize,
    pub seed:             u64,
}

/// `ceil(epochs * train_size / batch_size * warmup_ratio)`
pub fn warmup_steps(train_size: usize, epochs: usize, batch_size: usize, warmup_ratio: f64) -> usize {
    if batch_size == 0 {
        return 0;
    }
    let steps = (train_size * epochs) as f64 / batch_size as f64 * warmup_ratio;
    steps.ceil().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_steps_rounds_up() {
        // 900 rows * 6 epochs / 8 per batch = 675 steps, 10% = 67.5
        assert_eq!(warmup_steps(900, 6, 8, 0.1), 68);
    }

    #[test]
    fn test_warmup_steps_zero_batch() {
        assert_eq!(warmup_steps(10, 1, 0, 0.1), 0);
    }
}
