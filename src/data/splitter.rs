// ============================================================
// Layer 4 — Fold Splitter
// ============================================================
// Resamples the pooled training table into a (train, eval) pair
// for one fold of the ensemble.
//
// Each fold shuffles the row indices with its own seed,
//   seed = seed_base * fold_index
// and takes the first floor(n * eval_fraction) shuffled rows as
// the eval partition and the rest as the train partition. The
// same (table, fold, fraction, seed_base) always gives the same
// split, so a run can be reproduced fold by fold.
//
// Partitions are disjoint and together hold every pooled row.
// Small tables can end up with an empty eval partition; that is
// logged as a warning so it never goes unnoticed.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy)]
pub struct FoldSplitter {
    eval_fraction: f64,
    seed_base:     u64,
}

impl FoldSplitter {
    pub fn new(eval_fraction: f64, seed_base: u64) -> PipelineResult<Self> {
        if !(0.0..1.0).contains(&eval_fraction) {
            return Err(PipelineError::data(format!(
                "eval fraction must be in [0, 1), got {eval_fraction}"
            )));
        }
        Ok(Self { eval_fraction, seed_base })
    }

    pub fn fold_seed(&self, fold: usize) -> u64 {
        self.seed_base.wrapping_mul(fold as u64)
    }

    /// Number of rows held out for evaluation from a table of `total` rows.
    pub fn eval_len(&self, total: usize) -> usize {
        ((total as f64) * self.eval_fraction).floor() as usize
    }

    /// Split `pooled` for `fold` into (train_partition, eval_partition).
    pub fn split<T: Clone>(&self, pooled: &[T], fold: usize) -> (Vec<T>, Vec<T>) {
        let mut order: Vec<usize> = (0..pooled.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.fold_seed(fold));
        order.shuffle(&mut rng);

        let eval_len      = self.eval_len(pooled.len());
        let (eval, train) = order.split_at(eval_len);

        let train: Vec<T> = train.iter().map(|&i| pooled[i].clone()).collect();
        let eval:  Vec<T> = eval.iter().map(|&i| pooled[i].clone()).collect();

        if eval.is_empty() {
            tracing::warn!(
                "Fold {}: eval partition is empty ({} pooled rows, eval fraction {}); \
                 validation and best-checkpoint selection are disabled for this fold",
                fold,
                pooled.len(),
                self.eval_fraction,
            );
        }

        tracing::debug!(
            "Fold {} split (seed {}): {} train, {} eval",
            fold,
            self.fold_seed(fold),
            train.len(),
            eval.len(),
        );

        (train, eval)
    }
}
