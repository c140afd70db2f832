// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two concerns live here:
//
// 1. Summary statistics between labels and predictions, used
//    during training (eval partition) and when reporting a
//    language pair (dev table):
//      - RMSE      root mean squared error
//      - MAE       mean absolute error
//      - Pearson   linear correlation
//      - Spearman  rank correlation (ties get their average rank)
//    A correlation over a constant column is undefined and
//    reported as NaN.
//
// 2. A CSV log of every evaluation during a fold:
//
//      step,epoch,train_loss,eval_pearson,eval_spearman
//      100,1,0.083100,0.412000,0.398000
//      ...
//
//    written to <cache_dir>/fold_<i>/metrics.csv.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

// ─── Summary statistics ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count:    usize,
    pub rmse:     f64,
    pub mae:      f64,
    pub pearson:  f64,
    pub spearman: f64,
}

impl SummaryStats {
    pub fn compute(labels: &[f64], predictions: &[f64]) -> Self {
        let n = labels.len().min(predictions.len());
        let (labels, predictions) = (&labels[..n], &predictions[..n]);

        let (rmse, mae) = if n == 0 {
            (f64::NAN, f64::NAN)
        } else {
            let sq: f64  = labels.iter().zip(predictions).map(|(l, p)| (l - p).powi(2)).sum();
            let abs: f64 = labels.iter().zip(predictions).map(|(l, p)| (l - p).abs()).sum();
            ((sq / n as f64).sqrt(), abs / n as f64)
        };

        Self {
            count:    n,
            rmse,
            mae,
            pearson:  pearson(labels, predictions),
            spearman: spearman(labels, predictions),
        }
    }
}

pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let mut cov   = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x[..n].iter().zip(&y[..n]) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov   += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

/// 1-based ranks, ties share their average rank.
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    pearson(&ranks(&x[..n]), &ranks(&y[..n]))
}

// ─── Evaluation log ──────────────────────────────────────────────────────────

/// One evaluation of the model on a fold's eval partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub step:          usize,
    pub epoch:         usize,
    pub train_loss:    f64,
    pub eval_pearson:  f64,
    pub eval_spearman: f64,
}

impl EvalMetrics {
    /// Score used to pick the best checkpoint. NaN never wins.
    pub fn selection_score(&self) -> f64 {
        if self.eval_spearman.is_nan() { f64::NEG_INFINITY } else { self.eval_spearman }
    }

    pub fn is_improvement(&self, best: Option<f64>) -> bool {
        match best {
            None       => true,
            Some(best) => self.selection_score() > best,
        }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "step,epoch,train_loss,eval_pearson,eval_spearman")?;
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EvalMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6}",
            m.step, m.epoch, m.train_loss, m.eval_pearson, m.eval_spearman,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
