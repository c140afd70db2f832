// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `report`, and all
// their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::ensemble_use_case::EnsembleConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a k-fold ensemble on every language pair of a manifest
    /// and write results, plots and submission files
    Train(TrainArgs),

    /// Recompute statistics (and optionally the scatter plot) of an
    /// existing result table
    Report(ReportArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON manifest listing the train/dev/test files of each language pair
    #[arg(long)]
    pub manifest: PathBuf,

    /// Number of folds; 0 writes the tables without training
    #[arg(long, default_value_t = 3)]
    pub n_fold: usize,

    #[arg(long, default_value_t = 8)]
    pub train_batch_size: usize,

    /// Batch size used when scoring eval, dev and test rows
    #[arg(long, default_value_t = 8)]
    pub eval_batch_size: usize,

    #[arg(long, default_value_t = 6)]
    pub num_train_epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 1e-8)]
    pub adam_epsilon: f64,

    /// Share of all optimiser steps spent warming up the learning rate
    #[arg(long, default_value_t = 0.1)]
    pub warmup_ratio: f64,

    /// Evaluate on the fold's eval partition every N steps
    #[arg(long, default_value_t = 100)]
    pub evaluation_steps: usize,

    /// Words per segment kept by the featuriser
    #[arg(long, default_value_t = 80)]
    pub max_seq_length: usize,

    /// Skip the ensemble entirely and only write the result tables
    #[arg(long)]
    pub no_evaluate_during_training: bool,

    /// Share of the pooled training rows held out per fold
    #[arg(long, default_value_t = 0.1)]
    pub eval_fraction: f64,

    #[arg(long, default_value_t = 777)]
    pub seed: u64,

    #[arg(long, default_value = "temp/cache_dir")]
    pub cache_dir: PathBuf,

    #[arg(long, default_value = "temp/best_model")]
    pub best_model_dir: PathBuf,

    #[arg(long, default_value = "temp/data")]
    pub output_dir: PathBuf,

    /// Keep each fold's best checkpoint after the run
    #[arg(long)]
    pub keep_checkpoints: bool,

    /// Method name written into submission files
    #[arg(long, default_value = "SiameseQE")]
    pub method: String,

    /// Vocabulary size of each fold, and so the length of the
    /// bag-of-words vector
    #[arg(long, default_value_t = 4096)]
    pub feature_dim: usize,

    #[arg(long, default_value_t = 256)]
    pub hidden_dim: usize,

    #[arg(long, default_value_t = 128)]
    pub embedding_dim: usize,
}

/// Convert CLI TrainArgs into the application-layer EnsembleConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for EnsembleConfig {
    fn from(a: TrainArgs) -> Self {
        EnsembleConfig {
            n_fold:                   a.n_fold,
            train_batch_size:         a.train_batch_size,
            eval_batch_size:          a.eval_batch_size,
            num_train_epochs:         a.num_train_epochs,
            learning_rate:            a.learning_rate,
            adam_epsilon:             a.adam_epsilon,
            warmup_ratio:             a.warmup_ratio,
            evaluation_steps:         a.evaluation_steps,
            max_seq_length:           a.max_seq_length,
            evaluate_during_training: !a.no_evaluate_during_training,
            eval_fraction:            a.eval_fraction,
            seed:                     a.seed,
            cache_dir:                a.cache_dir,
            best_model_dir:           a.best_model_dir,
            output_dir:               a.output_dir,
            keep_checkpoints:         a.keep_checkpoints,
            method:                   a.method,
            feature_dim:              a.feature_dim,
            hidden_dim:               a.hidden_dim,
            embedding_dim:            a.embedding_dim,
        }
    }
}

/// All arguments for the `report` command
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// A result_<LP>.tsv written by `train`
    #[arg(long)]
    pub result_file: PathBuf,

    /// Where to draw the scatter plot; skipped when absent
    #[arg(long)]
    pub plot: Option<PathBuf>,
}
