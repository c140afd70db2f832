// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the model layer and the
// orchestration:
//
//   checkpoint.rs  — best-model weights of a fold (Burn
//                    CompactRecorder) and the JSON model config
//                    needed to rebuild it
//
//   tokenizer_store.rs — the fold's word-level vocabulary, saved
//                    as tokenizer.json beside the checkpoint
//
//   workspace.rs   — per-fold scratch and checkpoint directories
//                    that start empty and are cleaned up, plus the
//                    staging directory final outputs are committed
//                    from
//
//   metrics.rs     — RMSE / MAE / Pearson / Spearman, and the
//                    per-fold evaluation CSV log
//
//   score_file.rs  — one-float-per-line score files
//
//   results.rs     — dev/test result tables and submission files
//
//   plot.rs        — label vs. prediction scatter plots (SVG)
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Fold vocabulary building, saving and loading
pub mod tokenizer_store;

/// Fold directories and output staging
pub mod workspace;

/// Summary statistics and evaluation CSV logger
pub mod metrics;

/// Score wire file
pub mod score_file;

/// Result tables and submission writer
pub mod results;

/// Scatter plots
pub mod plot;
