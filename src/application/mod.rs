// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer coordinates the other layers. It owns no model code
// and no file formats, only the workflow:
//
//   ensemble_use_case.rs — the k-fold ensemble run, end to end
//   ensemble_trainer.rs  — one fold: fresh workspace, plan, fit
//   scorer.rs            — one fold's scores for a table
//   emitter.rs           — denormalised outputs of a language pair
//   report_use_case.rs   — statistics and plot of an existing table
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// The k-fold ensemble workflow and its configuration
pub mod ensemble_use_case;

/// Per-fold training
pub mod ensemble_trainer;

/// Per-fold scoring
pub mod scorer;

/// Result tables, statistics, plots and submissions
pub mod emitter;

/// Re-reporting an existing result table
pub mod report_use_case;
