// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the quality-estimation problem:
// language pairs, text pairs, the per-language dataset bundle,
// the per-fold prediction matrix, and the error taxonomy.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only structs, enums, and traits
//
// The model itself is only visible here through the
// QualityEstimator trait, so the orchestration can be tested
// with an in-memory estimator and no GPU or filesystem model.

/// Language pairs, rows, and the per-language dataset bundle
pub mod dataset;

/// Prediction matrices and the fold ensemble aggregator
pub mod ensemble;

/// Error taxonomy shared by every stage of the pipeline
pub mod error;

/// Per-fold training plan handed to the model collaborator
pub mod plan;

/// Core abstractions (traits) that other layers implement
pub mod traits;
