// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model and training code lives here. The orchestration
// in Layer 2 only sees the QualityEstimator trait, so it can be
// tested with an in-memory estimator and never touches a tensor.
//
//   model.rs      — siamese regressor: one shared two-layer tower
//                   embeds each segment, the score is the cosine
//                   similarity of the two embeddings
//
//   trainer.rs    — one fold's training loop: Adam with warmup and
//                   linear decay, periodic evaluation, best
//                   checkpoint by eval Spearman
//
//   estimator.rs  — SiameseEstimator, the QualityEstimator that
//                   wires featurisation, training and scoring
//
// Everything runs on the NdArray CPU backend.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Siamese cosine-similarity regressor
pub mod model;

/// Per-fold training loop with evaluation and checkpointing
pub mod trainer;

/// QualityEstimator implementation backed by the Burn model
pub mod estimator;
