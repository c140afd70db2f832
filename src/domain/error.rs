// ============================================================
// Layer 3 — Pipeline Error Taxonomy
// ============================================================
// Every failure the orchestrator can raise falls into one of
// four kinds. All of them abort the run: there is no partial
// recovery and no per-fold retry.
//
//   Data        — malformed input, missing columns, degenerate
//                 normalization range. Raised before any training.
//   Training    — the model collaborator failed while fitting or
//                 scoring a fold.
//   Aggregation — the prediction matrix was used out of order
//                 (reduce before every fold recorded, double write,
//                 wrong row count).
//   Io          — filesystem failure, including a fold workspace
//                 that could not be cleared.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("data error: {0}")]
    Data(String),

    #[error("training failed in fold {fold}: {source}")]
    Training {
        fold: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("aggregation error: {0}")]
    Aggregation(String),

    #[error("i/o error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    pub fn aggregation(message: impl Into<String>) -> Self {
        Self::Aggregation(message.into())
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }

    /// Wrap a collaborator failure. The full anyhow context chain is
    /// flattened into the message so nothing is lost in the boxing.
    pub fn training(fold: usize, err: anyhow::Error) -> Self {
        Self::Training { fold, source: format!("{err:#}").into() }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
