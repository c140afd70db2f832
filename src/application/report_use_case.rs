// ============================================================
// Layer 2 — ReportUseCase
// ============================================================
// Recomputes the summary statistics of an existing dev result
// table (result_<LP>.tsv) and optionally redraws its scatter
// plot. Nothing is trained.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::infra::metrics::SummaryStats;
use crate::infra::plot::draw_scatterplot;
use crate::infra::results::read_dev_results;

pub struct ReportUseCase {
    result_file: PathBuf,
    plot_file:   Option<PathBuf>,
}

impl ReportUseCase {
    pub fn new(result_file: impl Into<PathBuf>, plot_file: Option<PathBuf>) -> Self {
        Self { result_file: result_file.into(), plot_file }
    }

    pub fn execute(&self) -> Result<SummaryStats> {
        let pairs = read_dev_results(&self.result_file)?;
        if pairs.is_empty() {
            bail!("'{}' has no rows", self.result_file.display());
        }

        let (labels, predictions): (Vec<f64>, Vec<f64>) = pairs.iter().copied().unzip();
        let stats = SummaryStats::compute(&labels, &predictions);
        tracing::info!("Recomputed statistics over {} rows of '{}'", stats.count, self.result_file.display());

        if let Some(plot) = &self.plot_file {
            draw_scatterplot(plot, &title_of(&self.result_file), &pairs)?;
            tracing::info!("Scatter plot written to '{}'", plot.display());
        }
        Ok(stats)
    }
}

/// "result_EN-DE.tsv" → "EN-DE"
fn title_of(path: &Path) -> String {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    stem.strip_prefix("result_").map(str::to_string).unwrap_or(stem)
}
