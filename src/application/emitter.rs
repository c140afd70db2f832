// ============================================================
// Layer 2 — ResultEmitter
// ============================================================
// Turns the ensembled, still-normalised predictions of one
// language pair into its output files, all written into the
// run's StagingDir:
//
//   result_<LP>.tsv        dev table, labels and predictions
//                          denormalised with the dev state
//   test_result_<LP>.tsv   one row per original test row,
//                          predictions denormalised with the
//                          train state
//   stats_<LP>.json        RMSE / MAE / Pearson / Spearman on dev
//   result_<LP>.svg        label vs. prediction scatter plot
//   predictions_<LP>.txt   submission, one line per original test row
//
// Ensembled predictions are clamped to [0, 1] before they are
// denormalised, so they always land inside the label range of
// the table they are reported against.
//
// A test row dropped during cleaning was never scored. It still
// gets a test table row (marked `imputed`) and a submission line,
// both carrying the mean training label of its language pair.
//
// Without an ensemble (no folds ran) only the two tables are
// written, without a predictions column.

use serde::Serialize;
use std::{fs, path::Path};

use crate::domain::dataset::{DatasetBundle, LanguagePair, Split, TestRow};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::data::normalizer::Normalizer;
use crate::infra::metrics::SummaryStats;
use crate::infra::plot::draw_scatterplot;
use crate::infra::results::{
    write_dev_results, write_submission, write_test_results, DevResultRow, SubmissionLine, TestResultRow,
};
use crate::infra::workspace::StagingDir;

/// Ensembled predictions of one language pair, normalised.
#[derive(Debug, Clone, Default)]
pub struct EnsembledPredictions {
    pub dev:  Vec<f64>,
    pub test: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct StatsReport<'a> {
    language_pair: &'a str,
    method:        &'a str,
    folds:         usize,
    dev:           SummaryStats,
}

pub struct ResultEmitter<'a> {
    normalizer: &'a Normalizer,
    method:     &'a str,
    folds:      usize,
}

impl<'a> ResultEmitter<'a> {
    pub fn new(normalizer: &'a Normalizer, method: &'a str, folds: usize) -> Self {
        Self { normalizer, method, folds }
    }

    /// Write every output of `bundle`. Returns the dev statistics
    /// when predictions were given.
    pub fn emit(
        &self,
        staging:     &StagingDir,
        bundle:      &DatasetBundle,
        predictions: Option<&EnsembledPredictions>,
    ) -> PipelineResult<Option<SummaryStats>> {
        let lp = &bundle.language;

        if let Some(p) = predictions {
            if p.dev.len() != bundle.dev.len() || p.test.len() != bundle.test.len() {
                return Err(PipelineError::aggregation(format!(
                    "{lp}: {} dev / {} test predictions for {} dev / {} test rows",
                    p.dev.len(),
                    p.test.len(),
                    bundle.dev.len(),
                    bundle.test.len(),
                )));
            }
        }

        let mut labels: Vec<f64> = bundle.dev.iter().map(|r| r.label).collect();
        self.normalizer.unfit(lp, Split::Dev, &mut labels)?;

        let dev_predictions  = predictions.map(|p| self.denormalize(lp, Split::Dev, &p.dev)).transpose()?;
        let test_predictions = predictions.map(|p| self.denormalize(lp, Split::Train, &p.test)).transpose()?;

        // ── Result tables ───────────────────────────────────────────────────
        let dev_rows: Vec<DevResultRow> = bundle
            .dev
            .iter()
            .zip(&labels)
            .enumerate()
            .map(|(i, (row, &label))| DevResultRow {
                row:        row.row,
                text_a:     row.pair.text_a.clone(),
                text_b:     row.pair.text_b.clone(),
                label,
                prediction: dev_predictions.as_ref().map(|p| p[i]),
            })
            .collect();
        let dev_path = staging.path(&format!("result_{lp}.tsv"));
        write_dev_results(&dev_path, &dev_rows).map_err(|e| output_error(&dev_path, e))?;

        let originals   = original_test_rows(bundle)?;
        let test_scores = test_predictions
            .as_ref()
            .map(|p| self.test_scores(bundle, &originals, p))
            .transpose()?;

        let test_rows: Vec<TestResultRow> = bundle
            .test_ids
            .iter()
            .zip(&originals)
            .enumerate()
            .map(|(i, (index, &row))| TestResultRow {
                index:      index.clone(),
                text_a:     row.map(|r| r.pair.text_a.clone()).unwrap_or_default(),
                text_b:     row.map(|r| r.pair.text_b.clone()).unwrap_or_default(),
                prediction: test_scores.as_ref().map(|s| s[i]),
                imputed:    row.is_none(),
            })
            .collect();
        let test_path = staging.path(&format!("test_result_{lp}.tsv"));
        write_test_results(&test_path, &test_rows).map_err(|e| output_error(&test_path, e))?;

        let (Some(dev_predictions), Some(_)) = (dev_predictions, test_scores) else {
            tracing::info!("{}: no ensemble predictions, wrote result tables only", lp);
            return Ok(None);
        };

        // ── Statistics ──────────────────────────────────────────────────────
        let stats = SummaryStats::compute(&labels, &dev_predictions);
        tracing::info!(
            "{} dev: n={} pearson={:.4} spearman={:.4} rmse={:.4} mae={:.4}",
            lp, stats.count, stats.pearson, stats.spearman, stats.rmse, stats.mae,
        );

        let report = StatsReport {
            language_pair: lp.as_str(),
            method:        self.method,
            folds:         self.folds,
            dev:           stats,
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| PipelineError::data(format!("{lp}: cannot serialise statistics: {e}")))?;
        let stats_path = staging.path(&format!("stats_{lp}.json"));
        fs::write(&stats_path, json).map_err(|e| PipelineError::io(&stats_path, e))?;

        // ── Scatter plot ────────────────────────────────────────────────────
        let plot_path = staging.path(&format!("result_{lp}.svg"));
        let points: Vec<(f64, f64)> = labels.iter().copied().zip(dev_predictions.iter().copied()).collect();
        draw_scatterplot(&plot_path, lp.as_str(), &points).map_err(|e| output_error(&plot_path, e))?;

        // ── Submission ──────────────────────────────────────────────────────
        let lines: Vec<SubmissionLine> = test_rows
            .iter()
            .filter_map(|r| r.prediction.map(|score| SubmissionLine { index: r.index.clone(), score }))
            .collect();
        let submission_path = staging.path(&format!("predictions_{lp}.txt"));
        write_submission(&submission_path, &lp.submission_tag(), self.method, &lines)
            .map_err(|e| output_error(&submission_path, e))?;

        Ok(Some(stats))
    }

    /// Clamp into the normalised range, then apply the inverse of `split`.
    fn denormalize(&self, lp: &LanguagePair, split: Split, values: &[f64]) -> PipelineResult<Vec<f64>> {
        let mut out: Vec<f64> = values.iter().map(|v| v.clamp(0.0, 1.0)).collect();
        self.normalizer.unfit(lp, split, &mut out)?;
        Ok(out)
    }

    /// Denormalised score of every original test row. Rows dropped
    /// during cleaning get the placeholder.
    fn test_scores(
        &self,
        bundle:    &DatasetBundle,
        originals: &[Option<&TestRow>],
        scored:    &[f64],
    ) -> PipelineResult<Vec<f64>> {
        let dropped = bundle.dropped_test_rows();
        let placeholder = if dropped > 0 {
            let value = self.placeholder(bundle)?;
            tracing::warn!(
                "{}: {} test row(s) were dropped during cleaning; submitting {:.4} (mean training label) for them",
                bundle.language, dropped, value,
            );
            value
        } else {
            0.0
        };

        let mut scored = scored.iter();
        originals
            .iter()
            .map(|row| match row {
                None    => Ok(placeholder),
                Some(r) => scored.next().copied().ok_or_else(|| {
                    PipelineError::aggregation(format!("{}: test row {} has no prediction", bundle.language, r.row))
                }),
            })
            .collect()
    }

    fn placeholder(&self, bundle: &DatasetBundle) -> PipelineResult<f64> {
        let n = bundle.train.len();
        if n == 0 {
            return Err(PipelineError::data(format!("{}: no training rows", bundle.language)));
        }
        let mut mean = [bundle.train.iter().map(|r| r.label).sum::<f64>() / n as f64];
        self.normalizer.unfit(&bundle.language, Split::Train, &mut mean)?;
        Ok(mean[0])
    }
}

/// The cleaned test row behind each original test row, in file
/// order; None where the row was dropped.
fn original_test_rows(bundle: &DatasetBundle) -> PipelineResult<Vec<Option<&TestRow>>> {
    let mut slots: Vec<Option<&TestRow>> = vec![None; bundle.test_ids.len()];
    for row in &bundle.test {
        let slot = slots.get_mut(row.row).ok_or_else(|| {
            PipelineError::data(format!("{}: test row {} has no index", bundle.language, row.row))
        })?;
        *slot = Some(row);
    }
    Ok(slots)
}

/// Writers report failures through anyhow; recover the io::Error
/// when there is one.
fn output_error(path: &Path, err: anyhow::Error) -> PipelineError {
    match err.downcast::<std::io::Error>() {
        Ok(io)   => PipelineError::io(path, io),
        Err(err) => PipelineError::data(format!("cannot write '{}': {err:#}", path.display())),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{LabelledRow, LanguagePair, TestRow, TextPair};
    use tempfile::tempdir;

    fn lrow(row: usize, label: f64) -> LabelledRow {
        LabelledRow { row, pair: TextPair::new(format!("src {row}"), format!("tgt {row}")), label }
    }

    /// Train labels 0..=10, dev labels -1..=1, one dropped test row.
    fn fixture() -> (DatasetBundle, Normalizer) {
        let lp = LanguagePair::new("SI-EN");
        let mut normalizer = Normalizer::new();

        let mut train_labels = vec![0.0, 5.0, 10.0];
        normalizer.fit(&lp, Split::Train, &mut train_labels).unwrap();
        let mut dev_labels = vec![-1.0, 1.0];
        normalizer.fit(&lp, Split::Dev, &mut dev_labels).unwrap();

        let bundle = DatasetBundle {
            language: lp,
            train:    train_labels.iter().enumerate().map(|(i, &l)| lrow(i, l)).collect(),
            dev:      dev_labels.iter().enumerate().map(|(i, &l)| lrow(i, l)).collect(),
            test: vec![
                TestRow { row: 0, index: "0".into(), pair: TextPair::new("a", "b") },
                TestRow { row: 2, index: "2".into(), pair: TextPair::new("e", "f") },
            ],
            test_ids: vec!["0".into(), "1".into(), "2".into()],
        };
        (bundle, normalizer)
    }

    #[test]
    fn test_denormalises_with_the_right_state() {
        let dir          = tempdir().unwrap();
        let staging      = StagingDir::create(dir.path()).unwrap();
        let (bundle, n)  = fixture();
        let predictions  = EnsembledPredictions { dev: vec![0.5, 1.2], test: vec![0.5, -0.3] };

        let stats = ResultEmitter::new(&n, "SiameseQE", 2)
            .emit(&staging, &bundle, Some(&predictions))
            .unwrap()
            .unwrap();
        assert_eq!(stats.count, 2);

        let body = fs::read_to_string(staging.path("result_SI-EN.tsv")).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "row\ttext_a\ttext_b\tlabels\tpredictions");
        // dev state is [-1, 1]: 0.5 -> 0, 1.2 clamps to 1 -> 1
        assert_eq!(lines[1], "0\tsrc 0\ttgt 0\t-1\t0");
        assert_eq!(lines[2], "1\tsrc 1\ttgt 1\t1\t1");

        // test uses the train state [0, 10]; -0.3 clamps to 0
        let submission = fs::read_to_string(staging.path("predictions_SI-EN.txt")).unwrap();
        assert_eq!(
            submission,
            "si-en\tSiameseQE\t0\t5\nsi-en\tSiameseQE\t1\t5\nsi-en\tSiameseQE\t2\t0\n"
        );

        // The test table carries the same values, the dropped row marked.
        let test = fs::read_to_string(staging.path("test_result_SI-EN.tsv")).unwrap();
        let lines: Vec<&str> = test.lines().collect();
        assert_eq!(lines.len(), 1 + 3);
        assert_eq!(lines[1], "0\ta\tb\t5\tfalse");
        assert_eq!(lines[2], "1\t\t\t5\ttrue");
        assert_eq!(lines[3], "2\te\tf\t0\tfalse");

        assert!(staging.path("result_SI-EN.svg").exists());
        assert!(staging.path("stats_SI-EN.json").exists());
    }

    #[test]
    fn test_without_predictions_writes_tables_only() {
        let dir         = tempdir().unwrap();
        let staging     = StagingDir::create(dir.path()).unwrap();
        let (bundle, n) = fixture();

        let stats = ResultEmitter::new(&n, "SiameseQE", 0).emit(&staging, &bundle, None).unwrap();
        assert!(stats.is_none());

        let body = fs::read_to_string(staging.path("result_SI-EN.tsv")).unwrap();
        assert_eq!(body.lines().next(), Some("row\ttext_a\ttext_b\tlabels"));
        assert!(body.contains("\t-1\n"));

        let test = fs::read_to_string(staging.path("test_result_SI-EN.tsv")).unwrap();
        assert_eq!(test.lines().next(), Some("index\ttext_a\ttext_b"));
        assert_eq!(test.lines().count(), 1 + 3);

        assert!(!staging.path("predictions_SI-EN.txt").exists());
        assert!(!staging.path("result_SI-EN.svg").exists());
    }

    #[test]
    fn test_prediction_count_mismatch_is_rejected() {
        let dir         = tempdir().unwrap();
        let staging     = StagingDir::create(dir.path()).unwrap();
        let (bundle, n) = fixture();
        let predictions = EnsembledPredictions { dev: vec![0.5], test: vec![0.5, 0.5] };

        let err = ResultEmitter::new(&n, "SiameseQE", 2)
            .emit(&staging, &bundle, Some(&predictions))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Aggregation(_)));
    }
}
