// ============================================================
// Layer 6 — Result and Submission Writers
// ============================================================
// Files written per language pair:
//
//   result_<LP>.tsv       dev rows: row, text_a, text_b, labels[, predictions]
//   test_result_<LP>.tsv  one row per original test row:
//                         index, text_a, text_b[, predictions, imputed]
//   predictions_<LP>.txt  submission, one line per original test row:
//                         <lp>\t<method>\t<index>\t<score>
//
// Tables are tab separated with a header and no quoting; texts
// were whitespace-normalised upstream, so they hold no tabs or
// newlines. The `predictions` column is only present when an
// ensemble actually ran. `imputed` marks test rows dropped during
// cleaning, whose texts are empty and whose prediction is the
// placeholder.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevResultRow {
    pub row:        usize,
    pub text_a:     String,
    pub text_b:     String,
    pub label:      f64,
    pub prediction: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultRow {
    pub index:      String,
    pub text_a:     String,
    pub text_b:     String,
    pub prediction: Option<f64>,
    pub imputed:    bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionLine {
    pub index: String,
    pub score: f64,
}

fn tsv_builder() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder.delimiter(b'\t').quote_style(csv::QuoteStyle::Never);
    builder
}

fn tsv_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    tsv_builder()
        .from_path(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))
}

pub fn write_dev_results(path: impl AsRef<Path>, rows: &[DevResultRow]) -> Result<()> {
    let path            = path.as_ref();
    let with_prediction = rows.iter().any(|r| r.prediction.is_some());
    let mut w           = tsv_writer(path)?;

    let mut header = vec!["row", "text_a", "text_b", "labels"];
    if with_prediction {
        header.push("predictions");
    }
    w.write_record(&header)?;

    for r in rows {
        let mut record = vec![r.row.to_string(), r.text_a.clone(), r.text_b.clone(), r.label.to_string()];
        if with_prediction {
            record.push(r.prediction.map(|p| p.to_string()).unwrap_or_default());
        }
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_test_results(path: impl AsRef<Path>, rows: &[TestResultRow]) -> Result<()> {
    let path            = path.as_ref();
    let with_prediction = rows.iter().any(|r| r.prediction.is_some());
    let mut w           = tsv_writer(path)?;

    let mut header = vec!["index", "text_a", "text_b"];
    if with_prediction {
        header.extend(["predictions", "imputed"]);
    }
    w.write_record(&header)?;

    for r in rows {
        let mut record = vec![r.index.clone(), r.text_a.clone(), r.text_b.clone()];
        if with_prediction {
            record.push(r.prediction.map(|p| p.to_string()).unwrap_or_default());
            record.push(r.imputed.to_string());
        }
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

/// Read (label, prediction) pairs back from a dev result table.
pub fn read_dev_results(path: impl AsRef<Path>) -> Result<Vec<(f64, f64)>> {
    let path    = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .from_path(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;

    let headers = rdr.headers()?.clone();
    let find    = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("'{}' has no '{}' column", path.display(), name))
    };
    let label_idx = find("labels")?;
    let pred_idx  = find("predictions")?;

    let mut pairs = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let parse  = |idx: usize| -> Result<f64> {
            let raw = record.get(idx).unwrap_or_default();
            raw.parse::<f64>()
                .with_context(|| format!("'{}' row {}: '{}' is not a number", path.display(), row, raw))
        };
        pairs.push((parse(label_idx)?, parse(pred_idx)?));
    }
    Ok(pairs)
}

pub fn write_submission(
    path:          impl AsRef<Path>,
    language_pair: &str,
    method:        &str,
    lines:         &[SubmissionLine],
) -> Result<()> {
    let path  = path.as_ref();
    let mut w = tsv_builder()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Cannot create submission '{}'", path.display()))?;

    for line in lines {
        w.write_record([language_pair, method, line.index.as_str(), line.score.to_string().as_str()])?;
    }
    w.flush()?;
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn dev_row(row: usize, prediction: Option<f64>) -> DevResultRow {
        DevResultRow {
            row,
            text_a: "A \"quoted\" source".into(),
            text_b: "eine Übersetzung".into(),
            label:  0.25,
            prediction,
        }
    }

    #[test]
    fn test_dev_results_round_trip() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("result_EN-DE.tsv");
        write_dev_results(&path, &[dev_row(0, Some(0.5)), dev_row(3, Some(-0.75))]).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("row\ttext_a\ttext_b\tlabels\tpredictions\n"));
        assert!(body.contains("A \"quoted\" source"));
        assert_eq!(read_dev_results(&path).unwrap(), vec![(0.25, 0.5), (0.25, -0.75)]);
    }

    #[test]
    fn test_no_prediction_column_without_ensemble() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("result.tsv");
        write_dev_results(&path, &[dev_row(0, None)]).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body.lines().next(), Some("row\ttext_a\ttext_b\tlabels"));
        assert!(read_dev_results(&path).is_err());
    }

    #[test]
    fn test_submission_format() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("predictions_EN-DE.txt");
        let lines = vec![
            SubmissionLine { index: "0".into(), score: 0.5 },
            SubmissionLine { index: "1".into(), score: -0.125 },
        ];
        write_submission(&path, "en-de", "SiameseQE", &lines).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "en-de\tSiameseQE\t0\t0.5\nen-de\tSiameseQE\t1\t-0.125\n"
        );
    }

    #[test]
    fn test_test_results_mark_imputed_rows() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("test_result_NE-EN.tsv");
        let rows = vec![
            TestResultRow { index: "0".into(), text_a: "a".into(), text_b: "b".into(), prediction: Some(0.5), imputed: false },
            TestResultRow { index: "1".into(), text_a: String::new(), text_b: String::new(), prediction: Some(0.25), imputed: true },
        ];
        write_test_results(&path, &rows).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "index\ttext_a\ttext_b\tpredictions\timputed\n0\ta\tb\t0.5\tfalse\n1\t\t\t0.25\ttrue\n"
        );
    }
}
