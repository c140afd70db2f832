// ============================================================
// Layer 3 — Dataset Domain Types
// ============================================================
// One language pair (e.g. "EN-DE") owns three tables:
//   train: (text_a, text_b, label)
//   dev:   (text_a, text_b, label)
//   test:  (index, text_a, text_b)
//
// Raw* types are what the reader hands over: every field may be
// missing. The cleaned types (LabelledRow, TestRow) always carry
// both texts, and keep `row`, the 0-based position in the source
// file, so every prediction can be traced back to where it came from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one dataset, e.g. "EN-DE".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguagePair(String);

impl LanguagePair {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase tag used in submission files ("en-de").
    pub fn submission_tag(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which table of a dataset a row or a matrix belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Split::Train => "train",
            Split::Dev   => "dev",
            Split::Test  => "test",
        };
        f.write_str(name)
    }
}

/// The two segments being compared: source sentence and its translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPair {
    pub text_a: String,
    pub text_b: String,
}

impl TextPair {
    pub fn new(text_a: impl Into<String>, text_b: impl Into<String>) -> Self {
        Self { text_a: text_a.into(), text_b: text_b.into() }
    }
}

// ─── Raw rows (straight from the reader) ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawLabelledRow {
    pub text_a: Option<String>,
    pub text_b: Option<String>,
    pub label:  Option<f64>,
}

impl RawLabelledRow {
    pub fn new(text_a: &str, text_b: &str, label: f64) -> Self {
        Self {
            text_a: Some(text_a.to_string()),
            text_b: Some(text_b.to_string()),
            label:  Some(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTestRow {
    pub index:  String,
    pub text_a: Option<String>,
    pub text_b: Option<String>,
}

impl RawTestRow {
    pub fn new(index: impl Into<String>, text_a: &str, text_b: &str) -> Self {
        Self {
            index:  index.into(),
            text_a: Some(text_a.to_string()),
            text_b: Some(text_b.to_string()),
        }
    }
}

/// Everything loaded for one language pair before cleaning.
#[derive(Debug, Clone)]
pub struct RawDataset {
    pub language: LanguagePair,
    pub train:    Vec<RawLabelledRow>,
    pub dev:      Vec<RawLabelledRow>,
    pub test:     Vec<RawTestRow>,
}

// ─── Cleaned rows ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct LabelledRow {
    pub row:   usize,
    pub pair:  TextPair,
    pub label: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestRow {
    pub row:   usize,
    pub index: String,
    pub pair:  TextPair,
}

/// Provenance of a pooled training row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowOrigin {
    pub language: LanguagePair,
    pub row:      usize,
}

/// A row of the cross-language training table used for fold resampling.
#[derive(Debug, Clone, PartialEq)]
pub struct PooledRow {
    pub origin: RowOrigin,
    pub pair:   TextPair,
    pub label:  f64,
}

/// All tables of one language pair after cleaning and normalization.
///
/// `test_ids` lists every test index in file order, including rows
/// that were dropped during cleaning, so the submission can still
/// account for them.
#[derive(Debug, Clone)]
pub struct DatasetBundle {
    pub language: LanguagePair,
    pub train:    Vec<LabelledRow>,
    pub dev:      Vec<LabelledRow>,
    pub test:     Vec<TestRow>,
    pub test_ids: Vec<String>,
}

impl DatasetBundle {
    pub fn pooled_rows(&self) -> impl Iterator<Item = PooledRow> + '_ {
        self.train.iter().map(|r| PooledRow {
            origin: RowOrigin { language: self.language.clone(), row: r.row },
            pair:   r.pair.clone(),
            label:  r.label,
        })
    }

    pub fn dev_pairs(&self) -> Vec<TextPair> {
        self.dev.iter().map(|r| r.pair.clone()).collect()
    }

    pub fn test_pairs(&self) -> Vec<TextPair> {
        self.test.iter().map(|r| r.pair.clone()).collect()
    }

    /// Number of test rows that were dropped during cleaning.
    pub fn dropped_test_rows(&self) -> usize {
        self.test_ids.len() - self.test.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> DatasetBundle {
        DatasetBundle {
            language: LanguagePair::new("RO-EN"),
            train: vec![
                LabelledRow { row: 0, pair: TextPair::new("a", "b"), label: 0.0 },
                LabelledRow { row: 2, pair: TextPair::new("c", "d"), label: 1.0 },
            ],
            dev:  Vec::new(),
            test: vec![TestRow { row: 0, index: "0".into(), pair: TextPair::new("e", "f") }],
            test_ids: vec!["0".into(), "1".into()],
        }
    }

    #[test]
    fn test_submission_tag_is_lowercase() {
        assert_eq!(LanguagePair::new("EN-DE").submission_tag(), "en-de");
    }

    #[test]
    fn test_pooled_rows_keep_provenance() {
        let pooled: Vec<PooledRow> = bundle().pooled_rows().collect();
        assert_eq!(pooled.len(), 2);
        assert_eq!(pooled[1].origin.language.as_str(), "RO-EN");
        assert_eq!(pooled[1].origin.row, 2);
        assert_eq!(pooled[1].label, 1.0);
    }

    #[test]
    fn test_dropped_test_rows() {
        assert_eq!(bundle().dropped_test_rows(), 1);
    }
}
