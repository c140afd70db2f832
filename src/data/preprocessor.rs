// ============================================================
// Layer 4 — Row Preprocessor
// ============================================================
// Turns raw rows into clean rows:
//
//   1. Rows with a missing text or label are dropped. Train and dev
//      rows cannot be used without them; test rows are dropped from
//      scoring but their index is kept so the submission still
//      accounts for them.
//   2. Whitespace inside each text is normalised: tabs, non-breaking
//      spaces, zero-width spaces and line breaks become a single
//      space, and the text is trimmed.
//
// Every clean row remembers its 0-based position in the source file.

use crate::domain::dataset::{LabelledRow, RawLabelledRow, RawTestRow, TestRow, TextPair};

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Normalise whitespace in a single text segment.
    pub fn clean(&self, text: &str) -> String {
        let mapped: String = text
            .chars()
            .map(|c| match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            })
            .collect();

        mapped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn clean_pair(&self, text_a: Option<&String>, text_b: Option<&String>) -> Option<TextPair> {
        let a = self.clean(text_a?);
        let b = self.clean(text_b?);
        if a.is_empty() || b.is_empty() {
            return None;
        }
        Some(TextPair::new(a, b))
    }

    /// Clean a train or dev table. Returns the kept rows; the number
    /// dropped is `raw.len() - kept.len()`.
    pub fn clean_labelled(&self, raw: &[RawLabelledRow]) -> Vec<LabelledRow> {
        raw.iter()
            .enumerate()
            .filter_map(|(row, r)| {
                let pair  = self.clean_pair(r.text_a.as_ref(), r.text_b.as_ref())?;
                let label = r.label.filter(|l| l.is_finite())?;
                Some(LabelledRow { row, pair, label })
            })
            .collect()
    }

    /// Clean a test table. Returns the scorable rows and the index of
    /// every raw row, in file order.
    pub fn clean_test(&self, raw: &[RawTestRow]) -> (Vec<TestRow>, Vec<String>) {
        let ids = raw.iter().map(|r| r.index.clone()).collect();
        let rows = raw
            .iter()
            .enumerate()
            .filter_map(|(row, r)| {
                let pair = self.clean_pair(r.text_a.as_ref(), r.text_b.as_ref())?;
                Some(TestRow { row, index: r.index.clone(), pair })
            })
            .collect();
        (rows, ids)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  hello\u{00A0}\t  world\n"), "hello world");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(Preprocessor::new().clean(""), "");
    }

    #[test]
    fn test_drops_rows_with_missing_values() {
        let raw = vec![
            RawLabelledRow::new("a", "b", 0.5),
            RawLabelledRow { text_a: Some("a".into()), text_b: None, label: Some(0.1) },
            RawLabelledRow { text_a: Some("a".into()), text_b: Some("b".into()), label: None },
            RawLabelledRow::new("   ", "b", 0.2),
            RawLabelledRow::new("c", "d", 0.9),
        ];
        let clean = Preprocessor::new().clean_labelled(&raw);

        assert_eq!(clean.len(), 2);
        assert_eq!(clean[0].row, 0);
        assert_eq!(clean[1].row, 4);
        assert_eq!(clean[1].pair, TextPair::new("c", "d"));
    }

    #[test]
    fn test_dropped_test_rows_keep_their_index() {
        let raw = vec![
            RawTestRow::new("10", "a", "b"),
            RawTestRow { index: "11".into(), text_a: Some("a".into()), text_b: None },
            RawTestRow::new("12", "c", "d"),
        ];
        let (rows, ids) = Preprocessor::new().clean_test(&raw);

        assert_eq!(ids, vec!["10", "11", "12"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].index, "12");
        assert_eq!(rows[1].row, 2);
    }
}
