// ============================================================
// Layer 4 — TSV Reader
// ============================================================
// Loads the three tab-separated tables of every language pair
// listed in a JSON manifest:
//
//   {
//     "language_pairs": [
//       { "name": "EN-DE",
//         "train": "data/en-de/train.ende.df.short.tsv",
//         "dev":   "data/en-de/dev.ende.df.short.tsv",
//         "test":  "data/en-de/test20.ende.df.short.tsv" }
//     ]
//   }
//
// Column mapping:
//   train/dev: original → text_a, translation → text_b, z_mean → label
//   test:      index, original → text_a, translation → text_b
//
// Quoting is disabled: the corpora contain bare quote characters
// inside sentences. Empty fields become `None` here; dropping them
// is the preprocessor's job. A missing column, a test row without
// an index, or a label that is not a number is a data error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::dataset::{LanguagePair, RawDataset, RawLabelledRow, RawTestRow};
use crate::domain::error::PipelineError;
use crate::domain::traits::LanguagePairSource;

pub const TEXT_A_COLUMN: &str = "original";
pub const TEXT_B_COLUMN: &str = "translation";
pub const LABEL_COLUMN:  &str = "z_mean";
pub const INDEX_COLUMN:  &str = "index";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name:  String,
    pub train: PathBuf,
    pub dev:   PathBuf,
    pub test:  PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub language_pairs: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read manifest '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed manifest '{}'", path.display()))
    }
}

/// Reads every language pair of a manifest, in manifest order.
pub struct TsvLoader {
    manifest: Manifest,
}

impl TsvLoader {
    pub fn new(manifest: Manifest) -> Self {
        Self { manifest }
    }
}

impl LanguagePairSource for TsvLoader {
    fn load_all(&self) -> Result<Vec<RawDataset>> {
        let mut datasets = Vec::with_capacity(self.manifest.language_pairs.len());

        for entry in &self.manifest.language_pairs {
            let dataset = RawDataset {
                language: LanguagePair::new(entry.name.clone()),
                train:    read_annotated_file(&entry.train)?,
                dev:      read_annotated_file(&entry.dev)?,
                test:     read_test_file(&entry.test)?,
            };
            tracing::info!(
                "Loaded {}: {} train, {} dev, {} test rows",
                dataset.language,
                dataset.train.len(),
                dataset.dev.len(),
                dataset.test.len(),
            );
            datasets.push(dataset);
        }

        Ok(datasets)
    }
}

fn open_tsv(path: &Path) -> Result<csv::Reader<fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| {
            PipelineError::data(format!("'{}' has no '{}' column", path.display(), name)).into()
        })
}

/// A field counts as missing when it is absent or blank.
fn text_field(record: &csv::StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn label_field(record: &csv::StringRecord, idx: usize, row: usize, path: &Path) -> Result<Option<f64>> {
    let Some(raw) = record.get(idx).map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let value: f64 = raw.parse().map_err(|_| {
        PipelineError::data(format!(
            "'{}' row {}: label '{}' is not a number",
            path.display(),
            row,
            raw
        ))
    })?;
    Ok(Some(value).filter(|v| !v.is_nan()))
}

/// Read a train or dev table.
pub fn read_annotated_file(path: impl AsRef<Path>) -> Result<Vec<RawLabelledRow>> {
    let path    = path.as_ref();
    let mut rdr = open_tsv(path)?;
    let headers = rdr.headers()
        .with_context(|| format!("Cannot read header of '{}'", path.display()))?
        .clone();

    let a_idx     = column_index(&headers, TEXT_A_COLUMN, path)?;
    let b_idx     = column_index(&headers, TEXT_B_COLUMN, path)?;
    let label_idx = column_index(&headers, LABEL_COLUMN, path)?;

    let mut rows = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record
            .with_context(|| format!("Cannot read row {} of '{}'", row, path.display()))?;
        rows.push(RawLabelledRow {
            text_a: text_field(&record, a_idx),
            text_b: text_field(&record, b_idx),
            label:  label_field(&record, label_idx, row, path)?,
        });
    }

    tracing::debug!("Read {} annotated rows from '{}'", rows.len(), path.display());
    Ok(rows)
}

/// Read a test table. Every row must carry its index, since the
/// submission is keyed by it.
pub fn read_test_file(path: impl AsRef<Path>) -> Result<Vec<RawTestRow>> {
    let path    = path.as_ref();
    let mut rdr = open_tsv(path)?;
    let headers = rdr.headers()
        .with_context(|| format!("Cannot read header of '{}'", path.display()))?
        .clone();

    let index_idx = column_index(&headers, INDEX_COLUMN, path)?;
    let a_idx     = column_index(&headers, TEXT_A_COLUMN, path)?;
    let b_idx     = column_index(&headers, TEXT_B_COLUMN, path)?;

    let mut rows = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record
            .with_context(|| format!("Cannot read row {} of '{}'", row, path.display()))?;
        let index = text_field(&record, index_idx)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                PipelineError::data(format!("'{}' row {} has no index", path.display(), row))
            })?;
        rows.push(RawTestRow {
            index,
            text_a: text_field(&record, a_idx),
            text_b: text_field(&record, b_idx),
        });
    }

    tracing::debug!("Read {} test rows from '{}'", rows.len(), path.display());
    Ok(rows)
}
