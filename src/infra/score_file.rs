// ============================================================
// Layer 6 — Score File
// ============================================================
// Wire format between the orchestrator and the model
// collaborator: one float per line, in row order, UTF-8,
// no header, no surrounding whitespace.
//
//   0.4132
//   0.87
//   -0.0625
//
// Values are written with Rust's shortest round-trip formatting,
// so reading a file back yields exactly the values written.

use anyhow::{Context, Result};
use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

pub fn write_scores(path: impl AsRef<Path>, scores: &[f64]) -> Result<()> {
    let path = path.as_ref();
    let file = fs::File::create(path)
        .with_context(|| format!("Cannot create score file '{}'", path.display()))?;

    let mut w = BufWriter::new(file);
    for score in scores {
        writeln!(w, "{score}")?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_scores(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let body = fs::read_to_string(path)
        .with_context(|| format!("Cannot read score file '{}'", path.display()))?;

    body.lines()
        .enumerate()
        .map(|(i, line)| {
            line.parse::<f64>().with_context(|| {
                format!("'{}' line {}: '{}' is not a score", path.display(), i + 1, line)
            })
        })
        .collect()
}
