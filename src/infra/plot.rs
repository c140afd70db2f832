// ============================================================
// Layer 6 — Scatter Plot
// ============================================================
// Draws label (x) against prediction (y) for one language pair,
// with the y = x diagonal as a reference. Rendered as SVG, so no
// system fonts are needed.

use anyhow::{anyhow, Result};
use plotters::prelude::*;
use std::path::Path;

pub fn draw_scatterplot(path: impl AsRef<Path>, title: &str, points: &[(f64, f64)]) -> Result<()> {
    let path = path.as_ref();

    // Common range for both axes so the diagonal is meaningful.
    let (mut lo, mut hi) = points
        .iter()
        .flat_map(|&(x, y)| [x, y])
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || !hi.is_finite() {
        (lo, hi) = (0.0, 1.0);
    }
    if hi - lo < 1e-9 {
        lo -= 0.5;
        hi += 0.5;
    }
    let pad = (hi - lo) * 0.05;
    let (lo, hi) = (lo - pad, hi + pad);

    let root = SVGBackend::new(path, (800, 800)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("{}: {e}", path.display()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, lo..hi)
        .map_err(|e| anyhow!("{}: {e}", path.display()))?;

    chart
        .configure_mesh()
        .x_desc("labels")
        .y_desc("predictions")
        .draw()
        .map_err(|e| anyhow!("{}: {e}", path.display()))?;

    chart
        .draw_series(LineSeries::new(vec![(lo, lo), (hi, hi)], &RED))
        .map_err(|e| anyhow!("{}: {e}", path.display()))?;

    chart
        .draw_series(
            points
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|&(x, y)| Circle::new((x, y), 3, BLUE.mix(0.5).filled())),
        )
        .map_err(|e| anyhow!("{}: {e}", path.display()))?;

    root.present().map_err(|e| anyhow!("{}: {e}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writes_svg() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("result_EN-DE.svg");
        draw_scatterplot(&path, "EN-DE", &[(0.1, 0.2), (0.5, 0.4), (0.9, 0.95)]).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("<svg"));
    }

    #[test]
    fn test_constant_points_do_not_fail() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join("flat.svg");
        draw_scatterplot(&path, "flat", &[(0.3, 0.3), (0.3, 0.3)]).unwrap();
        assert!(path.exists());
    }
}
