// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All business logic is delegated to Layer 2 (application).
//
//   1. `train`  — k-fold ensemble over the language pairs of a manifest
//   2. `report` — statistics and plot of an existing result table
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ReportArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "qe-ensemble",
    version = "0.1.0",
    about = "Train k-fold ensembles of pairwise quality-estimation models and write per-language results."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)  => run_train(args),
            Commands::Report(args) => run_report(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::ensemble_use_case::{EnsembleConfig, EnsembleUseCase};
    use crate::data::reader::{Manifest, TsvLoader};
    use crate::ml::estimator::SiameseEstimator;

    tracing::info!("Reading manifest '{}'", args.manifest.display());
    let loader = TsvLoader::new(Manifest::from_file(&args.manifest)?);

    let config: EnsembleConfig = args.into();
    let estimator = SiameseEstimator::new(config.feature_dim, config.hidden_dim, config.embedding_dim);
    let summary   = EnsembleUseCase::new(config, estimator).run(&loader)?;

    for (lp, stats) in &summary.stats {
        println!(
            "{lp}: pearson={:.4} spearman={:.4} rmse={:.4} mae={:.4} (n={})",
            stats.pearson, stats.spearman, stats.rmse, stats.mae, stats.count,
        );
    }
    println!("Done: {} fold(s), {} file(s) written.", summary.folds_run, summary.outputs.len());
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<()> {
    use crate::application::report_use_case::ReportUseCase;

    let stats = ReportUseCase::new(args.result_file, args.plot).execute()?;
    println!(
        "pearson={:.4} spearman={:.4} rmse={:.4} mae={:.4} (n={})",
        stats.pearson, stats.spearman, stats.rmse, stats.mae, stats.count,
    );
    Ok(())
}
