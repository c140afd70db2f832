// ============================================================
// Layer 2 — EnsembleUseCase
// ============================================================
// Orchestrates one run over every configured language pair:
//
//   Step 1: Load the raw tables               (Layer 4 - data)
//   Step 2: Clean rows, normalise labels      (Layer 4 - data)
//   Step 3: Pool the training rows of every
//           language pair                     (Layer 3 - domain)
//   Step 4: For each fold:
//             split the pooled table          (Layer 4 - data)
//             train on a fresh workspace      (Layer 2 - EnsembleTrainer)
//             score dev and test of every
//             language pair and record them   (Layer 2 - Scorer)
//   Step 5: Average the folds                 (Layer 3 - EnsembleAggregator)
//   Step 6: Write every output into staging,
//           then commit them together         (Layer 2 - ResultEmitter)
//
// Folds run one after another and language pairs are processed
// in manifest order, so a fixed seed gives identical outputs.
// Any error aborts the run before anything is committed.

use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::PathBuf,
};

use crate::application::emitter::{EnsembledPredictions, ResultEmitter};
use crate::application::ensemble_trainer::EnsembleTrainer;
use crate::application::scorer::Scorer;
use crate::data::{normalizer::Normalizer, preprocessor::Preprocessor, splitter::FoldSplitter};
use crate::domain::dataset::{DatasetBundle, LanguagePair, PooledRow, RawDataset, Split};
use crate::domain::ensemble::EnsembleAggregator;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::traits::{LanguagePairSource, QualityEstimator};
use crate::infra::metrics::SummaryStats;
use crate::infra::workspace::StagingDir;

const CONFIG_FILE: &str = "ensemble_config.json";

// ─── Run Configuration ───────────────────────────────────────────────────────
// Every option of a run. Serialisable so the effective
// configuration can be saved next to the outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Number of folds; 0 disables ensembling.
    pub n_fold:                   usize,
    pub train_batch_size:         usize,
    pub eval_batch_size:          usize,
    pub num_train_epochs:         usize,
    pub learning_rate:            f64,
    pub adam_epsilon:             f64,
    pub warmup_ratio:             f64,
    pub evaluation_steps:         usize,
    pub max_seq_length:           usize,
    /// Gate for the whole ensembling path.
    pub evaluate_during_training: bool,
    pub eval_fraction:            f64,
    pub seed:                     u64,
    pub cache_dir:                PathBuf,
    pub best_model_dir:           PathBuf,
    pub output_dir:               PathBuf,
    pub keep_checkpoints:         bool,
    /// Method name written into submission files.
    pub method:                   String,
    pub feature_dim:              usize,
    pub hidden_dim:               usize,
    pub embedding_dim:            usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            n_fold:                   3,
            train_batch_size:         8,
            eval_batch_size:          8,
            num_train_epochs:         6,
            learning_rate:            1e-3,
            adam_epsilon:             1e-8,
            warmup_ratio:             0.1,
            evaluation_steps:         100,
            max_seq_length:           80,
            evaluate_during_training: true,
            eval_fraction:            0.1,
            seed:                     777,
            cache_dir:                PathBuf::from("temp/cache_dir"),
            best_model_dir:           PathBuf::from("temp/best_model"),
            output_dir:               PathBuf::from("temp/data"),
            keep_checkpoints:         false,
            method:                   "SiameseQE".to_string(),
            feature_dim:              4096,
            hidden_dim:               256,
            embedding_dim:            128,
        }
    }
}

impl EnsembleConfig {
    pub fn ensembling_enabled(&self) -> bool {
        self.n_fold > 0 && self.evaluate_during_training
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub folds_run: usize,
    /// Final paths of every committed file, in name order.
    pub outputs:   Vec<PathBuf>,
    /// Dev statistics per language pair, when an ensemble ran.
    pub stats:     Vec<(LanguagePair, SummaryStats)>,
}

// ─── EnsembleUseCase ─────────────────────────────────────────────────────────
pub struct EnsembleUseCase<E: QualityEstimator> {
    config:    EnsembleConfig,
    estimator: E,
}

impl<E: QualityEstimator> EnsembleUseCase<E> {
    pub fn new(config: EnsembleConfig, estimator: E) -> Self {
        Self { config, estimator }
    }

    /// Load every language pair from `source` and run.
    pub fn run(&self, source: &impl LanguagePairSource) -> PipelineResult<RunSummary> {
        // ── Step 1: Load raw tables ──────────────────────────────────────────
        let raw = source.load_all().map_err(|e| match e.downcast::<PipelineError>() {
            Ok(err)  => err,
            Err(err) => PipelineError::data(format!("{err:#}")),
        })?;
        self.execute(raw)
    }

    pub fn execute(&self, raw: Vec<RawDataset>) -> PipelineResult<RunSummary> {
        let cfg = &self.config;

        // ── Step 2: Clean and normalise ──────────────────────────────────────
        let (bundles, normalizer) = prepare(raw)?;

        // ── Steps 3-5: Ensemble ──────────────────────────────────────────────
        let predictions = if cfg.ensembling_enabled() {
            Some(self.run_folds(&bundles)?)
        } else {
            tracing::info!(
                "Ensembling disabled (n_fold={}, evaluate_during_training={}); writing labels only",
                cfg.n_fold,
                cfg.evaluate_during_training,
            );
            None
        };

        // ── Step 6: Emit and commit ──────────────────────────────────────────
        let folds_run = if predictions.is_some() { cfg.n_fold } else { 0 };
        let staging   = StagingDir::create(&cfg.output_dir)?;
        let emitter   = ResultEmitter::new(&normalizer, &cfg.method, folds_run);

        let mut stats = Vec::new();
        for (i, bundle) in bundles.iter().enumerate() {
            let ensembled = predictions.as_ref().map(|p| &p[i]);
            if let Some(s) = emitter.emit(&staging, bundle, ensembled)? {
                stats.push((bundle.language.clone(), s));
            }
        }

        let config_path = staging.path(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)
            .map_err(|e| PipelineError::data(format!("cannot serialise configuration: {e}")))?;
        fs::write(&config_path, json).map_err(|e| PipelineError::io(&config_path, e))?;

        let outputs = staging.commit()?;
        tracing::info!("Wrote {} files to '{}'", outputs.len(), cfg.output_dir.display());

        Ok(RunSummary { folds_run, outputs, stats })
    }

    /// Train every fold and return the averaged predictions, one
    /// entry per bundle in bundle order.
    fn run_folds(&self, bundles: &[DatasetBundle]) -> PipelineResult<Vec<EnsembledPredictions>> {
        let cfg = &self.config;

        let pooled: Vec<PooledRow> = bundles.iter().flat_map(|b| b.pooled_rows()).collect();
        tracing::info!("Pooled {} training rows from {} language pair(s)", pooled.len(), bundles.len());

        let mut aggregator = EnsembleAggregator::new(cfg.n_fold);
        for bundle in bundles {
            aggregator.register(&bundle.language, Split::Dev, bundle.dev.len())?;
            aggregator.register(&bundle.language, Split::Test, bundle.test.len())?;
        }

        let splitter = FoldSplitter::new(cfg.eval_fraction, cfg.seed)?;
        let trainer  = EnsembleTrainer::new(&self.estimator, cfg);
        let scorer   = Scorer::new(&self.estimator);

        for fold in 0..cfg.n_fold {
            let (train, eval) = splitter.split(&pooled, fold);
            let trained = trainer.train(fold, splitter.fold_seed(fold), &train, &eval)?;

            for bundle in bundles {
                let dev = scorer.score(fold, &trained.artifact, &bundle.dev_pairs())?;
                aggregator.record(&bundle.language, Split::Dev, fold, &dev)?;

                let test = scorer.score(fold, &trained.artifact, &bundle.test_pairs())?;
                aggregator.record(&bundle.language, Split::Test, fold, &test)?;
            }
            tracing::info!(
                "Fold {}/{} recorded from '{}'",
                fold + 1,
                cfg.n_fold,
                trained.workspace.best_model_dir().display(),
            );
            // Dropping `trained` releases the artifact and the fold directories.
        }

        bundles
            .iter()
            .map(|b| {
                Ok(EnsembledPredictions {
                    dev:  aggregator.reduce(&b.language, Split::Dev)?,
                    test: aggregator.reduce(&b.language, Split::Test)?,
                })
            })
            .collect()
    }
}

/// Clean every dataset and normalise its train and dev labels.
/// The set of language pairs is fixed here, before any fold runs.
fn prepare(raw: Vec<RawDataset>) -> PipelineResult<(Vec<DatasetBundle>, Normalizer)> {
    if raw.is_empty() {
        return Err(PipelineError::data("no language pairs configured"));
    }

    let mut seen = HashSet::new();
    for dataset in &raw {
        if !seen.insert(dataset.language.clone()) {
            return Err(PipelineError::data(format!(
                "language pair {} is configured more than once",
                dataset.language
            )));
        }
    }

    let preprocessor   = Preprocessor::new();
    let mut normalizer = Normalizer::new();
    let mut bundles    = Vec::with_capacity(raw.len());

    for dataset in raw {
        let lp = dataset.language;

        let mut train = preprocessor.clean_labelled(&dataset.train);
        let mut dev   = preprocessor.clean_labelled(&dataset.dev);
        let (test, test_ids) = preprocessor.clean_test(&dataset.test);

        let tables = [
            (Split::Train, &mut train, dataset.train.len()),
            (Split::Dev,   &mut dev,   dataset.dev.len()),
        ];
        for (split, rows, total) in tables {
            if rows.len() < total {
                tracing::warn!("{} {}: dropped {} incomplete row(s)", lp, split, total - rows.len());
            }
            let mut labels: Vec<f64> = rows.iter().map(|r| r.label).collect();
            normalizer.fit(&lp, split, &mut labels)?;
            for (row, label) in rows.iter_mut().zip(labels) {
                row.label = label;
            }
        }

        tracing::info!(
            "{}: {} train, {} dev, {} test rows after cleaning",
            lp,
            train.len(),
            dev.len(),
            test.len(),
        );
        bundles.push(DatasetBundle { language: lp, train, dev, test, test_ids });
    }

    Ok((bundles, normalizer))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{RawLabelledRow, RawTestRow, TextPair};
    use crate::domain::plan::TrainingPlan;
    use crate::infra::results::read_dev_results;
    use anyhow::{bail, Result};
    use std::cell::RefCell;
    use std::path::Path;
    use tempfile::tempdir;

    /// Predicts the mean training label for every row, after checking
    /// that its fold directories start out empty.
    #[derive(Default)]
    struct MeanEstimator {
        fail_at_fold: Option<usize>,
        folds_seen:   RefCell<Vec<usize>>,
    }

    fn is_empty_dir(dir: &Path) -> bool {
        fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(false)
    }

    impl QualityEstimator for MeanEstimator {
        type Artifact = f64;

        fn fit(&self, plan: &TrainingPlan, train: &[PooledRow], _eval: &[PooledRow]) -> Result<f64> {
            if Some(plan.fold) == self.fail_at_fold {
                bail!("simulated collaborator failure");
            }
            // Only the plan written by the trainer may be there.
            assert!(is_empty_dir(&plan.cache_dir), "stale cache for fold {}", plan.fold);
            assert_eq!(fs::read_dir(&plan.best_model_dir).unwrap().count(), 1);

            fs::write(plan.cache_dir.join("marker"), plan.fold.to_string())?;
            fs::write(plan.best_model_dir.join("marker"), plan.fold.to_string())?;
            self.folds_seen.borrow_mut().push(plan.fold);

            Ok(train.iter().map(|r| r.label).sum::<f64>() / train.len() as f64)
        }

        fn score(&self, artifact: &f64, rows: &[TextPair]) -> Result<Vec<f64>> {
            Ok(vec![*artifact; rows.len()])
        }
    }

    fn labelled(n: usize, offset: f64, scale: f64) -> Vec<RawLabelledRow> {
        (0..n)
            .map(|i| RawLabelledRow::new(&format!("source {i}"), &format!("target {i}"), offset + scale * i as f64))
            .collect()
    }

    fn dataset(name: &str, scale: f64) -> RawDataset {
        RawDataset {
            language: LanguagePair::new(name),
            train:    labelled(5, -1.0, scale),
            dev:      labelled(5, 2.0, scale),
            test:     (0..5).map(|i| RawTestRow::new(i.to_string(), "src", "tgt")).collect(),
        }
    }

    fn config(root: &Path, n_fold: usize) -> EnsembleConfig {
        EnsembleConfig {
            n_fold,
            cache_dir:      root.join("cache"),
            best_model_dir: root.join("best"),
            output_dir:     root.join("out"),
            ..EnsembleConfig::default()
        }
    }

    fn read(path: PathBuf) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_two_datasets_two_folds() {
        let dir     = tempdir().unwrap();
        let cfg     = config(dir.path(), 2);
        let out     = cfg.output_dir.clone();
        let usecase = EnsembleUseCase::new(cfg, MeanEstimator::default());

        let summary = usecase.execute(vec![dataset("EN-DE", 0.5), dataset("RO-EN", 3.0)]).unwrap();
        assert_eq!(summary.folds_run, 2);
        assert_eq!(summary.stats.len(), 2);
        assert_eq!(*usecase.estimator.folds_seen.borrow(), vec![0, 1]);

        for (lp, scale) in [("EN-DE", 0.5), ("RO-EN", 3.0)] {
            let pairs = read_dev_results(out.join(format!("result_{lp}.tsv"))).unwrap();
            assert_eq!(pairs.len(), 5);
            let (lo, hi) = (2.0, 2.0 + 4.0 * scale);
            for (label, prediction) in pairs {
                assert!((lo - 1e-9..=hi + 1e-9).contains(&label));
                assert!((lo - 1e-9..=hi + 1e-9).contains(&prediction));
            }

            let submission = read(out.join(format!("predictions_{lp}.txt")));
            assert_eq!(submission.lines().count(), 5);
            assert!(submission.starts_with(&format!("{}\tSiameseQE\t0\t", lp.to_lowercase())));
            assert!(out.join(format!("result_{lp}.svg")).exists());
            assert!(out.join(format!("stats_{lp}.json")).exists());
        }

        assert!(out.join(CONFIG_FILE).exists());
        assert!(!out.join(".staging").exists());
        // Fold directories are released once their predictions are recorded.
        assert!(!dir.path().join("cache").join("fold_0").exists());
        assert!(!dir.path().join("best").join("fold_1").exists());
    }

    #[test]
    fn test_no_folds_writes_denormalised_labels_only() {
        let configs: [fn(&Path) -> EnsembleConfig; 2] = [
            |root| config(root, 0),
            |root| EnsembleConfig { evaluate_during_training: false, ..config(root, 3) },
        ];
        for cfg_fn in configs {
            let dir       = tempdir().unwrap();
            let cfg       = cfg_fn(dir.path());
            let out       = cfg.output_dir.clone();
            let estimator = MeanEstimator::default();
            let usecase   = EnsembleUseCase::new(cfg, estimator);

            let summary = usecase.execute(vec![dataset("EN-DE", 0.5)]).unwrap();
            assert_eq!(summary.folds_run, 0);
            assert!(usecase.estimator.folds_seen.borrow().is_empty());

            let dev = read(out.join("result_EN-DE.tsv"));
            let mut lines = dev.lines();
            assert_eq!(lines.next(), Some("row\ttext_a\ttext_b\tlabels"));
            assert_eq!(lines.next(), Some("0\tsource 0\ttarget 0\t2"));
            assert!(out.join("test_result_EN-DE.tsv").exists());
            assert!(!out.join("predictions_EN-DE.txt").exists());
        }
    }

    #[test]
    fn test_dropped_test_row_gets_placeholder() {
        let dir     = tempdir().unwrap();
        let cfg     = config(dir.path(), 2);
        let out     = cfg.output_dir.clone();
        let usecase = EnsembleUseCase::new(cfg, MeanEstimator::default());

        let mut data = dataset("NE-EN", 1.0);
        data.test[2].text_b = None;
        usecase.execute(vec![data]).unwrap();

        let submission = read(out.join("predictions_NE-EN.txt"));
        let lines: Vec<&str> = submission.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[2].starts_with("ne-en\tSiameseQE\t2\t"));

        let test = read(out.join("test_result_NE-EN.tsv"));
        let rows: Vec<&str> = test.lines().collect();
        assert_eq!(rows.len(), 1 + 5);
        assert!(rows[3].starts_with("2\t\t\t") && rows[3].ends_with("\ttrue"));

        // Test table and submission report the same value for every row.
        for (row, line) in rows[1..].iter().zip(&lines) {
            let table_score = row.split('\t').nth(3).unwrap();
            assert_eq!(Some(table_score), line.split('\t').nth(3));
        }
    }

    #[test]
    fn test_failed_fold_leaves_no_outputs() {
        let dir     = tempdir().unwrap();
        let cfg     = config(dir.path(), 3);
        let out     = cfg.output_dir.clone();
        let usecase = EnsembleUseCase::new(cfg, MeanEstimator { fail_at_fold: Some(1), ..Default::default() });

        let err = usecase.execute(vec![dataset("EN-DE", 0.5)]).unwrap_err();
        assert!(matches!(err, PipelineError::Training { fold: 1, .. }));
        assert!(!out.join("result_EN-DE.tsv").exists());
        assert!(!dir.path().join("cache").join("fold_1").exists());
    }

    #[test]
    fn test_constant_labels_are_a_data_error() {
        let dir     = tempdir().unwrap();
        let usecase = EnsembleUseCase::new(config(dir.path(), 2), MeanEstimator::default());

        let mut data = dataset("EN-DE", 0.5);
        data.train = labelled(5, 1.0, 0.0);
        let err = usecase.execute(vec![data]).unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
        assert!(usecase.estimator.folds_seen.borrow().is_empty());
    }

    #[test]
    fn test_duplicate_language_pair_is_rejected() {
        let dir     = tempdir().unwrap();
        let usecase = EnsembleUseCase::new(config(dir.path(), 1), MeanEstimator::default());
        let err = usecase.execute(vec![dataset("EN-DE", 1.0), dataset("EN-DE", 2.0)]).unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn test_identical_seeds_give_identical_outputs() {
        let run = || {
            let dir     = tempdir().unwrap();
            let cfg     = config(dir.path(), 2);
            let out     = cfg.output_dir.clone();
            let usecase = EnsembleUseCase::new(cfg, MeanEstimator::default());
            usecase.execute(vec![dataset("EN-DE", 0.5), dataset("ET-EN", 2.0)]).unwrap();
            (read(out.join("result_ET-EN.tsv")), read(out.join("predictions_EN-DE.txt")))
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_siamese_ensemble_is_reproducible() {
        use crate::ml::estimator::SiameseEstimator;

        let run = || {
            let dir = tempdir().unwrap();
            let cfg = EnsembleConfig {
                num_train_epochs: 2,
                train_batch_size: 4,
                evaluation_steps: 2,
                eval_fraction:    0.2,
                feature_dim:      32,
                hidden_dim:       8,
                embedding_dim:    4,
                ..config(dir.path(), 2)
            };
            let out       = cfg.output_dir.clone();
            let estimator = SiameseEstimator::new(cfg.feature_dim, cfg.hidden_dim, cfg.embedding_dim);
            let summary   = EnsembleUseCase::new(cfg, estimator)
                .execute(vec![dataset("EN-DE", 0.5), dataset("RO-EN", 3.0)])
                .unwrap();
            assert_eq!(summary.folds_run, 2);
            ["EN-DE", "RO-EN"].map(|lp| {
                (
                    fs::read(out.join(format!("predictions_{lp}.txt"))).unwrap(),
                    fs::read(out.join(format!("result_{lp}.tsv"))).unwrap(),
                )
            })
        };
        assert_eq!(run(), run());
    }

    struct FailingSource;

    impl LanguagePairSource for FailingSource {
        fn load_all(&self) -> Result<Vec<RawDataset>> {
            Err(PipelineError::data("'train.tsv' has no 'z_mean' column").into())
        }
    }

    #[test]
    fn test_source_data_error_is_preserved() {
        let dir     = tempdir().unwrap();
        let usecase = EnsembleUseCase::new(config(dir.path(), 1), MeanEstimator::default());
        let err = usecase.run(&FailingSource).unwrap_err();
        assert!(matches!(err, PipelineError::Data(msg) if msg.contains("z_mean")));
    }
}
