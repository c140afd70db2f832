// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the best model of one fold using Burn's
// CompactRecorder.
//
// Layout of a fold's best-model directory:
//
//   <best_model_dir>/fold_<i>/
//     best_model.mpk.gz     ← weights with the best eval score so far
//     best_step.json        ← optimiser step the weights were taken at
//     model_config.json     ← architecture needed to rebuild the model
//
// The best checkpoint is overwritten each time evaluation
// improves, and reloaded once training finishes so that scoring
// always uses the selected weights rather than the last ones.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::ml::model::{SiameseConfig, SiameseRegressor};

const MODEL_FILE:  &str = "best_model";
const STEP_FILE:   &str = "best_step.json";
const CONFIG_FILE: &str = "model_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Overwrite the best checkpoint with `model`, taken at `step`.
    pub fn save_model<B: Backend>(&self, model: &SiameseRegressor<B>, step: usize) -> Result<()> {
        let path = self.dir.join(MODEL_FILE);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        fs::write(self.dir.join(STEP_FILE), serde_json::to_string(&step)?)
            .with_context(|| format!("Failed to write {STEP_FILE}"))?;

        tracing::debug!("Saved best checkpoint at step {}", step);
        Ok(())
    }

    /// Load the best checkpoint into `model` (which must have the
    /// saved architecture).
    pub fn load_model<B: Backend>(
        &self,
        model:  SiameseRegressor<B>,
        device: &B::Device,
    ) -> Result<SiameseRegressor<B>> {
        let step = self.best_step()?;
        let path = self.dir.join(MODEL_FILE);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        tracing::debug!("Loaded best checkpoint from step {}", step);
        Ok(model.load_record(record))
    }

    pub fn has_checkpoint(&self) -> bool {
        self.dir.join(STEP_FILE).exists()
    }

    pub fn save_config(&self, cfg: &SiameseConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_config(&self) -> Result<SiameseConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn best_step(&self) -> Result<usize> {
        let path = self.dir.join(STEP_FILE);
        let s    = fs::read_to_string(&path)
            .with_context(|| format!("No checkpoint has been saved in '{}'", self.dir.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
