// ============================================================
// Layer 6 — Scoped Directories
// ============================================================
// Two RAII guards around directories whose contents must never
// outlive the step that produced them.
//
// FoldWorkspace
//   One cache directory and one best-model directory per fold:
//
//     <cache_dir>/fold_<i>/         score files, metrics.csv
//     <best_model_dir>/fold_<i>/    best checkpoint + config
//
//   Both are wiped and recreated when the fold starts, so a
//   checkpoint from an earlier run or fold can never be picked
//   up by accident. They are removed again when the guard is
//   dropped, including when the fold fails. Failing to clear a
//   directory is an Io error, not a warning.
//
// StagingDir
//   Output files are written into <output_dir>/.staging first and
//   only moved into <output_dir> by commit(), after every language
//   pair has been emitted. A run that fails halfway leaves no
//   result files behind.

use std::{fs, path::{Path, PathBuf}};

use crate::domain::error::{PipelineError, PipelineResult};

fn reset_dir(dir: &Path) -> PipelineResult<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))
}

#[derive(Debug)]
pub struct FoldWorkspace {
    fold:             usize,
    cache_dir:        PathBuf,
    best_model_dir:   PathBuf,
    keep_checkpoints: bool,
}

impl FoldWorkspace {
    pub fn acquire(
        cache_root:       &Path,
        best_model_root:  &Path,
        fold:             usize,
        keep_checkpoints: bool,
    ) -> PipelineResult<Self> {
        let name           = format!("fold_{fold}");
        let cache_dir      = cache_root.join(&name);
        let best_model_dir = best_model_root.join(&name);

        reset_dir(&cache_dir)?;
        reset_dir(&best_model_dir)?;

        tracing::debug!(
            "Fold {} workspace ready: cache='{}', best_model='{}'",
            fold,
            cache_dir.display(),
            best_model_dir.display(),
        );
        Ok(Self { fold, cache_dir, best_model_dir, keep_checkpoints })
    }

    pub fn fold(&self) -> usize {
        self.fold
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn best_model_dir(&self) -> &Path {
        &self.best_model_dir
    }
}

impl Drop for FoldWorkspace {
    fn drop(&mut self) {
        let mut dirs = vec![&self.cache_dir];
        if !self.keep_checkpoints {
            dirs.push(&self.best_model_dir);
        }
        for dir in dirs {
            if let Err(e) = fs::remove_dir_all(dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Fold {}: could not remove '{}': {}", self.fold, dir.display(), e);
                }
            }
        }
    }
}

// ─── StagingDir ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct StagingDir {
    staging:   PathBuf,
    target:    PathBuf,
    committed: bool,
}

impl StagingDir {
    pub fn create(target: &Path) -> PipelineResult<Self> {
        fs::create_dir_all(target).map_err(|e| PipelineError::io(target, e))?;
        let staging = target.join(".staging");
        reset_dir(&staging)?;
        Ok(Self { staging, target: target.to_path_buf(), committed: false })
    }

    /// Where to write `file_name` until the run is committed.
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.staging.join(file_name)
    }

    /// Move every staged file into the target directory, in name order.
    pub fn commit(mut self) -> PipelineResult<Vec<PathBuf>> {
        let mut staged: Vec<PathBuf> = fs::read_dir(&self.staging)
            .map_err(|e| PipelineError::io(&self.staging, e))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()
            .map_err(|e| PipelineError::io(&self.staging, e))?;
        staged.sort();

        let mut committed = Vec::with_capacity(staged.len());
        for from in staged {
            let Some(name) = from.file_name() else { continue };
            let to = self.target.join(name);
            fs::rename(&from, &to).map_err(|e| PipelineError::io(&to, e))?;
            committed.push(to);
        }

        fs::remove_dir_all(&self.staging).map_err(|e| PipelineError::io(&self.staging, e))?;
        self.committed = true;
        Ok(committed)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_dir_all(&self.staging);
        }
    }
}
