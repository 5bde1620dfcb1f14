//! Experiment directories and persisted candidate scripts.
//!
//! Layout: `<run_folder>/exp<NNNN>/<stem>_epoch_<iteration>.<ext>`. Directories
//! are only ever created and appended to; cleanup is left to the operator.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

const EXPERIMENT_PREFIX: &str = "exp";
const EXPERIMENT_DIGITS: usize = 4;

/// File naming derived from the script being optimized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateName {
    pub stem: String,
    pub extension: Option<String>,
}

impl CandidateName {
    pub fn from_program(program: &Path) -> Result<Self> {
        let stem = program
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("program path has no file name: {}", program.display()))?;
        let extension = program
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_string);
        Ok(Self {
            stem: stem.to_string(),
            extension,
        })
    }

    pub fn file_name(&self, iteration: u32) -> String {
        match &self.extension {
            Some(ext) => format!("{}_epoch_{iteration}.{ext}", self.stem),
            None => format!("{}_epoch_{iteration}", self.stem),
        }
    }
}

/// Create the next sequentially numbered experiment directory under `base_dir`.
///
/// `base_dir` is created if absent. Numbering is one past the highest existing
/// `expNNNN` directory; it is not safe against concurrent runs sharing `base_dir`.
pub fn create_experiment_root(base_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(base_dir)
        .with_context(|| format!("create run folder {}", base_dir.display()))?;

    let mut highest = 0u32;
    for entry in fs::read_dir(base_dir).with_context(|| format!("read {}", base_dir.display()))? {
        let entry = entry.context("read entry")?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(number) = entry.file_name().to_str().and_then(parse_experiment_number) {
            highest = highest.max(number);
        }
    }

    let next = highest
        .checked_add(1)
        .ok_or_else(|| anyhow!("experiment numbering exhausted in {}", base_dir.display()))?;
    let path = base_dir.join(experiment_dir_name(next));
    fs::create_dir(&path)
        .with_context(|| format!("create experiment dir {}", path.display()))?;
    debug!(path = %path.display(), "created experiment dir");
    Ok(path)
}

/// Write a candidate's source into the experiment directory and return its path.
pub fn persist(
    experiment_dir: &Path,
    name: &CandidateName,
    iteration: u32,
    source_code: &str,
) -> Result<PathBuf> {
    let path = experiment_dir.join(name.file_name(iteration));
    fs::write(&path, source_code)
        .with_context(|| format!("write candidate {}", path.display()))?;
    debug!(path = %path.display(), bytes = source_code.len(), "persisted candidate");
    Ok(path)
}

fn experiment_dir_name(number: u32) -> String {
    format!("{EXPERIMENT_PREFIX}{number:0width$}", width = EXPERIMENT_DIGITS)
}

fn parse_experiment_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(EXPERIMENT_PREFIX)?;
    if digits.len() < EXPERIMENT_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
