//! Checkpoint state derived from the filesystem.
//!
//! Every stage writes to a deterministic target under the data directory.
//! A stage is complete exactly when its target exists; contents are never
//! re-validated, so a target left behind by a failed run counts as done.

use crate::models::{Config, PipelineError, Result};
use crate::pipeline::StageDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem layout of one dataset's working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    data_dir: PathBuf,
    dataset: String,
    trimmed_name: String,
    marker_name: String,
}

impl DatasetLayout {
    /// Build the layout for `dataset` using the configured data directory
    /// and file names.
    pub fn new(config: &Config, dataset: &str) -> Self {
        Self {
            data_dir: config.pipeline.data_dir.clone(),
            dataset: dataset.to_string(),
            trimmed_name: config.trim.output_name.clone(),
            marker_name: config.cleanup.marker_name.clone(),
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// `<data>/<D>_RAW.tar`
    pub fn raw_archive(&self) -> PathBuf {
        self.data_dir.join(format!("{}_RAW.tar", self.dataset))
    }

    /// `<data>/<D>_extracted/`
    pub fn extracted_dir(&self) -> PathBuf {
        self.data_dir.join(format!("{}_extracted", self.dataset))
    }

    /// `<data>/<D>_split/`
    pub fn split_dir(&self) -> PathBuf {
        self.data_dir.join(format!("{}_split", self.dataset))
    }

    /// `<data>/<D>_final/`
    pub fn final_dir(&self) -> PathBuf {
        self.data_dir.join(format!("{}_final", self.dataset))
    }

    /// `<data>/<D>_final/Probes_trimmed.tsv`
    pub fn trimmed_table(&self) -> PathBuf {
        self.final_dir().join(&self.trimmed_name)
    }

    /// `<data>/<D>_split/cleanup_complete.txt`
    ///
    /// The marker lives in the split directory, not the final one.
    pub fn cleanup_marker(&self) -> PathBuf {
        self.split_dir().join(&self.marker_name)
    }
}

/// Location a stage must leave behind when it succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTarget {
    pub path: PathBuf,
}

impl OutputTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Existence-based completion check: present means done.
pub fn is_complete(target: &OutputTarget) -> bool {
    target.path.exists()
}

/// Policy the orchestrator asks before running a stage.
pub trait CompletionCheck {
    fn is_complete(&self, stage: &StageDescriptor) -> bool;
}

/// Default policy: a stage is complete when its output target exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistenceCheck;

impl CompletionCheck for ExistenceCheck {
    fn is_complete(&self, stage: &StageDescriptor) -> bool {
        is_complete(&stage.output)
    }
}

/// Checkpoint status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Output target exists; the stage will be skipped
    Complete,
    /// Output target absent; the stage will run
    Pending,
}

impl StageStatus {
    pub fn from_check(complete: bool) -> Self {
        if complete {
            Self::Complete
        } else {
            Self::Pending
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => f.pad("complete"),
            Self::Pending => f.pad("pending"),
        }
    }
}

/// Create `dir` and its parents; an existing directory is fine.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| PipelineError::io(format!("creating directory {}", dir.display()), e))?;
    debug!(dir = %dir.display(), "Directory ready");
    Ok(())
}

/// Files under `dir` matching the glob `pattern`, sorted by path.
///
/// `dir` is matched literally, so `[` or `*` in a data directory name is
/// safe. A directory entry that cannot be read fails the listing.
pub fn list_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!("{}/{pattern}", glob::Pattern::escape(&dir.to_string_lossy()));
    let entries = glob::glob(&full)
        .map_err(|e| PipelineError::Internal(format!("Invalid glob pattern {full}: {e}")))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let context = format!("listing {}", e.path().display());
            PipelineError::io(context, e.into_error())
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout(data_dir: &Path) -> DatasetLayout {
        let mut config = Config::default();
        config.pipeline.data_dir = data_dir.to_path_buf();
        DatasetLayout::new(&config, "GSE1")
    }

    #[test]
    fn test_layout_paths() {
        let layout = layout(Path::new("data"));
        assert_eq!(layout.raw_archive(), PathBuf::from("data/GSE1_RAW.tar"));
        assert_eq!(layout.extracted_dir(), PathBuf::from("data/GSE1_extracted"));
        assert_eq!(layout.split_dir(), PathBuf::from("data/GSE1_split"));
        assert_eq!(
            layout.trimmed_table(),
            PathBuf::from("data/GSE1_final/Probes_trimmed.tsv")
        );
        assert_eq!(
            layout.cleanup_marker(),
            PathBuf::from("data/GSE1_split/cleanup_complete.txt")
        );
    }

    #[test]
    fn test_is_complete_tracks_existence_only() {
        let temp_dir = TempDir::new().unwrap();
        let target = OutputTarget::new(temp_dir.path().join("GSE1_split"));
        assert!(!is_complete(&target));

        // An empty directory still counts as complete.
        fs::create_dir(target.path()).unwrap();
        assert!(is_complete(&target));
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("a").join("b");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_list_files_treats_dir_name_literally() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("run[1]*");
        ensure_dir(&dir.join("nested")).unwrap();
        fs::write(dir.join("b.txt"), "b").unwrap();
        fs::write(dir.join("a.txt"), "a").unwrap();
        fs::write(dir.join("c.tsv"), "c").unwrap();
        fs::write(dir.join("nested").join("d.txt"), "d").unwrap();

        let files = list_files(&dir, "*.txt").unwrap();
        assert_eq!(files, vec![dir.join("a.txt"), dir.join("b.txt")]);

        let deep = list_files(&dir, "**/*.txt").unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn test_list_files_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_files(&temp_dir.path().join("absent"), "*").unwrap().is_empty());
    }
}
