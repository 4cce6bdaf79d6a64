//! Configuration models for geoprep.
//!
//! Every tunable of the pipeline lives here, with defaults that reproduce
//! the stock GEO workflow when no config file is given.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Dataset processed when none is given on the command line.
pub const DEFAULT_DATASET_NAME: &str = "GSE68849";

/// Base directory holding every stage's output.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Columns removed from the Probes table by the trim stage.
pub const COLUMNS_TO_DROP: [&str; 7] = [
    "Definition",
    "Ontology_Component",
    "Ontology_Process",
    "Ontology_Function",
    "Synonyms",
    "Obsolete_Probe_Id",
    "Probe_Sequence",
];

/// Section whose block is parsed without a header row (mid-file only).
pub const HEADERLESS_SECTION: &str = "Heading";

/// File whose presence marks the cleanup stage as done.
pub const CLEANUP_MARKER: &str = "cleanup_complete.txt";

/// Placeholder substituted with the dataset identifier in the download URL.
pub const DATASET_PLACEHOLDER: &str = "{dataset}";

/// Top-level configuration for geoprep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where outputs go and which dataset to process
    pub pipeline: PipelineConfig,

    /// Download stage settings
    pub download: DownloadConfig,

    /// Extract stage settings
    pub extract: ExtractConfig,

    /// Split stage settings
    pub split: SplitConfig,

    /// Trim stage settings
    pub trim: TrimConfig,

    /// Cleanup stage settings
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Base data directory
    pub data_dir: PathBuf,

    /// Default dataset identifier
    pub dataset: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            dataset: DEFAULT_DATASET_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// URL template; `{dataset}` is replaced by the dataset identifier
    pub url_template: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Draw a progress bar while downloading
    pub show_progress: bool,
}

fn default_url_template() -> String {
    "https://www.ncbi.nlm.nih.gov/geo/download/?acc={dataset}&format=file".to_string()
}

fn default_timeout() -> u64 {
    600
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            timeout_secs: default_timeout(),
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Gunzip `.gz` members after unpacking
    pub decompress_gzip: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            decompress_gzip: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Extension (without dot) of the section files to split
    pub source_extension: String,

    /// Section parsed without a header row
    pub headerless_section: String,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            source_extension: "txt".to_string(),
            headerless_section: HEADERLESS_SECTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Table (split output name, without `.tsv`) to trim
    pub table: String,

    /// Columns to drop; every one must exist
    pub columns: Vec<String>,

    /// File name of the trimmed table in the final directory
    pub output_name: String,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            table: "Probes".to_string(),
            columns: COLUMNS_TO_DROP.iter().map(|c| c.to_string()).collect(),
            output_name: "Probes_trimmed.tsv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Completion marker written into the split directory
    pub marker_name: String,

    /// Also delete raw sources from the extracted directory
    pub purge_extracted: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            marker_name: CLEANUP_MARKER.to_string(),
            purge_extracted: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Load from `path` if given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_dataset(&self.pipeline.dataset)?;

        if !self.download.url_template.contains(DATASET_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "download.url_template must contain {DATASET_PLACEHOLDER}"
            )));
        }
        if self.split.source_extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Invalid(
                "split.source_extension must not be empty".to_string(),
            ));
        }
        if self.trim.columns.is_empty() {
            return Err(ConfigError::Invalid(
                "trim.columns must name at least one column".to_string(),
            ));
        }
        if self.trim.output_name.is_empty() || self.cleanup.marker_name.is_empty() {
            return Err(ConfigError::Invalid(
                "trim.output_name and cleanup.marker_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Download URL for a dataset.
    pub fn download_url(&self, dataset: &str) -> String {
        self.download.url_template.replace(DATASET_PLACEHOLDER, dataset)
    }

    /// Source extension without a leading dot.
    pub fn source_extension(&self) -> &str {
        self.split.source_extension.trim_start_matches('.')
    }
}

/// Reject identifiers that cannot safely name files.
pub fn validate_dataset(dataset: &str) -> Result<(), ConfigError> {
    if dataset.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "dataset identifier must not be empty".to_string(),
        ));
    }
    if dataset.contains(['/', '\\']) || dataset == "." || dataset == ".." {
        return Err(ConfigError::Invalid(format!(
            "dataset identifier '{dataset}' must not contain path separators"
        )));
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_stock_workflow() {
        let config = Config::default();
        assert_eq!(config.pipeline.dataset, "GSE68849");
        assert_eq!(config.pipeline.data_dir, PathBuf::from("data"));
        assert_eq!(config.trim.columns.len(), 7);
        assert_eq!(config.cleanup.marker_name, "cleanup_complete.txt");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_download_url_substitutes_dataset() {
        let config = Config::default();
        assert_eq!(
            config.download_url("GSE1"),
            "https://www.ncbi.nlm.nih.gov/geo/download/?acc=GSE1&format=file"
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("geoprep.toml");
        std::fs::write(
            &path,
            "[pipeline]\ndataset = \"GSE1\"\n\n[trim]\ncolumns = [\"Synonyms\"]\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.pipeline.dataset, "GSE1");
        assert_eq!(config.pipeline.data_dir, PathBuf::from("data"));
        assert_eq!(config.trim.columns, vec!["Synonyms".to_string()]);
        assert_eq!(config.trim.table, "Probes");
        assert!(config.extract.decompress_gzip);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::load(Some(Path::new("/nonexistent/geoprep.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.download.url_template = "https://example.org/archive.tar".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.trim.columns.clear();
        assert!(config.validate().is_err());

        assert!(validate_dataset("").is_err());
        assert!(validate_dataset("../etc").is_err());
        assert!(validate_dataset("GSE68849").is_ok());
    }
}
