//! Error types for geoprep.
//!
//! Failure taxonomy:
//! - Input failures: bad config, malformed sections, missing columns
//! - Infrastructure failures: network, archive, filesystem
//! - Invariant violations: bugs in stage wiring

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for geoprep.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ═══════════════════════════════════════════════════════════════════
    // INPUT: the data or configuration is not what a stage expects
    // ═══════════════════════════════════════════════════════════════════
    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Malformed section [{section}] in {file} (line {line}): {message}")]
    MalformedSection {
        file: PathBuf,
        section: String,
        line: usize,
        message: String,
    },

    #[error("Section [{section}] in {file} has no rows to parse")]
    EmptySection { file: PathBuf, section: String },

    #[error("Table '{table}' is missing column(s): {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    // ═══════════════════════════════════════════════════════════════════
    // INFRASTRUCTURE: network, archive or filesystem went wrong
    // ═══════════════════════════════════════════════════════════════════
    #[error("Download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download of {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to extract archive {archive}: {source}")]
    Extract {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Table error: {context}")]
    Table {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // ORCHESTRATION: a stage aborted the run
    // ═══════════════════════════════════════════════════════════════════
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a table (csv) error with context.
    pub fn table(context: impl Into<String>, source: csv::Error) -> Self {
        Self::Table {
            context: context.into(),
            source,
        }
    }

    /// Wrap an error with the name of the stage that produced it.
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through `StageFailed` wrappers.
    pub fn root(&self) -> &PipelineError {
        match self {
            Self::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for geoprep.
pub type Result<T> = std::result::Result<T, PipelineError>;
