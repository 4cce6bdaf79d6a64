//! geoprep - checkpointed preparation of GEO dataset archives.
//!
//! ## Pipeline
//!
//! Download → Extract → Split → TrimColumns → Cleanup
//!
//! - **Download**: fetch `<D>_RAW.tar` from the configured URL
//! - **Extract**: unpack it into `<D>_extracted/`, gunzipping members
//! - **Split**: cut each `[Section]`-delimited text file into `<D>_split/<Section>.tsv`
//! - **TrimColumns**: drop annotation columns from `Probes.tsv` into `<D>_final/`
//! - **Cleanup**: remove text sources and write `cleanup_complete.txt`
//!
//! ## Checkpoints
//!
//! A stage whose output path exists is skipped. There is no content
//! validation, so re-running after a failure resumes after the last stage
//! whose output materialized.

pub mod checkpoint;
pub mod client;
pub mod models;
pub mod pipeline;
pub mod tables;

// Re-exports for convenience
pub use checkpoint::{CompletionCheck, DatasetLayout, ExistenceCheck, StageStatus, is_complete};
pub use client::{Fetcher, HttpFetcher};
pub use models::{Config, PipelineError, Result, Table};
pub use pipeline::{Pipeline, RunReport, StageKind};
