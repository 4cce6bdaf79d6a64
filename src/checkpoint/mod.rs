//! Checkpoint module for resumable pipeline execution.
//!
//! Provides:
//! - `DatasetLayout`: deterministic output paths per dataset and stage
//! - `is_complete` / `CompletionCheck`: the skip-if-present rule
//! - `ensure_dir` / `list_files`: create-if-absent directories, literal-base globbing

mod state;

pub use state::*;
