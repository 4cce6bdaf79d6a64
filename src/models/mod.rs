//! Core data models for geoprep.
//!
//! - `config`: TOML configuration and the pipeline's named constants
//! - `error`: the error taxonomy every stage reports through
//! - `table`: the tab-separated table passed between stages

mod config;
mod error;
mod table;

pub use config::*;
pub use error::*;
pub use table::*;
