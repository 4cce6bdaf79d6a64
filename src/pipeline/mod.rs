//! Pipeline module - stage chain and orchestrator.

mod orchestrator;
pub mod stages;

pub use orchestrator::*;
pub use stages::{StageDescriptor, StageKind, resolve_chain};
