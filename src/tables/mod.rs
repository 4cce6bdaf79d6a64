//! Table reshaping: section splitting, column trimming, source cleanup.

mod cleanup;
mod splitter;
mod trim;

pub use cleanup::*;
pub use splitter::*;
pub use trim::*;
