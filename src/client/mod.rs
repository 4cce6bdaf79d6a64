//! External collaborators: downloading and unpacking the dataset archive.

mod archive;
mod fetch;

pub use archive::*;
pub use fetch::*;
