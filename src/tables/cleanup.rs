//! Removal of reshaped text sources and the completion marker.

use crate::checkpoint::list_files;
use crate::models::{PipelineError, Result};
use chrono::Utc;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Delete every `*.<extension>` file directly inside `dir`.
///
/// Returns the number of files removed.
pub fn remove_sources(dir: &Path, extension: &str) -> Result<usize> {
    let paths = list_files(dir, &format!("*.{extension}"))?;

    for path in &paths {
        fs::remove_file(path)
            .map_err(|e| PipelineError::io(format!("removing {}", path.display()), e))?;
        debug!(file = %path.display(), "Removed source file");
    }

    Ok(paths.len())
}

/// Write the completion marker; its content is informational only.
pub fn write_marker(path: &Path) -> Result<()> {
    let content = format!(
        "Cleanup completed successfully at {}\n",
        Utc::now().to_rfc3339()
    );
    fs::write(path, content)
        .map_err(|e| PipelineError::io(format!("writing marker {}", path.display()), e))
}
