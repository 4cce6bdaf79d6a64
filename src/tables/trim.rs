//! Column trimmer for the Probes table.

use crate::models::{Result, Table};
use std::path::Path;
use tracing::info;

/// Load `src`, drop `columns`, write the result to `dest`.
///
/// Every listed column must be present; a missing one fails the trim
/// before anything is written.
pub fn trim_table(src: &Path, dest: &Path, columns: &[String]) -> Result<Table> {
    let mut table = Table::read_tsv(src)?;
    let before = table.width();

    let drop: Vec<&str> = columns.iter().map(String::as_str).collect();
    table.drop_columns(&drop)?;
    table.write_tsv(dest)?;

    info!(
        table = %table.name,
        dropped = before - table.width(),
        remaining = table.width(),
        rows = table.len(),
        dest = %dest.display(),
        "Trimmed table"
    );
    Ok(table)
}
