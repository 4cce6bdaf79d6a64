//! Tab-separated table model.
//!
//! A `Table` is the unit every stage after extraction passes along: one
//! per section block, written to and read from `<name>.tsv`.

use crate::models::{PipelineError, Result};
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::HashSet;
use std::path::Path;

/// How the first row of a block is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// First row names the columns
    Infer,
    /// Every row is data; columns are named `0, 1, 2, ...`
    Headerless,
}

/// Value type inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    /// No non-empty cell
    Empty,
}

/// A named table with string cells, columns in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse tab-separated text into a table.
    ///
    /// `source` is only used to label errors. Empty lines are skipped by the
    /// reader; a quoted empty cell (`""`) is a row. Rows
    /// shorter than the header are padded with empty cells, and rows wider
    /// than the header are rejected.
    pub fn parse_tsv(name: &str, text: &str, mode: HeaderMode, source: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut records: Vec<(usize, StringRecord)> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| PipelineError::MalformedSection {
                file: source.to_path_buf(),
                section: name.to_string(),
                line: e.position().map(|p| p.line() as usize).unwrap_or(0),
                message: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            // Section rows are single-line; a multi-line field is an open quote.
            if record.iter().any(|field| field.contains(['\n', '\r'])) {
                return Err(PipelineError::MalformedSection {
                    file: source.to_path_buf(),
                    section: name.to_string(),
                    line,
                    message: "unterminated quote spans lines".to_string(),
                });
            }
            records.push((line, record));
        }

        let mut records = records.into_iter();
        let (columns, first_row) = match (mode, records.next()) {
            (_, None) => {
                return Err(PipelineError::EmptySection {
                    file: source.to_path_buf(),
                    section: name.to_string(),
                });
            }
            (HeaderMode::Infer, Some((_, header))) => (header_names(&header), None),
            (HeaderMode::Headerless, Some((line, first))) => {
                let columns = (0..first.len()).map(|i| i.to_string()).collect();
                (columns, Some((line, first)))
            }
        };

        let width = columns.len();
        let mut rows = Vec::new();
        for (line, record) in first_row.into_iter().chain(records) {
            if record.len() > width {
                return Err(PipelineError::MalformedSection {
                    file: source.to_path_buf(),
                    section: name.to_string(),
                    line,
                    message: format!("expected {width} fields, saw {}", record.len()),
                });
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self {
            name: name.to_string(),
            columns,
            rows,
        })
    }

    /// Read a headed TSV file; the table takes the file stem as its name.
    pub fn read_tsv(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::io(format!("reading table {}", path.display()), e))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse_tsv(&name, &text, HeaderMode::Infer, path)
    }

    /// Write the column row followed by every data row.
    pub fn write_tsv(&self, path: &Path) -> Result<()> {
        let context = || format!("writing table {}", path.display());
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(QuoteStyle::Necessary)
            .from_path(path)
            .map_err(|e| PipelineError::table(context(), e))?;

        writer
            .write_record(&self.columns)
            .map_err(|e| PipelineError::table(context(), e))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| PipelineError::table(context(), e))?;
        }
        writer
            .flush()
            .map_err(|e| PipelineError::io(context(), e))?;
        Ok(())
    }

    /// Remove `drop` from the table, or fail without changes if any is absent.
    pub fn drop_columns(&mut self, drop: &[&str]) -> Result<()> {
        let missing: Vec<String> = drop
            .iter()
            .filter(|c| !self.columns.iter().any(|col| col == *c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::MissingColumns {
                table: self.name.clone(),
                columns: missing,
            });
        }

        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|col| !drop.contains(&col.as_str()))
            .collect();
        self.columns = retain_by_mask(std::mem::take(&mut self.columns), &keep);
        for row in &mut self.rows {
            *row = retain_by_mask(std::mem::take(row), &keep);
        }
        Ok(())
    }

    /// Infer each column's value type from its non-empty cells.
    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len())
            .map(|i| infer_type(self.rows.iter().map(|r| r[i].as_str())))
            .collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Column names from a header row: blanks become `Unnamed: <i>`, repeats
/// get `.1`, `.2`, ... suffixes.
fn header_names(header: &StringRecord) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let base = if raw.is_empty() {
                format!("Unnamed: {i}")
            } else {
                raw.to_string()
            };
            let mut name = base.clone();
            let mut n = 1;
            while seen.contains(&name) {
                name = format!("{base}.{n}");
                n += 1;
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}

fn retain_by_mask(values: Vec<String>, keep: &[bool]) -> Vec<String> {
    values
        .into_iter()
        .zip(keep)
        .filter_map(|(v, k)| k.then_some(v))
        .collect()
}

fn infer_type<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut inferred = ColumnType::Empty;
    for cell in cells.filter(|c| !c.is_empty()) {
        let cell_type = if cell.parse::<i64>().is_ok() {
            ColumnType::Integer
        } else if cell.parse::<f64>().is_ok() {
            ColumnType::Float
        } else {
            return ColumnType::Text;
        };
        inferred = match (inferred, cell_type) {
            (ColumnType::Empty, t) => t,
            (ColumnType::Float, _) | (_, ColumnType::Float) => ColumnType::Float,
            (t, _) => t,
        };
    }
    inferred
}
