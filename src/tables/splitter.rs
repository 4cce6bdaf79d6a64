//! Section splitter: one `[name]`-delimited text file in, many tables out.
//!
//! A section starts at a line beginning with `[` and runs until the next
//! such line or end of file. Lines before the first marker are dropped.
//!
//! Header rule: a block closed by a following marker is parsed headerless
//! when its name is the headerless section (`Heading` by default). The
//! block still open at end of file is always parsed with a header row,
//! whatever its name.

use crate::models::{HeaderMode, PipelineError, Result, Table};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How a section block was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalization {
    /// Closed by the next marker line
    MidFile,
    /// Still open when the file ended
    EndOfFile,
}

/// Raw lines of one section, marker line excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBlock {
    pub name: String,
    pub text: String,
    pub finalized: Finalization,
}

impl SectionBlock {
    /// Header mode for this block given the configured headerless section.
    pub fn header_mode(&self, headerless_section: &str) -> HeaderMode {
        match self.finalized {
            Finalization::MidFile if self.name == headerless_section => HeaderMode::Headerless,
            _ => HeaderMode::Infer,
        }
    }
}

/// Section name of a marker line, or `None` for an ordinary line.
///
/// Brackets and line terminators are stripped from both ends, so `[Probes]`
/// yields `Probes`.
pub fn marker_name(line: &str) -> Option<&str> {
    if line.starts_with('[') {
        Some(line.trim_matches(['[', ']', '\r', '\n']))
    } else {
        None
    }
}

/// Cut a stream into section blocks.
///
/// A marker with an empty name (`[]`) leaves no section open, so its lines
/// are dropped like those before the first marker.
pub fn split_sections<R: BufRead>(reader: R) -> io::Result<Vec<SectionBlock>> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;
    let mut buffer = String::new();

    for line in reader.lines() {
        let line = line?;
        if let Some(name) = marker_name(&line) {
            if let Some(done) = current.take() {
                blocks.push(SectionBlock {
                    name: done,
                    text: std::mem::take(&mut buffer),
                    finalized: Finalization::MidFile,
                });
            }
            buffer.clear();
            current = (!name.is_empty()).then(|| name.to_string());
            continue;
        }
        if current.is_some() {
            buffer.push_str(&line);
            buffer.push('\n');
        }
    }

    if let Some(done) = current {
        blocks.push(SectionBlock {
            name: done,
            text: buffer,
            finalized: Finalization::EndOfFile,
        });
    }

    Ok(blocks)
}

/// Split one file into tables, one per section name.
///
/// A section name seen twice keeps the later block.
pub fn split_file(path: &Path, headerless_section: &str) -> Result<Vec<Table>> {
    let file = File::open(path)
        .map_err(|e| PipelineError::io(format!("opening {}", path.display()), e))?;
    let blocks = split_sections(BufReader::new(file))
        .map_err(|e| PipelineError::io(format!("reading {}", path.display()), e))?;

    let mut tables: Vec<Table> = Vec::with_capacity(blocks.len());
    for block in blocks {
        let mode = block.header_mode(headerless_section);
        let table = Table::parse_tsv(&block.name, &block.text, mode, path)?;
        debug!(
            file = %path.display(),
            section = %table.name,
            rows = table.len(),
            columns = table.width(),
            header = ?mode,
            types = ?table.column_types(),
            "Parsed section"
        );
        match tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => tables.push(table),
        }
    }

    Ok(tables)
}

/// Write each table as `<dir>/<name>.tsv`, returning the written paths.
pub fn write_tables(tables: &[Table], dir: &Path) -> Result<Vec<PathBuf>> {
    tables
        .iter()
        .map(|table| {
            let path = dir.join(format!("{}.tsv", file_stem_for(&table.name)));
            table.write_tsv(&path)?;
            Ok(path)
        })
        .collect()
}

/// Section names become file names; path separators would escape `dir`.
fn file_stem_for(section: &str) -> String {
    section.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_source(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_marker_name() {
        assert_eq!(marker_name("[Probes]"), Some("Probes"));
        assert_eq!(marker_name("[Heading]\r"), Some("Heading"));
        assert_eq!(marker_name("[[Controls]]"), Some("Controls"));
        assert_eq!(marker_name("Probe_Id\tSymbol"), None);
        assert_eq!(marker_name(" [A]"), None);
    }

    #[test]
    fn test_split_sections_drops_preamble_and_markers() {
        let input = "preamble\n[A]\nx\ty\n1\t2\n[B]\nz\n3\n";
        let blocks = split_sections(input.as_bytes()).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "A");
        assert_eq!(blocks[0].text, "x\ty\n1\t2\n");
        assert_eq!(blocks[0].finalized, Finalization::MidFile);
        assert_eq!(blocks[1].name, "B");
        assert_eq!(blocks[1].text, "z\n3\n");
        assert_eq!(blocks[1].finalized, Finalization::EndOfFile);
    }

    #[test]
    fn test_no_markers_yields_no_blocks() {
        let blocks = split_sections("a\tb\n1\t2\n".as_bytes()).unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_empty_marker_discards_lines() {
        let blocks = split_sections("[]\nlost\n[A]\nk\nv\n".as_bytes()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "A");
    }

    #[test]
    fn test_three_sections_with_mid_file_heading() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_source(
            temp_dir.path(),
            "sample.txt",
            "[A]\ncol1\tcol2\n1\t2\n[Heading]\nVersion\t1.0\nDate\t2015\n[B]\nid\tvalue\nx\t9\n",
        );

        let tables = split_file(&path, "Heading").unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A", "Heading", "B"]);

        assert_eq!(tables[0].columns, vec!["col1", "col2"]);
        assert_eq!(tables[0].rows, vec![vec!["1", "2"]]);

        // Mid-file Heading: first row is data, columns are positional.
        assert_eq!(tables[1].columns, vec!["0", "1"]);
        assert_eq!(tables[1].rows[0], vec!["Version", "1.0"]);
        assert_eq!(tables[1].len(), 2);

        assert_eq!(tables[2].columns, vec!["id", "value"]);
    }

    #[test]
    fn test_trailing_heading_is_parsed_with_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_source(
            temp_dir.path(),
            "sample.txt",
            "[A]\nk\tv\n1\t2\n[Heading]\nVersion\t1.0\nDate\t2015\n",
        );

        let tables = split_file(&path, "Heading").unwrap();
        let heading = tables.iter().find(|t| t.name == "Heading").unwrap();

        // End-of-file finalization always infers the header row.
        assert_eq!(heading.columns, vec!["Version", "1.0"]);
        assert_eq!(heading.rows, vec![vec!["Date", "2015"]]);
    }

    #[test]
    fn test_repeated_section_keeps_last_block() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_source(temp_dir.path(), "s.txt", "[A]\nk\n1\n[A]\nk\n2\n");
        let tables = split_file(&path, "Heading").unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows, vec![vec!["2"]]);
    }

    #[test]
    fn test_empty_mid_file_section_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_source(temp_dir.path(), "s.txt", "[A]\n[B]\nk\n1\n");
        let err = split_file(&path, "Heading").unwrap_err();
        assert!(matches!(err, PipelineError::EmptySection { ref section, .. } if section == "A"));
    }

    #[test]
    fn test_open_quote_does_not_swallow_following_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_source(
            temp_dir.path(),
            "s.txt",
            "[A]\nid\tdef\n1\t\"open quote never closed\n2\tsecond\n3\tthird\n[B]\nk\n1\n",
        );
        let err = split_file(&path, "Heading").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedSection { ref section, .. } if section == "A"));
    }

    #[test]
    fn test_write_tables_names_files_after_sections() {
        let temp_dir = TempDir::new().unwrap();
        let src = write_source(
            temp_dir.path(),
            "s.txt",
            "[Heading]\nk\tv\n[Probes]\nProbe_Id\tSymbol\nILMN_1\tA1BG\n",
        );
        let out = temp_dir.path().join("split");
        std::fs::create_dir(&out).unwrap();

        let tables = split_file(&src, "Heading").unwrap();
        let written = write_tables(&tables, &out).unwrap();

        assert_eq!(written, vec![out.join("Heading.tsv"), out.join("Probes.tsv")]);
        assert_eq!(
            std::fs::read_to_string(out.join("Heading.tsv")).unwrap(),
            "0\t1\nk\tv\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join("Probes.tsv")).unwrap(),
            "Probe_Id\tSymbol\nILMN_1\tA1BG\n"
        );
    }
}
