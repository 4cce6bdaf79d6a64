//! Stage descriptors and stage actions.
//!
//! Chain (fixed):
//! Download → Extract → Split → TrimColumns → Cleanup
//!
//! Each stage names exactly one upstream stage (Download names none), and
//! the chain for a run is resolved once into an ordered list.

use crate::checkpoint::{DatasetLayout, OutputTarget, ensure_dir, list_files};
use crate::client::{Fetcher, extract_archive, gunzip_members};
use crate::models::{Config, Result};
use crate::tables::{remove_sources, split_file, trim_table, write_tables, write_marker};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// The five pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Fetch `<D>_RAW.tar`
    Download,
    /// Unpack into `<D>_extracted/`
    Extract,
    /// Reshape section files into `<D>_split/*.tsv`
    Split,
    /// Drop unneeded Probes columns into `<D>_final/`
    TrimColumns,
    /// Remove text sources and write the completion marker
    Cleanup,
}

impl StageKind {
    /// Every stage, root first.
    pub const ALL: [StageKind; 5] = [
        Self::Download,
        Self::Extract,
        Self::Split,
        Self::TrimColumns,
        Self::Cleanup,
    ];

    /// The stage whose output this one consumes.
    pub fn requires(self) -> Option<StageKind> {
        match self {
            Self::Download => None,
            Self::Extract => Some(Self::Download),
            Self::Split => Some(Self::Extract),
            Self::TrimColumns => Some(Self::Split),
            Self::Cleanup => Some(Self::TrimColumns),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Split => "split",
            Self::TrimColumns => "trim_columns",
            Self::Cleanup => "cleanup",
        }
    }

    /// Checkpoint target of this stage within `layout`.
    pub fn output(self, layout: &DatasetLayout) -> OutputTarget {
        let path = match self {
            Self::Download => layout.raw_archive(),
            Self::Extract => layout.extracted_dir(),
            Self::Split => layout.split_dir(),
            Self::TrimColumns => layout.final_dir(),
            Self::Cleanup => layout.cleanup_marker(),
        };
        OutputTarget::new(path)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// One resolved stage of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    pub kind: StageKind,
    pub dataset: String,
    pub output: OutputTarget,
}

impl StageDescriptor {
    pub fn new(kind: StageKind, layout: &DatasetLayout) -> Self {
        Self {
            kind,
            dataset: layout.dataset().to_string(),
            output: kind.output(layout),
        }
    }
}

/// Walk `requires` back from `final_stage` and return the chain root first.
pub fn resolve_chain(final_stage: StageKind, layout: &DatasetLayout) -> Vec<StageDescriptor> {
    let mut chain = Vec::new();
    let mut next = Some(final_stage);
    while let Some(kind) = next {
        chain.push(StageDescriptor::new(kind, layout));
        next = kind.requires();
    }
    chain.reverse();
    chain
}

/// What a stage action gets to work with.
pub struct StageContext<'a> {
    pub config: &'a Config,
    pub layout: &'a DatasetLayout,
}

/// Fetch the raw archive.
pub async fn download<F: Fetcher>(ctx: &StageContext<'_>, fetcher: &F) -> Result<String> {
    ensure_dir(ctx.layout.data_dir())?;
    let url = ctx.config.download_url(ctx.layout.dataset());
    let dest = ctx.layout.raw_archive();

    info!(url = %url, dest = %dest.display(), "Downloading dataset archive");
    let bytes = fetcher.fetch(&url, &dest).await?;
    Ok(format!("{bytes} bytes from {url}"))
}

/// Unpack the raw archive, then gunzip compressed members if configured.
pub fn extract(ctx: &StageContext<'_>) -> Result<String> {
    let dest = ctx.layout.extracted_dir();
    ensure_dir(&dest)?;

    let members = extract_archive(&ctx.layout.raw_archive(), &dest)?;
    let decompressed = if ctx.config.extract.decompress_gzip {
        gunzip_members(&dest)?.len()
    } else {
        0
    };

    Ok(format!("{members} members, {decompressed} decompressed"))
}

/// Split every source file of the extracted directory into tables.
///
/// Files are visited in name order, so when two files carry a section of
/// the same name the later file's table is the one left on disk.
pub fn split(ctx: &StageContext<'_>) -> Result<String> {
    let out_dir = ctx.layout.split_dir();
    ensure_dir(&out_dir)?;

    let sources = list_sources(ctx)?;
    let mut table_count = 0;
    for source in &sources {
        let tables = split_file(source, &ctx.config.split.headerless_section)?;
        let written = write_tables(&tables, &out_dir)?;
        debug!(source = %source.display(), tables = written.len(), "Split source file");
        table_count += written.len();
    }

    Ok(format!(
        "{table_count} tables from {} source files",
        sources.len()
    ))
}

fn list_sources(ctx: &StageContext<'_>) -> Result<Vec<PathBuf>> {
    list_files(
        &ctx.layout.extracted_dir(),
        &format!("*.{}", ctx.config.source_extension()),
    )
}

/// Drop the configured columns from the configured table.
pub fn trim_columns(ctx: &StageContext<'_>) -> Result<String> {
    ensure_dir(&ctx.layout.final_dir())?;

    let src = ctx
        .layout
        .split_dir()
        .join(format!("{}.tsv", ctx.config.trim.table));
    let table = trim_table(&src, &ctx.layout.trimmed_table(), &ctx.config.trim.columns)?;

    Ok(format!(
        "{} rows, {} columns kept",
        table.len(),
        table.width()
    ))
}

/// Delete text sources from the split directory and write the marker.
pub fn cleanup(ctx: &StageContext<'_>) -> Result<String> {
    let ext = ctx.config.source_extension();
    let mut removed = remove_sources(&ctx.layout.split_dir(), ext)?;
    if ctx.config.cleanup.purge_extracted {
        removed += remove_sources(&ctx.layout.extracted_dir(), ext)?;
    }

    write_marker(&ctx.layout.cleanup_marker())?;
    Ok(format!("{removed} source files removed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn layout() -> DatasetLayout {
        let mut config = Config::default();
        config.pipeline.data_dir = PathBuf::from("data");
        DatasetLayout::new(&config, "GSE1")
    }

    #[test]
    fn test_chain_from_cleanup_is_full_fixed_order() {
        let chain = resolve_chain(StageKind::Cleanup, &layout());
        let kinds: Vec<StageKind> = chain.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, StageKind::ALL.to_vec());
        assert!(chain.iter().all(|s| s.dataset == "GSE1"));
    }

    #[test]
    fn test_chain_stops_at_requested_stage() {
        let chain = resolve_chain(StageKind::Split, &layout());
        let kinds: Vec<StageKind> = chain.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![StageKind::Download, StageKind::Extract, StageKind::Split]
        );

        let root = resolve_chain(StageKind::Download, &layout());
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn test_stage_outputs() {
        let layout = layout();
        assert_eq!(
            StageKind::Download.output(&layout).path(),
            Path::new("data/GSE1_RAW.tar")
        );
        assert_eq!(
            StageKind::TrimColumns.output(&layout).path(),
            Path::new("data/GSE1_final")
        );
        assert_eq!(
            StageKind::Cleanup.output(&layout).path(),
            Path::new("data/GSE1_split/cleanup_complete.txt")
        );
    }

    #[test]
    fn test_every_stage_but_root_requires_its_predecessor() {
        for pair in StageKind::ALL.windows(2) {
            assert_eq!(pair[1].requires(), Some(pair[0]));
        }
        assert_eq!(StageKind::Download.requires(), None);
    }
}
