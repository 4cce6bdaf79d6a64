//! geoprep CLI - download and reshape a GEO dataset archive.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geoprep::pipeline::StageRun;
use geoprep::{Config, HttpFetcher, Pipeline, StageKind};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "geoprep")]
#[command(version)]
#[command(about = "Checkpointed download and reshaping of GEO dataset archives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline up to a stage, skipping stages already on disk
    Run {
        /// Dataset identifier (e.g. GSE68849)
        #[arg(short, long)]
        dataset: Option<String>,

        /// Last stage to run
        #[arg(short, long, value_enum, default_value = "cleanup")]
        until: StageKind,

        /// Override the base data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show which stages are complete for a dataset
    Status {
        /// Dataset identifier
        #[arg(short, long)]
        dataset: Option<String>,

        /// Last stage to inspect
        #[arg(short, long, value_enum, default_value = "cleanup")]
        until: StageKind,

        /// Override the base data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn print_example_config() {
    let example = r#"# geoprep configuration file

[pipeline]
data_dir = "data"
dataset = "GSE68849"

[download]
url_template = "https://www.ncbi.nlm.nih.gov/geo/download/?acc={dataset}&format=file"
# url_template = "file:///mnt/mirror/{dataset}_RAW.tar"
timeout_secs = 600
show_progress = true

[extract]
decompress_gzip = true

[split]
source_extension = "txt"
headerless_section = "Heading"

[trim]
table = "Probes"
columns = [
    "Definition", "Ontology_Component", "Ontology_Process",
    "Ontology_Function", "Synonyms", "Obsolete_Probe_Id", "Probe_Sequence",
]
output_name = "Probes_trimmed.tsv"

[cleanup]
marker_name = "cleanup_complete.txt"
purge_extracted = false
"#;
    println!("{example}");
}

fn load_config(cli: &Cli, data_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load config from {path:?}"),
        None => "Failed to build default config".to_string(),
    })?;
    if let Some(dir) = data_dir {
        config.pipeline.data_dir = dir;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match &cli.command {
        Commands::Example => {
            print_example_config();
        }

        Commands::Validate => {
            let config = load_config(&cli, None)?;
            info!("Configuration is valid");
            info!("  Data dir: {}", config.pipeline.data_dir.display());
            info!("  Dataset:  {}", config.pipeline.dataset);
            info!("  URL:      {}", config.download_url(&config.pipeline.dataset));
            info!(
                "  Trim:     {} column(s) from {}",
                config.trim.columns.len(),
                config.trim.table
            );
        }

        Commands::Status {
            dataset,
            until,
            data_dir,
        } => {
            let config = load_config(&cli, data_dir.clone())?;
            let dataset = dataset
                .clone()
                .unwrap_or_else(|| config.pipeline.dataset.clone());
            let fetcher = HttpFetcher::from_config(&config.download)?;
            let pipeline = Pipeline::new(config, fetcher);

            println!("Dataset: {dataset}");
            for (stage, status) in pipeline.status(&dataset, *until)? {
                println!("  {:<13} {:<9} {}", stage.kind.name(), status, stage.output);
            }
        }

        Commands::Run {
            dataset,
            until,
            data_dir,
            report,
        } => {
            let config = load_config(&cli, data_dir.clone())?;
            let dataset = dataset
                .clone()
                .unwrap_or_else(|| config.pipeline.dataset.clone());
            let fetcher = HttpFetcher::from_config(&config.download)
                .context("Failed to create HTTP client")?;
            let pipeline = Pipeline::new(config, fetcher);

            let run = pipeline
                .run(&dataset, *until)
                .await
                .with_context(|| format!("Pipeline failed for dataset {dataset}"))?;

            if let Some(path) = report {
                run.write_json(path)
                    .with_context(|| format!("Failed to write report to {path:?}"))?;
            }

            println!("\n=== Pipeline Complete ===");
            println!("Dataset:  {}", run.dataset);
            for outcome in &run.stages {
                let status = match outcome.status {
                    StageRun::Ran => "ran",
                    StageRun::Skipped => "skipped",
                };
                println!(
                    "  {:<13} {:<8} {}",
                    outcome.stage.name(),
                    status,
                    outcome.detail.as_deref().unwrap_or("")
                );
            }
            println!("Ran:      {}", run.ran());
            println!("Skipped:  {}", run.skipped());
            println!("Runtime:  {:.1}s", run.runtime_secs);
        }
    }

    Ok(())
}
