//! Pipeline orchestrator.
//!
//! Pipeline flow:
//! resolve chain → for each stage: checkpoint present? skip : run → report
//!
//! Execution is strictly sequential and fail-fast: the first failing stage
//! aborts the run, and outputs of the stages before it stay on disk.

use crate::checkpoint::{
    CompletionCheck, DatasetLayout, ExistenceCheck, StageStatus, is_complete,
};
use crate::client::Fetcher;
use crate::models::{Config, PipelineError, Result, validate_dataset};
use crate::pipeline::stages::{self, StageContext, StageDescriptor, StageKind, resolve_chain};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

/// What happened to a stage during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageRun {
    /// The stage's action ran and produced its output
    Ran,
    /// The output target already existed
    Skipped,
}

/// Outcome of one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: StageKind,
    pub status: StageRun,
    pub output: String,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Report of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub dataset: String,
    pub final_stage: StageKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub runtime_secs: f64,
    pub stages: Vec<StageOutcome>,
}

impl RunReport {
    pub fn ran(&self) -> usize {
        self.count(StageRun::Ran)
    }

    pub fn skipped(&self) -> usize {
        self.count(StageRun::Skipped)
    }

    fn count(&self, status: StageRun) -> usize {
        self.stages.iter().filter(|s| s.status == status).count()
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| PipelineError::io(format!("creating report {}", path.display()), e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| PipelineError::Internal(format!("Serializing run report: {e}")))
    }
}

/// Sequential stage runner with checkpoint skipping.
pub struct Pipeline<F, C = ExistenceCheck> {
    config: Config,
    fetcher: F,
    check: C,
}

impl<F: Fetcher> Pipeline<F> {
    /// Create a pipeline using the existence checkpoint rule.
    pub fn new(config: Config, fetcher: F) -> Self {
        Self {
            config,
            fetcher,
            check: ExistenceCheck,
        }
    }
}

impl<F: Fetcher, C: CompletionCheck> Pipeline<F, C> {
    /// Swap the completion policy.
    pub fn with_check<C2: CompletionCheck>(self, check: C2) -> Pipeline<F, C2> {
        Pipeline {
            config: self.config,
            fetcher: self.fetcher,
            check,
        }
    }

    pub fn layout(&self, dataset: &str) -> DatasetLayout {
        DatasetLayout::new(&self.config, dataset)
    }

    /// The ordered stage list a run would walk.
    pub fn plan(&self, dataset: &str, final_stage: StageKind) -> Result<Vec<StageDescriptor>> {
        validate_dataset(dataset)?;
        Ok(resolve_chain(final_stage, &self.layout(dataset)))
    }

    /// Checkpoint status of every stage up to `final_stage`.
    pub fn status(
        &self,
        dataset: &str,
        final_stage: StageKind,
    ) -> Result<Vec<(StageDescriptor, StageStatus)>> {
        Ok(self
            .plan(dataset, final_stage)?
            .into_iter()
            .map(|stage| {
                let status = StageStatus::from_check(self.check.is_complete(&stage));
                (stage, status)
            })
            .collect())
    }

    /// Run the whole chain (the entry target).
    pub async fn run_all(&self, dataset: &str) -> Result<RunReport> {
        self.run(dataset, StageKind::Cleanup).await
    }

    /// Run every stage up to and including `final_stage`.
    pub async fn run(&self, dataset: &str, final_stage: StageKind) -> Result<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        let chain = self.plan(dataset, final_stage)?;
        let layout = self.layout(dataset);

        info!(
            dataset,
            final_stage = %final_stage,
            stages = chain.len(),
            data_dir = %layout.data_dir().display(),
            "Starting pipeline"
        );

        let mut outcomes = Vec::with_capacity(chain.len());
        for stage in &chain {
            if self.check.is_complete(stage) {
                info!(stage = %stage.kind, output = %stage.output, "Output present, skipping");
                outcomes.push(StageOutcome {
                    stage: stage.kind,
                    status: StageRun::Skipped,
                    output: stage.output.to_string(),
                    elapsed_ms: 0,
                    detail: None,
                });
                continue;
            }

            info!(stage = %stage.kind, output = %stage.output, "Running stage");
            let stage_start = Instant::now();
            let detail = self
                .execute(stage, &layout)
                .await
                .and_then(|detail| {
                    if is_complete(&stage.output) {
                        Ok(detail)
                    } else {
                        Err(PipelineError::Internal(format!(
                            "stage finished without producing {}",
                            stage.output
                        )))
                    }
                })
                .map_err(|e| {
                    error!(stage = %stage.kind, error = %e, "Stage failed, aborting run");
                    e.in_stage(stage.kind.name())
                })?;

            let elapsed_ms = stage_start.elapsed().as_millis() as u64;
            info!(stage = %stage.kind, elapsed_ms, detail = %detail, "Stage complete");
            outcomes.push(StageOutcome {
                stage: stage.kind,
                status: StageRun::Ran,
                output: stage.output.to_string(),
                elapsed_ms,
                detail: Some(detail),
            });
        }

        let report = RunReport {
            dataset: dataset.to_string(),
            final_stage,
            started_at,
            finished_at: Utc::now(),
            runtime_secs: start.elapsed().as_secs_f64(),
            stages: outcomes,
        };

        info!(
            dataset,
            ran = report.ran(),
            skipped = report.skipped(),
            runtime = format!("{:.1}s", report.runtime_secs),
            "Pipeline complete"
        );
        Ok(report)
    }

    async fn execute(&self, stage: &StageDescriptor, layout: &DatasetLayout) -> Result<String> {
        let ctx = StageContext {
            config: &self.config,
            layout,
        };
        match stage.kind {
            StageKind::Download => stages::download(&ctx, &self.fetcher).await,
            StageKind::Extract => stages::extract(&ctx),
            StageKind::Split => stages::split(&ctx),
            StageKind::TrimColumns => stages::trim_columns(&ctx),
            StageKind::Cleanup => stages::cleanup(&ctx),
        }
    }
}
