use std::path::Path;

use log::warn;

use crate::document::Resolution;
use crate::job::Job;
use crate::storage::JobWorkspace;

use super::error::{PipelineError, StageOutcome, StageWarning};

/// Mutable state threaded through one run of the pipeline for one job.
pub struct PipelineContext {
    // Working copy; committed back to the repository by the runner
    pub job: Job,

    pub workspace: JobWorkspace,

    // Set by the narrative step
    pub narrative: Option<String>,

    // Set by the resolve step
    pub resolution: Option<Resolution>,

    // Non-fatal warnings of this run
    pub warnings: Vec<StageWarning>,
}

impl PipelineContext {
    pub fn new(job: Job, work_directory: &Path) -> Self {
        let workspace = JobWorkspace::new(work_directory, &job.id);
        Self {
            job,
            workspace,
            narrative: None,
            resolution: None,
            warnings: Vec::new(),
        }
    }

    /// Records a warning on the run and on the job.
    pub fn warn(&mut self, warning: StageWarning) {
        warn!("Job {}: {}", self.job.id, warning);
        self.job.warnings.push(warning.to_string());
        self.warnings.push(warning);
    }

    /// Takes the value of a stage, recording its warnings.
    pub fn absorb<T>(&mut self, outcome: StageOutcome<T>) -> Result<T, PipelineError> {
        let (value, warnings) = outcome.into_parts()?;
        for warning in warnings {
            self.warn(warning);
        }
        Ok(value)
    }
}
