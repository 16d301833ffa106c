use std::path::PathBuf;

use crate::job::{Job, JobStatus};

/// What a worker should do with a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKind {
    /// Frames, OCR, detection and previews; ends in review, or in a finished
    /// document for legacy jobs.
    Process,
    /// Final redaction and document assembly after review.
    Generate,
}

impl std::fmt::Display for WorkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkKind::Process => write!(f, "process"),
            WorkKind::Generate => write!(f, "generate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub job_id: String,
    pub kind: WorkKind,
}

impl WorkItem {
    pub fn process(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            kind: WorkKind::Process,
        }
    }

    pub fn generate(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            kind: WorkKind::Generate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkResult {
    pub job_id: String,
    pub kind: WorkKind,
    pub success: bool,
    /// Status after the work; `None` when the job could not be loaded.
    pub status: Option<JobStatus>,
    pub output_path: Option<PathBuf>,
    pub warnings: usize,
    pub error: Option<String>,
}

impl WorkResult {
    pub fn from_job(job: &Job, kind: WorkKind, warnings: usize) -> Self {
        let status = job.status();
        Self {
            job_id: job.id.clone(),
            kind,
            success: status != JobStatus::Error,
            status: Some(status),
            output_path: job.output_path.clone(),
            warnings,
            error: job.error.clone(),
        }
    }

    pub fn failure(item: &WorkItem, error: String) -> Self {
        Self {
            job_id: item.job_id.clone(),
            kind: item.kind,
            success: false,
            status: None,
            output_path: None,
            warnings: 0,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redaction::RedactionMode;
    use std::collections::BTreeSet;

    #[test]
    fn test_result_from_failed_job() {
        let mut job = Job::new(PathBuf::from("/in/rec.mov"), RedactionMode::Blur, BTreeSet::new());
        job.transition(JobStatus::Processing).unwrap();
        job.fail("No frames could be extracted from rec.mov");

        let result = WorkResult::from_job(&job, WorkKind::Process, 0);
        assert!(!result.success);
        assert_eq!(result.status, Some(JobStatus::Error));
        assert!(result.error.unwrap().contains("No frames"));
    }

    #[test]
    fn test_failure_for_missing_job() {
        let result = WorkResult::failure(&WorkItem::generate("gone"), "Job not found: gone".into());
        assert_eq!(result.kind, WorkKind::Generate);
        assert!(result.status.is_none());
        assert!(!result.success);
    }
}
