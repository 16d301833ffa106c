use thiserror::Error;

use crate::job::JobPhase;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Processing failed: {0}")]
    Processing(#[from] crate::error::ProcessError),

    #[error("Storage failed: {0}")]
    Storage(#[from] crate::error::StorageError),

    #[error("{0}")]
    Job(#[from] crate::error::JobError),

    #[error("No frames could be extracted from {0}")]
    NoFrames(String),
}

/// A non-fatal problem recorded against the stage that hit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageWarning {
    pub phase: JobPhase,
    pub message: String,
}

impl StageWarning {
    pub fn new(phase: JobPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StageWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.phase, self.message)
    }
}

/// Result of one pipeline stage.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Success(T),
    /// The stage produced a usable value but some inputs were skipped.
    Partial(T, Vec<StageWarning>),
    Fatal(PipelineError),
}

impl<T> StageOutcome<T> {
    pub fn with_warnings(value: T, warnings: Vec<StageWarning>) -> Self {
        if warnings.is_empty() {
            StageOutcome::Success(value)
        } else {
            StageOutcome::Partial(value, warnings)
        }
    }

    pub fn fatal(error: impl Into<PipelineError>) -> Self {
        StageOutcome::Fatal(error.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StageOutcome::Fatal(_))
    }

    /// Splits the outcome into its value and warnings, or the fatal error.
    pub fn into_parts(self) -> Result<(T, Vec<StageWarning>), PipelineError> {
        match self {
            StageOutcome::Success(value) => Ok((value, Vec::new())),
            StageOutcome::Partial(value, warnings) => Ok((value, warnings)),
            StageOutcome::Fatal(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_warnings_picks_variant() {
        assert!(matches!(
            StageOutcome::with_warnings(1, vec![]),
            StageOutcome::Success(1)
        ));

        let partial = StageOutcome::with_warnings(
            2,
            vec![StageWarning::new(JobPhase::ExtractingText, "frame 3 unreadable")],
        );
        let (value, warnings) = partial.into_parts().unwrap();
        assert_eq!(value, 2);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_fatal_into_parts() {
        let outcome: StageOutcome<()> = StageOutcome::fatal(PipelineError::NoFrames("rec.mov".into()));
        assert!(outcome.is_fatal());
        assert!(matches!(outcome.into_parts(), Err(PipelineError::NoFrames(_))));
    }

    #[test]
    fn test_warning_display() {
        let w = StageWarning::new(JobPhase::Redacting, "frame 2 left out");
        assert_eq!(w.to_string(), "Applying redactions: frame 2 left out");
    }
}
