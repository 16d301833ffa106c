use serde::{Deserialize, Serialize};

/// Lifecycle of a job. Moves forward only, except into `Error`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploaded,
    Processing,
    ReadyForReview,
    Complete,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploaded => "uploaded",
            JobStatus::Processing => "processing",
            JobStatus::ReadyForReview => "ready_for_review",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Uploaded, Processing)
            | (Processing, ReadyForReview)
            | (Processing, Complete)
            | (ReadyForReview, Complete) => true,
            (current, Error) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finer-grained progress inside a status. Informational only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    ExtractingFrames,
    SelectingFrames,
    ExtractingText,
    DetectingPii,
    RenderingPreviews,
    AwaitingReview,
    Redacting,
    GeneratingNarrative,
    RenderingDocument,
    Done,
    Failed,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Queued => write!(f, "Queued"),
            JobPhase::ExtractingFrames => write!(f, "Extracting frames"),
            JobPhase::SelectingFrames => write!(f, "Selecting key frames"),
            JobPhase::ExtractingText => write!(f, "Extracting text"),
            JobPhase::DetectingPii => write!(f, "Detecting PII"),
            JobPhase::RenderingPreviews => write!(f, "Rendering previews"),
            JobPhase::AwaitingReview => write!(f, "Awaiting review"),
            JobPhase::Redacting => write!(f, "Applying redactions"),
            JobPhase::GeneratingNarrative => write!(f, "Generating narrative"),
            JobPhase::RenderingDocument => write!(f, "Rendering document"),
            JobPhase::Done => write!(f, "Done"),
            JobPhase::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use JobStatus::*;

    const ALL: [JobStatus; 5] = [Uploaded, Processing, ReadyForReview, Complete, Error];

    #[test]
    fn test_forward_transitions() {
        assert!(Uploaded.can_transition_to(Processing));
        assert!(Processing.can_transition_to(ReadyForReview));
        assert!(Processing.can_transition_to(Complete));
        assert!(ReadyForReview.can_transition_to(Complete));
    }

    #[test]
    fn test_no_backward_or_skipping_transitions() {
        assert!(!Processing.can_transition_to(Uploaded));
        assert!(!ReadyForReview.can_transition_to(Processing));
        assert!(!Uploaded.can_transition_to(ReadyForReview));
        assert!(!Uploaded.can_transition_to(Complete));
        for s in ALL {
            assert!(!s.can_transition_to(s), "{} -> {}", s, s);
        }
    }

    #[test]
    fn test_error_reachable_from_non_terminal_only() {
        for s in ALL {
            assert_eq!(s.can_transition_to(Error), !s.is_terminal(), "{}", s);
        }
        for next in ALL {
            assert!(!Error.can_transition_to(next));
            assert!(!Complete.can_transition_to(next));
        }
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&ReadyForReview).unwrap(), "\"ready_for_review\"");
        assert_eq!(ReadyForReview.to_string(), "ready_for_review");
        assert_eq!(
            serde_json::to_string(&JobPhase::DetectingPii).unwrap(),
            "\"detecting_pii\""
        );
    }
}
