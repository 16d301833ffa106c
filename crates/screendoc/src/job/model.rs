use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::JobError;
use crate::extraction::{BoundingBox, TextRegion};
use crate::pii::PiiMatch;
use crate::redaction::RedactionMode;

use super::review::DecisionPayload;
use super::status::{JobPhase, JobStatus};

/// Whether processing pauses for a human review of detections.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    #[default]
    Interactive,
    /// Straight to a text-only document: no OCR, detection or embedded frames.
    Legacy,
}

/// Identity of a match that survives re-detection: the same text of the same
/// type in the same place on the same frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchFingerprint {
    pub frame_id: usize,
    pub pii_type: String,
    pub matched_text: String,
    pub bbox: BoundingBox,
}

impl MatchFingerprint {
    pub fn of(frame_id: usize, m: &PiiMatch) -> Self {
        Self {
            frame_id,
            pii_type: m.pii_type.clone(),
            matched_text: m.matched_text.clone(),
            bbox: m.bbox,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub video: PathBuf,
    status: JobStatus,
    pub phase: JobPhase,
    pub review_mode: ReviewMode,
    /// Every extracted frame, in temporal order.
    pub frames: Vec<PathBuf>,
    /// Evenly sampled frames handed to the narrative generator.
    pub context_frames: Vec<PathBuf>,
    pub key_frames: Vec<PathBuf>,
    /// OCR output per key frame, reused by re-detection.
    pub text_regions: Vec<Vec<TextRegion>>,
    /// Current matches per key frame.
    pub matches: Vec<Vec<PiiMatch>>,
    /// Explicit reviewer choices; absent means redact.
    pub decisions: HashMap<MatchFingerprint, bool>,
    pub redaction_mode: RedactionMode,
    pub enabled_optional: BTreeSet<String>,
    pub unavailable_categories: Vec<String>,
    pub previews: Vec<Option<PathBuf>>,
    pub redacted_frames: Vec<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(video: PathBuf, redaction_mode: RedactionMode, enabled_optional: BTreeSet<String>) -> Self {
        let title = video
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.replace(['_', '-'], " "))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "Screen recording".to_string());
        let now = Utc::now();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            video,
            status: JobStatus::Uploaded,
            phase: JobPhase::Queued,
            review_mode: ReviewMode::Interactive,
            frames: Vec::new(),
            context_frames: Vec::new(),
            key_frames: Vec::new(),
            text_regions: Vec::new(),
            matches: Vec::new(),
            decisions: HashMap::new(),
            redaction_mode,
            enabled_optional,
            unavailable_categories: Vec::new(),
            previews: Vec::new(),
            redacted_frames: Vec::new(),
            output_path: None,
            error: None,
            warnings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                job_id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves the job into `Error` with `cause`. A job that is already
    /// terminal keeps its state; returns whether the failure was recorded.
    pub fn fail(&mut self, cause: impl Into<String>) -> bool {
        if self.transition(JobStatus::Error).is_err() {
            return false;
        }
        self.phase = JobPhase::Failed;
        self.error = Some(cause.into());
        true
    }

    pub fn require_status(&self, expected: JobStatus) -> Result<(), JobError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(JobError::WrongStatus {
                job_id: self.id.clone(),
                status: self.status.to_string(),
                expected: expected.to_string(),
            })
        }
    }

    /// The job is paused for review with no generation queued or running.
    pub fn require_reviewable(&self) -> Result<(), JobError> {
        self.require_status(JobStatus::ReadyForReview)?;
        if self.phase != JobPhase::AwaitingReview {
            return Err(JobError::Busy(self.id.clone()));
        }
        Ok(())
    }

    pub fn has_pii_detections(&self) -> bool {
        self.matches.iter().any(|m| !m.is_empty())
    }

    pub fn match_count(&self) -> usize {
        self.matches.iter().map(Vec::len).sum()
    }

    pub fn decision_for(&self, frame_id: usize, m: &PiiMatch) -> bool {
        self.decisions
            .get(&MatchFingerprint::of(frame_id, m))
            .copied()
            .unwrap_or(true)
    }

    /// Matches of one key frame paired with their current decision.
    pub fn decisions_for_frame(&self, frame_id: usize) -> Vec<(&PiiMatch, bool)> {
        self.matches
            .get(frame_id)
            .map(|matches| {
                matches
                    .iter()
                    .map(|m| (m, self.decision_for(frame_id, m)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Records reviewer decisions and the job-wide mode. Every
    /// `(frame_id, match_index)` is checked before anything changes.
    pub fn apply_decisions(&mut self, payload: &DecisionPayload) -> Result<(), JobError> {
        let mut resolved = Vec::new();
        for frame in &payload.frames {
            for decision in &frame.decisions {
                let m = self
                    .matches
                    .get(frame.frame_id)
                    .and_then(|matches| matches.get(decision.match_index))
                    .ok_or_else(|| JobError::UnknownMatch {
                        job_id: self.id.clone(),
                        frame_id: frame.frame_id,
                        match_index: decision.match_index,
                    })?;
                resolved.push((MatchFingerprint::of(frame.frame_id, m), decision.redact));
            }
        }

        self.decisions.extend(resolved);
        self.redaction_mode = payload.redaction_mode;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replaces the match set after a detection pass. Decisions are kept
    /// even when their match disappears, so a category toggled off and back
    /// on gets its earlier choices back.
    pub fn replace_matches(&mut self, matches: Vec<Vec<PiiMatch>>) {
        self.matches = matches;
        self.updated_at = Utc::now();
    }
}
