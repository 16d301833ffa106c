use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::extraction::BoundingBox;
use crate::pii::ConfidenceTier;
use crate::redaction::RedactionMode;

use super::model::Job;
use super::status::{JobPhase, JobStatus};

/// Cheap status snapshot for polling.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub job_id: String,
    pub status: JobStatus,
    pub phase: JobPhase,
    pub has_pii_detections: bool,
    pub key_frame_count: usize,
    pub redaction_mode: RedactionMode,
    pub name_detection_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl StatusView {
    pub fn from_job(job: &Job, name_detection_available: bool) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status(),
            phase: job.phase,
            has_pii_detections: job.has_pii_detections(),
            key_frame_count: job.key_frames.len(),
            redaction_mode: job.redaction_mode,
            name_detection_available,
            error: job.error.clone(),
            output_path: job.output_path.clone(),
            warnings: job.warnings.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiEntry {
    pub match_index: usize,
    #[serde(rename = "type")]
    pub pii_type: String,
    pub confidence: ConfidenceTier,
    pub matched_text: String,
    pub bbox: BoundingBox,
    pub redact: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReview {
    pub frame_id: usize,
    pub image: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PathBuf>,
    pub matches: Vec<PiiEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPayload {
    pub job_id: String,
    pub status: JobStatus,
    pub redaction_mode: RedactionMode,
    pub has_pii_detections: bool,
    pub enabled_optional: Vec<String>,
    pub unavailable_categories: Vec<String>,
    pub name_detection_available: bool,
    pub frames: Vec<FrameReview>,
}

impl ReviewPayload {
    pub fn from_job(job: &Job, name_detection_available: bool) -> Self {
        let frames = job
            .key_frames
            .iter()
            .enumerate()
            .map(|(frame_id, image)| FrameReview {
                frame_id,
                image: image.clone(),
                preview: job.previews.get(frame_id).cloned().flatten(),
                matches: job
                    .decisions_for_frame(frame_id)
                    .into_iter()
                    .enumerate()
                    .map(|(match_index, (m, redact))| PiiEntry {
                        match_index,
                        pii_type: m.pii_type.clone(),
                        confidence: m.confidence,
                        matched_text: m.matched_text.clone(),
                        bbox: m.bbox,
                        redact,
                    })
                    .collect(),
            })
            .collect();

        Self {
            job_id: job.id.clone(),
            status: job.status(),
            redaction_mode: job.redaction_mode,
            has_pii_detections: job.has_pii_detections(),
            enabled_optional: job.enabled_optional.iter().cloned().collect(),
            unavailable_categories: job.unavailable_categories.clone(),
            name_detection_available,
            frames,
        }
    }

    pub fn match_count(&self) -> usize {
        self.frames.iter().map(|f| f.matches.len()).sum()
    }
}

/// Inbound reviewer decisions plus the job-wide redaction mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPayload {
    pub redaction_mode: RedactionMode,
    #[serde(default)]
    pub frames: Vec<FrameDecisions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDecisions {
    pub frame_id: usize,
    pub decisions: Vec<MatchDecision>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDecision {
    pub match_index: usize,
    pub redact: bool,
}
