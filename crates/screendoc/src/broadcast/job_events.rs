//! Job lifecycle events for live status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::{JobPhase, JobStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: String,
    pub status: JobStatus,
    pub phase: JobPhase,
    /// Human-readable description of the current activity.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobEvent {
    pub fn new(job_id: &str, status: JobStatus, phase: JobPhase, message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status,
            phase,
            message: message.to_string(),
            timestamp: Utc::now(),
            match_count: None,
            output_path: None,
            error: None,
        }
    }

    pub fn awaiting_review(job_id: &str, match_count: usize) -> Self {
        Self {
            match_count: Some(match_count),
            ..Self::new(
                job_id,
                JobStatus::ReadyForReview,
                JobPhase::AwaitingReview,
                "Detections ready for review",
            )
        }
    }

    pub fn completed(job_id: &str, output_path: &str) -> Self {
        Self {
            output_path: Some(output_path.to_string()),
            ..Self::new(
                job_id,
                JobStatus::Complete,
                JobPhase::Done,
                "Document generated successfully",
            )
        }
    }

    pub fn failed(job_id: &str, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(job_id, JobStatus::Error, JobPhase::Failed, "Processing failed")
        }
    }
}

/// Fans job events out to any number of subscribers.
#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl JobEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    pub fn sender(&self) -> Arc<broadcast::Sender<JobEvent>> {
        Arc::clone(&self.sender)
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_events() {
        let broadcaster = JobEventBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        broadcaster.send(JobEvent::new(
            "job-1",
            JobStatus::Processing,
            JobPhase::ExtractingFrames,
            "Extracting frames",
        ));
        broadcaster.send(JobEvent::completed("job-1", "/out/guide.pdf"));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.phase, JobPhase::ExtractingFrames);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.status, JobStatus::Complete);
        assert_eq!(second.output_path.as_deref(), Some("/out/guide.pdf"));
    }

    #[test]
    fn test_send_without_subscribers() {
        let broadcaster = JobEventBroadcaster::default();
        broadcaster.send(JobEvent::failed("job-2", "no frames"));
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = JobEvent::awaiting_review("job-3", 4);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["jobId"], "job-3");
        assert_eq!(json["status"], "ready_for_review");
        assert_eq!(json["matchCount"], 4);
        assert!(json.get("error").is_none());
    }
}
