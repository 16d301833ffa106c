use std::sync::Arc;

use tokio::sync::broadcast;

use crate::broadcast::JobEvent;
use crate::job::{JobPhase, JobStatus};

/// Events emitted by the pipeline while it works on a job.
/// Matched text never leaves the pipeline through events.
pub enum ProgressEvent {
    Phase {
        status: JobStatus,
        phase: JobPhase,
        message: String,
    },
    AwaitingReview {
        match_count: usize,
    },
    Completed {
        output_path: String,
    },
    Failed {
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Publishes pipeline events for one job on the event channel.
pub struct BroadcastProgress {
    job_id: String,
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl BroadcastProgress {
    pub fn new(job_id: &str, sender: Arc<broadcast::Sender<JobEvent>>) -> Self {
        Self {
            job_id: job_id.to_string(),
            sender,
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        let event = match event {
            ProgressEvent::Phase {
                status,
                phase,
                message,
            } => JobEvent::new(&self.job_id, status, phase, &message),
            ProgressEvent::AwaitingReview { match_count } => {
                JobEvent::awaiting_review(&self.job_id, match_count)
            }
            ProgressEvent::Completed { output_path } => {
                JobEvent::completed(&self.job_id, &output_path)
            }
            ProgressEvent::Failed { error } => JobEvent::failed(&self.job_id, &error),
        };
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::JobEventBroadcaster;

    #[test]
    fn test_broadcast_progress_maps_events() {
        let broadcaster = JobEventBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();
        let progress = BroadcastProgress::new("job-9", broadcaster.sender());

        progress.report(ProgressEvent::Phase {
            status: JobStatus::Processing,
            phase: JobPhase::DetectingPii,
            message: "Scanning text".to_string(),
        });
        progress.report(ProgressEvent::AwaitingReview { match_count: 2 });
        progress.report(ProgressEvent::Failed {
            error: "boom".to_string(),
        });

        let phase = rx.try_recv().unwrap();
        assert_eq!(phase.job_id, "job-9");
        assert_eq!(phase.phase, JobPhase::DetectingPii);
        assert_eq!(phase.message, "Scanning text");

        let review = rx.try_recv().unwrap();
        assert_eq!(review.status, JobStatus::ReadyForReview);
        assert_eq!(review.match_count, Some(2));

        let failed = rx.try_recv().unwrap();
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}
