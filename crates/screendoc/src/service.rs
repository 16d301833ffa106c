//! Caller-facing facade: create jobs, start them, poll, review, decide and
//! generate. Background work runs on the worker pool; every call here
//! returns without waiting for it except [`JobService::wait_for`].

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use crate::broadcast::{JobEvent, JobEventBroadcaster};
use crate::error::{JobError, Result, WorkerError};
use crate::job::{
    DecisionPayload, InMemoryJobRepository, Job, JobPhase, JobRepository, JobStatus,
    ReviewMode, ReviewPayload, StatusView,
};
use crate::pipeline::{Collaborators, Pipeline, PipelineConfig};
use crate::sanitize;
use crate::worker::{WorkItem, WorkKind, WorkResult, WorkerPool};

pub struct JobService {
    jobs: Arc<dyn JobRepository>,
    pipeline: Pipeline,
    pool: WorkerPool,
    events: JobEventBroadcaster,
    tracker: Arc<WorkTracker>,
    collector: JoinHandle<()>,
}

impl JobService {
    pub fn new(
        config: Arc<PipelineConfig>,
        collaborators: Collaborators,
        worker_count: usize,
    ) -> Result<Self> {
        Self::with_repository(
            config,
            collaborators,
            Arc::new(InMemoryJobRepository::new()),
            worker_count,
        )
    }

    pub fn with_repository(
        config: Arc<PipelineConfig>,
        collaborators: Collaborators,
        jobs: Arc<dyn JobRepository>,
        worker_count: usize,
    ) -> Result<Self> {
        let events = JobEventBroadcaster::default();
        let pool = WorkerPool::new(
            Arc::clone(&config),
            Arc::clone(&jobs),
            collaborators.clone(),
            worker_count,
            Some(events.sender()),
        )?;
        let pipeline = Pipeline::new(config, Arc::clone(&jobs), collaborators);

        let tracker = Arc::new(WorkTracker::default());
        let collector = spawn_collector(pool.results(), Arc::clone(&tracker))?;

        Ok(Self {
            jobs,
            pipeline,
            pool,
            events,
            tracker,
            collector,
        })
    }

    /// Registers a recording; the job starts out `uploaded`.
    pub fn create_job(&self, video: impl Into<PathBuf>) -> String {
        let config = self.pipeline.config();
        let job = Job::new(
            video.into(),
            config.redaction.default_mode,
            config.default_optional.iter().cloned().collect(),
        );
        let id = job.id.clone();

        info!(
            "Created job {} for {} ({})",
            id,
            sanitize::redact_path(&job.video),
            sanitize::hash_path(&job.video)
        );
        self.jobs.put(job);
        self.events.send(JobEvent::new(
            &id,
            JobStatus::Uploaded,
            JobPhase::Queued,
            "Job created",
        ));
        id
    }

    /// Moves the job to `processing` and queues the pipeline.
    pub fn start(&self, job_id: &str, review_mode: ReviewMode) -> Result<()> {
        self.jobs.update(job_id, &mut |job| {
            job.transition(JobStatus::Processing)?;
            job.review_mode = review_mode;
            job.phase = JobPhase::Queued;
            Ok(())
        })?;
        self.dispatch(WorkItem::process(job_id))
    }

    pub fn status(&self, job_id: &str) -> Result<StatusView> {
        let job = self.jobs.get(job_id)?;
        Ok(StatusView::from_job(&job, self.name_detection_available()))
    }

    pub fn list(&self) -> Vec<StatusView> {
        let available = self.name_detection_available();
        self.jobs
            .list()
            .iter()
            .map(|job| StatusView::from_job(job, available))
            .collect()
    }

    pub fn review(&self, job_id: &str) -> Result<ReviewPayload> {
        let job = self.jobs.get(job_id)?;
        job.require_status(JobStatus::ReadyForReview)?;
        Ok(ReviewPayload::from_job(&job, self.name_detection_available()))
    }

    /// Records reviewer choices and the job-wide mode. Rejects the whole
    /// payload if any `(frame_id, match_index)` is unknown.
    pub fn submit_decisions(&self, job_id: &str, payload: &DecisionPayload) -> Result<ReviewPayload> {
        let job = self.jobs.update(job_id, &mut |job| {
            job.require_reviewable()?;
            job.apply_decisions(payload)
        })?;

        let count: usize = payload.frames.iter().map(|f| f.decisions.len()).sum();
        info!(
            "Job {}: {} decisions recorded, mode {}",
            job_id, count, job.redaction_mode
        );
        Ok(ReviewPayload::from_job(&job, self.name_detection_available()))
    }

    /// Re-runs detection with a new optional category set against the cached
    /// text regions. Synchronous; a match that reappears gets its earlier
    /// decision back.
    pub fn redetect(&self, job_id: &str, enabled_optional: &BTreeSet<String>) -> Result<ReviewPayload> {
        let job = self.jobs.get(job_id)?;
        job.require_reviewable()?;

        let mut ctx = self.pipeline.context_for(job);
        self.pipeline.redetect(&mut ctx, enabled_optional)?;
        let updated = ctx.job;

        let job = self.jobs.update(job_id, &mut |stored| {
            stored.require_reviewable()?;
            stored.enabled_optional = updated.enabled_optional.clone();
            stored.unavailable_categories = updated.unavailable_categories.clone();
            stored.previews = updated.previews.clone();
            stored.warnings = updated.warnings.clone();
            stored.replace_matches(updated.matches.clone());
            Ok(())
        })?;

        debug!(
            "Job {} re-detected with {:?}: {} matches",
            job_id,
            enabled_optional,
            job.match_count()
        );
        Ok(ReviewPayload::from_job(&job, self.name_detection_available()))
    }

    /// Queues final redaction and document assembly.
    pub fn generate(&self, job_id: &str) -> Result<()> {
        self.jobs.update(job_id, &mut |job| {
            job.require_reviewable()?;
            job.phase = JobPhase::Queued;
            Ok(())
        })?;
        self.dispatch(WorkItem::generate(job_id))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    pub fn name_detection_available(&self) -> bool {
        self.pipeline.detector().name_detection_available()
    }

    /// Blocks until no queued or running work remains for the job, then
    /// returns its status.
    pub fn wait_for(&self, job_id: &str) -> Result<StatusView> {
        // Fail fast on unknown ids
        self.jobs.get(job_id)?;
        self.tracker.wait_idle(job_id);
        self.status(job_id)
    }

    pub fn shutdown(self) {
        self.pool.shutdown();
        self.pool.wait();
        if self.collector.join().is_err() {
            error!("Result collector panicked");
        }
    }

    fn dispatch(&self, item: WorkItem) -> Result<()> {
        self.tracker.begin(&item.job_id);

        if let Err(e) = self.pool.submit(item.clone()) {
            self.tracker.settle(&item.job_id);
            let cause = e.to_string();
            // Otherwise the job would look busy forever
            let restored = self.jobs.update(&item.job_id, &mut |job| {
                match item.kind {
                    WorkKind::Process => {
                        job.fail(cause.as_str());
                    }
                    WorkKind::Generate => job.phase = JobPhase::AwaitingReview,
                }
                Ok(())
            });
            if let Err(update_err) = restored {
                warn!("Could not restore job {}: {}", item.job_id, update_err);
            }
            return Err(e.into());
        }
        Ok(())
    }
}

/// Counts queued or running work per job.
#[derive(Default)]
struct WorkTracker {
    outstanding: Mutex<HashMap<String, usize>>,
    settled: Condvar,
}

impl WorkTracker {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        match self.outstanding.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Work tracker lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn begin(&self, job_id: &str) {
        *self.lock().entry(job_id.to_string()).or_insert(0) += 1;
    }

    fn settle(&self, job_id: &str) {
        let mut outstanding = self.lock();
        if let Some(count) = outstanding.get_mut(job_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                outstanding.remove(job_id);
            }
        }
        self.settled.notify_all();
    }

    fn wait_idle(&self, job_id: &str) {
        let mut outstanding = self.lock();
        while outstanding.contains_key(job_id) {
            outstanding = match self.settled.wait(outstanding) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

/// Drains worker results so the bounded channel never stalls the workers.
fn spawn_collector(results: Receiver<WorkResult>, tracker: Arc<WorkTracker>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("screendoc-results".to_string())
        .spawn(move || {
            for result in results.iter() {
                match &result.error {
                    Some(e) => warn!("Job {} {} failed: {}", result.job_id, result.kind, e),
                    None => info!(
                        "Job {} {} finished ({} warnings)",
                        result.job_id, result.kind, result.warnings
                    ),
                }
                tracker.settle(&result.job_id);
            }
            debug!("Result collector stopped");
        })
        .map_err(|e| WorkerError::SpawnFailed(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_counts_per_job() {
        let tracker = WorkTracker::default();
        tracker.begin("a");
        tracker.begin("a");
        tracker.begin("b");

        tracker.settle("a");
        assert!(tracker.lock().contains_key("a"));
        tracker.settle("a");
        assert!(!tracker.lock().contains_key("a"));

        // settling an unknown job is harmless
        tracker.settle("zzz");
        tracker.wait_idle("a");
        assert_eq!(tracker.lock().get("b"), Some(&1));
    }

    #[test]
    fn test_wait_idle_wakes_on_settle() {
        let tracker = Arc::new(WorkTracker::default());
        tracker.begin("job");

        let waiter = {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || tracker.wait_idle("job"))
        };
        thread::sleep(std::time::Duration::from_millis(20));
        tracker.settle("job");

        waiter.join().unwrap();
    }
}
