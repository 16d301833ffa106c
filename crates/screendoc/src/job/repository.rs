//! Job persistence behind a trait so the service can be tested against the
//! in-memory store and a durable store can slot in later.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::JobError;

use super::model::Job;

pub trait JobRepository: Send + Sync {
    /// Returns a snapshot of the job.
    fn get(&self, job_id: &str) -> Result<Job, JobError>;

    /// Inserts or replaces a job.
    fn put(&self, job: Job);

    /// Runs `mutate` against the stored job under the write lock. The
    /// change is kept only when `mutate` succeeds; returns the new snapshot.
    fn update(
        &self,
        job_id: &str,
        mutate: &mut dyn FnMut(&mut Job) -> Result<(), JobError>,
    ) -> Result<Job, JobError>;

    /// All jobs, newest first.
    fn list(&self) -> Vec<Job>;

    fn remove(&self, job_id: &str) -> Option<Job>;
}

#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job repository lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job repository lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl JobRepository for InMemoryJobRepository {
    fn get(&self, job_id: &str) -> Result<Job, JobError> {
        self.read()
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    fn put(&self, job: Job) {
        self.write().insert(job.id.clone(), job);
    }

    fn update(
        &self,
        job_id: &str,
        mutate: &mut dyn FnMut(&mut Job) -> Result<(), JobError>,
    ) -> Result<Job, JobError> {
        let mut jobs = self.write();
        let stored = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        // Work on a copy so a failed mutation leaves no partial state.
        let mut working = stored.clone();
        mutate(&mut working)?;
        *stored = working.clone();
        Ok(working)
    }

    fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.read().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    fn remove(&self, job_id: &str) -> Option<Job> {
        self.write().remove(job_id)
    }
}
