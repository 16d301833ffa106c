use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info};
use tokio::sync::broadcast;

use crate::broadcast::JobEvent;
use crate::error::WorkerError;
use crate::job::{JobPhase, JobRepository};
use crate::pipeline::progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
use crate::pipeline::{Collaborators, Pipeline, PipelineConfig};
use crate::worker::job::{WorkItem, WorkKind, WorkResult};

pub struct WorkerPool {
    work_sender: Sender<WorkItem>,
    result_receiver: Receiver<WorkResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Starts `worker_count` threads (at least one), each with its own
    /// pipeline over the shared repository and collaborators.
    pub fn new(
        config: Arc<PipelineConfig>,
        jobs: Arc<dyn JobRepository>,
        collaborators: Collaborators,
        worker_count: usize,
        events: Option<Arc<broadcast::Sender<JobEvent>>>,
    ) -> Result<Self, WorkerError> {
        let worker_count = worker_count.max(1);
        // `submit` must never block the caller
        let (work_sender, work_receiver) = unbounded::<WorkItem>();
        let (result_sender, result_receiver) = bounded::<WorkResult>(worker_count * 2);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let work_rx = work_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let pipeline = Pipeline::new(Arc::clone(&config), Arc::clone(&jobs), collaborators.clone());
            let worker_jobs = Arc::clone(&jobs);
            let events = events.clone();

            let handle = thread::Builder::new()
                .name(format!("screendoc-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(
                        worker_id,
                        work_rx,
                        result_tx,
                        shutdown_flag,
                        pipeline,
                        worker_jobs,
                        events,
                    );
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            work_sender,
            result_receiver,
            workers,
            shutdown,
        })
    }

    pub fn submit(&self, item: WorkItem) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.work_sender
            .send(item)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn recv_result(&self) -> Option<WorkResult> {
        self.result_receiver.recv().ok()
    }

    /// Another handle on the result channel, for draining on a separate thread.
    pub fn results(&self) -> Receiver<WorkResult> {
        self.result_receiver.clone()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.work_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    work_receiver: Receiver<WorkItem>,
    result_sender: Sender<WorkResult>,
    shutdown: Arc<AtomicBool>,
    pipeline: Pipeline,
    jobs: Arc<dyn JobRepository>,
    events: Option<Arc<broadcast::Sender<JobEvent>>>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match work_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(item) => {
                debug!("Worker {} running {} for job {}", worker_id, item.kind, item.job_id);

                let result = match &events {
                    Some(sender) => {
                        let progress = BroadcastProgress::new(&item.job_id, Arc::clone(sender));
                        run_item(&pipeline, jobs.as_ref(), &item, &progress)
                    }
                    None => run_item(&pipeline, jobs.as_ref(), &item, &NoopProgress),
                };

                if let Err(e) = result_sender.send(result) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} work channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

fn run_item(
    pipeline: &Pipeline,
    jobs: &dyn JobRepository,
    item: &WorkItem,
    progress: &dyn ProgressReporter,
) -> WorkResult {
    let job = match jobs.get(&item.job_id) {
        Ok(job) => job,
        Err(e) => {
            error!("Cannot run {} for job {}: {}", item.kind, item.job_id, e);
            return WorkResult::failure(item, e.to_string());
        }
    };

    progress.report(ProgressEvent::Phase {
        status: job.status(),
        phase: JobPhase::Queued,
        message: format!("Job picked up for {}", item.kind),
    });

    let ctx = pipeline.context_for(job);
    let (result, _ctx) = match item.kind {
        WorkKind::Process => pipeline.process(ctx, progress),
        WorkKind::Generate => pipeline.generate(ctx, progress),
    };
    result
}
