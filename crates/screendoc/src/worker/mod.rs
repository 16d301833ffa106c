pub mod job;
pub mod pool;

pub use job::{WorkItem, WorkKind, WorkResult};
pub use pool::WorkerPool;

// Re-export crossbeam_channel for callers draining results
pub use crossbeam_channel;
