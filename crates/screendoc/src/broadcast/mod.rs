//! Broadcasting of job events to live subscribers.

pub mod job_events;

pub use job_events::{JobEvent, JobEventBroadcaster};
