pub mod broadcast;
pub mod config;
pub mod document;
pub mod error;
pub mod extraction;
pub mod frames;
pub mod job;
pub mod pii;
pub mod pipeline;
pub mod redaction;
pub mod sanitize;
pub mod service;
pub mod storage;
pub mod worker;

pub use broadcast::{JobEvent, JobEventBroadcaster};
pub use config::{load_config, load_config_from_str, Config};
pub use document::{DocumentRenderer, FileNarrative, NarrativeGenerator, OutlineNarrative, PdfRenderer};
pub use error::{
    ConfigError, JobError, ProcessError, RedactionError, Result, ScreendocError, StorageError,
    WorkerError,
};
pub use extraction::{BoundingBox, TextRegion, TextRegionExtractor};
pub use frames::{FrameSelector, FrameSource};
pub use job::{
    DecisionPayload, Job, JobPhase, JobStatus, ReviewMode, ReviewPayload, StatusView,
};
pub use pii::{PiiDetector, PiiMatch};
pub use pipeline::{Collaborators, Pipeline, PipelineConfig, PipelineContext};
pub use redaction::{RedactionEngine, RedactionMode};
pub use service::JobService;
