pub mod model;
pub mod repository;
pub mod review;
pub mod status;

pub use model::{Job, MatchFingerprint, ReviewMode};
pub use repository::{InMemoryJobRepository, JobRepository};
pub use review::{
    DecisionPayload, FrameDecisions, FrameReview, MatchDecision, PiiEntry, ReviewPayload,
    StatusView,
};
pub use status::{JobPhase, JobStatus};
