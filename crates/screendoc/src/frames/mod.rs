pub mod sampling;
pub mod selector;
pub mod source;

pub use sampling::sample_evenly;
pub use selector::{select_by_scores, FrameSelector};
pub use source::{AutoFrameSource, DirectoryFrameSource, FfmpegFrameSource, FrameSource};
