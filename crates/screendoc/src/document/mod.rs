pub mod narrative;
pub mod pdf;
pub mod references;

use crate::error::ProcessError;

pub use narrative::{FileNarrative, NarrativeGenerator, NarrativeRequest, OutlineNarrative};
pub use pdf::PdfRenderer;
pub use references::{resolve, strip_tags, EmbedInstruction, FrameMapping, ReferenceWarning, Resolution};

/// Everything a renderer needs to lay out the final document.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub title: &'a str,
    pub narrative: &'a str,
    pub resolution: &'a Resolution,
}

/// Produces the bytes of the final artifact.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, request: &RenderRequest<'_>) -> Result<Vec<u8>, ProcessError>;

    /// File extension of the produced artifact, without the dot.
    fn extension(&self) -> &str;
}
