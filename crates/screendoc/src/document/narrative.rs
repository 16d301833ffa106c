use std::path::{Path, PathBuf};

use crate::error::ProcessError;

/// Input handed to a narrative generator.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeRequest<'a> {
    pub title: &'a str,
    /// Evenly sampled frames covering the whole recording.
    pub context_frames: &'a [PathBuf],
    /// Redacted key frames; `[FRAME: n]` refers to `key_frames[n - 1]`.
    pub key_frames: &'a [PathBuf],
}

/// Turns frames into step-by-step text that may carry `[FRAME: n]` tags.
pub trait NarrativeGenerator: Send + Sync {
    fn generate(&self, request: &NarrativeRequest<'_>) -> Result<String, ProcessError>;

    fn name(&self) -> &str;
}

/// Narrative written ahead of time, read from a file.
pub struct FileNarrative {
    path: PathBuf,
}

impl FileNarrative {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NarrativeGenerator for FileNarrative {
    fn generate(&self, _request: &NarrativeRequest<'_>) -> Result<String, ProcessError> {
        std::fs::read_to_string(&self.path).map_err(|e| ProcessError::ReadFile {
            path: self.path.clone(),
            source: e,
        })
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Offline generator: one step per key frame, each tagged with its frame.
pub struct OutlineNarrative;

impl NarrativeGenerator for OutlineNarrative {
    fn generate(&self, request: &NarrativeRequest<'_>) -> Result<String, ProcessError> {
        let mut out = format!("# {}\n\n## Overview\n\n", request.title);

        if request.key_frames.is_empty() {
            out.push_str(&format!(
                "This guide summarises a recording sampled into {} frames. \
                 No screenshots are embedded.\n",
                request.context_frames.len()
            ));
            return Ok(out);
        }

        out.push_str(&format!(
            "This guide walks through {} steps captured from a recording of {} sampled frames.\n\n",
            request.key_frames.len(),
            request.context_frames.len()
        ));
        out.push_str("## Steps\n\n");

        for (i, frame) in request.key_frames.iter().enumerate() {
            let n = i + 1;
            out.push_str(&format!("### Step {}\n\n", n));
            out.push_str(&format!("**Screen:** {}\n\n", crate::sanitize::redact_path(frame)));
            out.push_str("- Compare your screen with the capture below.\n");
            out.push_str(&format!("[FRAME: {}]\n\n", n));
        }

        Ok(out)
    }

    fn name(&self) -> &str {
        "outline"
    }
}
