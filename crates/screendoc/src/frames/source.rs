use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::ProcessError;
use crate::sanitize;

/// Produces the ordered frame images of a recording.
pub trait FrameSource: Send + Sync {
    /// Writes (or locates) frames for `video`, using `dest` as scratch space,
    /// and returns them in temporal order.
    fn extract_frames(&self, video: &Path, dest: &Path) -> Result<Vec<PathBuf>, ProcessError>;

    fn name(&self) -> &str;
}

/// Treats the "video" as a directory of already extracted frames.
///
/// Only top-level files whose MIME type is `image/*` are used; file name
/// order is temporal order.
pub struct DirectoryFrameSource;

impl FrameSource for DirectoryFrameSource {
    fn extract_frames(&self, video: &Path, _dest: &Path) -> Result<Vec<PathBuf>, ProcessError> {
        if !video.is_dir() {
            return Err(ProcessError::FrameExtraction(format!(
                "{} is not a directory of frames",
                sanitize::redact_path(video)
            )));
        }

        let mut frames: Vec<PathBuf> = WalkDir::new(video)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_image(p))
            .collect();

        frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        info!("Found {} frames in {}", frames.len(), sanitize::redact_path(video));
        Ok(frames)
    }

    fn name(&self) -> &str {
        "directory"
    }
}

fn is_image(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.type_() == mime_guess::mime::IMAGE)
        .unwrap_or(false)
}

/// Samples one frame every `interval_seconds` with the `ffmpeg` binary.
pub struct FfmpegFrameSource {
    interval_seconds: u32,
    binary: String,
}

impl FfmpegFrameSource {
    pub fn new(interval_seconds: u32) -> Self {
        Self {
            interval_seconds: interval_seconds.max(1),
            binary: "ffmpeg".to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl FrameSource for FfmpegFrameSource {
    fn extract_frames(&self, video: &Path, dest: &Path) -> Result<Vec<PathBuf>, ProcessError> {
        std::fs::create_dir_all(dest).map_err(|e| {
            ProcessError::FrameExtraction(format!("Failed to create {}: {}", dest.display(), e))
        })?;

        let filter = format!("fps=1/{},scale=1920:-1", self.interval_seconds);
        let pattern = dest.join("frame_%04d.jpg");

        debug!("Running {} with filter {}", self.binary, filter);
        let output = Command::new(&self.binary)
            .arg("-i")
            .arg(video)
            .args(["-vf", &filter, "-q:v", "2", "-y"])
            .arg(&pattern)
            .output()
            .map_err(|e| {
                ProcessError::FrameExtraction(format!(
                    "Failed to run {}: {}. Make sure ffmpeg is installed.",
                    self.binary, e
                ))
            })?;

        if !output.status.success() {
            return Err(ProcessError::FrameExtraction(format!(
                "{} failed: {}",
                self.binary,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut frames: Vec<PathBuf> = std::fs::read_dir(dest)
            .map_err(|e| ProcessError::ReadFile {
                path: dest.to_path_buf(),
                source: e,
            })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("frame_") && n.ends_with(".jpg"))
            })
            .collect();
        frames.sort();

        info!("Extracted {} frames from {}", frames.len(), sanitize::redact_path(video));
        Ok(frames)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Directory inputs are read as pre-extracted frames; anything else goes
/// through ffmpeg.
pub struct AutoFrameSource {
    ffmpeg: FfmpegFrameSource,
}

impl AutoFrameSource {
    pub fn new(interval_seconds: u32) -> Self {
        Self {
            ffmpeg: FfmpegFrameSource::new(interval_seconds),
        }
    }
}

impl FrameSource for AutoFrameSource {
    fn extract_frames(&self, video: &Path, dest: &Path) -> Result<Vec<PathBuf>, ProcessError> {
        if video.is_dir() {
            DirectoryFrameSource.extract_frames(video, dest)
        } else {
            self.ffmpeg.extract_frames(video, dest)
        }
    }

    fn name(&self) -> &str {
        "auto"
    }
}
