use std::path::{Path, PathBuf};

use crate::error::StorageError;

use super::filesystem::ensure_directory;

/// Scratch layout for one job: `<work>/<job_id>/{frames,previews,redacted}`.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    root: PathBuf,
}

impl JobWorkspace {
    pub fn new<P: AsRef<Path>>(work_directory: P, job_id: &str) -> Self {
        Self {
            root: work_directory.as_ref().join(job_id),
        }
    }

    /// Creates the job root and its frames directory. `previews` and
    /// `redacted` are created by the stages that fill them.
    pub fn create(&self) -> Result<(), StorageError> {
        ensure_directory(&self.frames_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    pub fn previews_dir(&self) -> PathBuf {
        self.root.join("previews")
    }

    pub fn redacted_dir(&self) -> PathBuf {
        self.root.join("redacted")
    }

    /// Previews are always PNG so outlines stay crisp.
    pub fn preview_path(&self, frame_id: usize) -> PathBuf {
        self.previews_dir().join(format!("frame_{:03}_preview.png", frame_id))
    }

    /// Keeps the source frame's extension.
    pub fn redacted_path(&self, frame_id: usize, source: &Path) -> PathBuf {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png")
            .to_lowercase();
        self.redacted_dir().join(format!("frame_{:03}.{}", frame_id, ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_layout() {
        let dir = TempDir::new().unwrap();
        let ws = JobWorkspace::new(dir.path(), "job-1");
        ws.create().unwrap();

        assert!(ws.frames_dir().is_dir());
        assert!(!ws.previews_dir().exists());
        assert!(!ws.redacted_dir().exists());
        assert_eq!(ws.root(), dir.path().join("job-1"));
    }

    #[test]
    fn test_paths() {
        let ws = JobWorkspace::new("/work", "abc");
        assert_eq!(ws.preview_path(2), PathBuf::from("/work/abc/previews/frame_002_preview.png"));
        assert_eq!(
            ws.redacted_path(7, Path::new("/x/frame_0031.JPG")),
            PathBuf::from("/work/abc/redacted/frame_007.jpg")
        );
        assert_eq!(
            ws.redacted_path(0, Path::new("/x/frame")),
            PathBuf::from("/work/abc/redacted/frame_000.png")
        );
    }
}
