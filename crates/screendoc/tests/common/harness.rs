//! Test harness for driving jobs through `JobService`.
//!
//! Recordings are directories of synthetic grey PNG frames, so no ffmpeg or
//! Tesseract is needed. Text is injected per frame file name.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

use screendoc::config::{OcrConfig, RedactionConfig};
use screendoc::document::{OutlineNarrative, PdfRenderer};
use screendoc::extraction::{BoundingBox, TextRegion, TextRegionExtractor};
use screendoc::frames::DirectoryFrameSource;
use screendoc::job::InMemoryJobRepository;
use screendoc::pii::PiiDetector;
use screendoc::{Collaborators, JobService, PipelineConfig, ProcessError};

pub const FRAME_WIDTH: u32 = 160;
pub const FRAME_HEIGHT: u32 = 90;

/// Canned OCR output keyed by frame file name.
#[derive(Default, Clone)]
pub struct ScriptedText {
    text: HashMap<String, Vec<TextRegion>>,
}

impl ScriptedText {
    /// Places `text` at a fixed box near the top-left of the frame.
    pub fn on(self, frame: usize, text: &str) -> Self {
        self.at(frame, text, BoundingBox::new(10, 10, 90, 24))
    }

    pub fn at(mut self, frame: usize, text: &str, bbox: BoundingBox) -> Self {
        self.text
            .entry(frame_name(frame))
            .or_default()
            .push(TextRegion::new(text, bbox, 0.95));
        self
    }
}

impl TextRegionExtractor for ScriptedText {
    fn extract(&self, image_path: &Path) -> Result<Vec<TextRegion>, ProcessError> {
        let name = image_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Ok(self.text.get(name).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// 1-based frame file name, matching ffmpeg's numbering.
pub fn frame_name(frame: usize) -> String {
    format!("frame_{:04}.png", frame)
}

/// Grey level of the n-th (1-based) synthetic frame.
pub fn frame_level(frame: usize) -> u8 {
    (((frame - 1) * 40) % 256) as u8
}

/// Isolated environment: a recording directory plus work and output roots.
pub struct TestHarness {
    temp_dir: TempDir,
    pub recording: PathBuf,
    pub config: Arc<PipelineConfig>,
    pub jobs: Arc<InMemoryJobRepository>,
}

impl TestHarness {
    /// Creates a recording of `frame_count` flat grey frames.
    pub fn new(frame_count: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let recording = temp_dir.path().join("billing_walkthrough");
        std::fs::create_dir_all(&recording).expect("Failed to create recording dir");

        for frame in 1..=frame_count {
            let level = frame_level(frame);
            RgbaImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgba([level, level, level, 255]))
                .save(recording.join(frame_name(frame)))
                .expect("Failed to write frame");
        }

        let config = Arc::new(PipelineConfig {
            work_directory: temp_dir.path().join("work"),
            output_directory: temp_dir.path().join("output"),
            max_context_frames: 20,
            max_embed_frames: 5,
            frame_interval_seconds: 2,
            redaction: RedactionConfig::default(),
            default_optional: vec![],
            name_lexicon: None,
            custom_patterns: vec![],
            ocr: OcrConfig::default(),
        });

        Self {
            temp_dir,
            recording,
            config,
            jobs: Arc::new(InMemoryJobRepository::new()),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A recording directory that holds no frames at all.
    pub fn empty_recording(&self) -> PathBuf {
        let path = self.temp_dir.path().join("empty_capture");
        std::fs::create_dir_all(&path).expect("Failed to create empty recording");
        path
    }

    /// Starts a two-worker service sharing the harness repository.
    pub fn service(&self, text: ScriptedText) -> JobService {
        let collaborators = Collaborators {
            frame_source: Arc::new(DirectoryFrameSource),
            extractor: Arc::new(text),
            detector: Arc::new(PiiDetector::builtin().expect("Built-in patterns compile")),
            narrative: Arc::new(OutlineNarrative),
            renderer: Arc::new(PdfRenderer),
        };
        JobService::with_repository(Arc::clone(&self.config), collaborators, self.jobs.clone(), 2)
            .expect("Failed to start service")
    }
}
