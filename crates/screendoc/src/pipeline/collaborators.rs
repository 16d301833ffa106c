use std::sync::Arc;

use log::info;

use crate::document::{DocumentRenderer, NarrativeGenerator, OutlineNarrative, PdfRenderer};
use crate::error::ConfigError;
use crate::extraction::{build_extractor, TextRegionExtractor};
use crate::frames::{AutoFrameSource, FrameSource};
use crate::pii::{load_recognizer, PiiDetector};

use super::config::PipelineConfig;

/// The pluggable pieces a pipeline drives. Cloning shares them.
#[derive(Clone)]
pub struct Collaborators {
    pub frame_source: Arc<dyn FrameSource>,
    pub extractor: Arc<dyn TextRegionExtractor>,
    pub detector: Arc<PiiDetector>,
    pub narrative: Arc<dyn NarrativeGenerator>,
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl Collaborators {
    /// Production wiring: ffmpeg or frame directories, Tesseract when built
    /// in, the configured detector, an offline outline narrative and PDF output.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let names = load_recognizer(config.name_lexicon.as_deref());
        let detector = PiiDetector::new(&config.custom_patterns, names)?;
        let extractor = build_extractor(&config.ocr);
        let frame_source: Arc<dyn FrameSource> =
            Arc::new(AutoFrameSource::new(config.frame_interval_seconds));

        info!(
            "Collaborators: frames={}, ocr={}, name detection {}",
            frame_source.name(),
            extractor.name(),
            if detector.name_detection_available() {
                "available"
            } else {
                "unavailable"
            }
        );

        Ok(Self {
            frame_source,
            extractor,
            detector: Arc::new(detector),
            narrative: Arc::new(OutlineNarrative),
            renderer: Arc::new(PdfRenderer),
        })
    }

    pub fn with_narrative(mut self, narrative: Arc<dyn NarrativeGenerator>) -> Self {
        self.narrative = narrative;
        self
    }
}
