use std::path::PathBuf;

use crate::config::{Config, CustomPattern, OcrConfig, RedactionConfig};

pub struct PipelineConfig {
    pub work_directory: PathBuf,
    pub output_directory: PathBuf,
    pub max_context_frames: usize,
    pub max_embed_frames: usize,
    pub frame_interval_seconds: u32,
    pub redaction: RedactionConfig,
    pub default_optional: Vec<String>,
    pub name_lexicon: Option<String>,
    pub custom_patterns: Vec<CustomPattern>,
    pub ocr: OcrConfig,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            work_directory: PathBuf::from(&config.work_directory),
            output_directory: PathBuf::from(&config.output_directory),
            max_context_frames: config.frames.max_context_frames,
            max_embed_frames: config.frames.max_embed_frames,
            frame_interval_seconds: config.frames.interval_seconds,
            redaction: config.redaction.clone(),
            default_optional: config.detection.default_optional.clone(),
            name_lexicon: config.detection.name_lexicon.clone(),
            custom_patterns: config.detection.custom_patterns.clone(),
            ocr: config.ocr.clone(),
        }
    }
}
