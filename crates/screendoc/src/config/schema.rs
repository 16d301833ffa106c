use serde::{Deserialize, Serialize};

use crate::pii::ConfidenceTier;
use crate::redaction::RedactionMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub work_directory: String,
    pub output_directory: String,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default)]
    pub frames: FramesConfig,
    #[serde(default)]
    pub redaction: RedactionConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramesConfig {
    /// Frames handed to the narrative generator for context.
    #[serde(default = "default_max_context_frames")]
    pub max_context_frames: usize,
    /// Upper bound on key frames embedded in the document.
    #[serde(default = "default_max_embed_frames")]
    pub max_embed_frames: usize,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u32,
}

fn default_max_context_frames() -> usize {
    50
}

fn default_max_embed_frames() -> usize {
    10
}

fn default_interval_seconds() -> u32 {
    2
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            max_context_frames: default_max_context_frames(),
            max_embed_frames: default_max_embed_frames(),
            interval_seconds: default_interval_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    #[serde(default)]
    pub default_mode: RedactionMode,
    #[serde(default = "default_padding")]
    pub padding: u32,
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,
    #[serde(default = "default_pixelate_grid")]
    pub pixelate_grid: u32,
}

fn default_padding() -> u32 {
    5
}

fn default_blur_sigma() -> f32 {
    15.0
}

fn default_pixelate_grid() -> u32 {
    8
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            default_mode: RedactionMode::default(),
            padding: default_padding(),
            blur_sigma: default_blur_sigma(),
            pixelate_grid: default_pixelate_grid(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Optional categories enabled when a job starts.
    #[serde(default)]
    pub default_optional: Vec<String>,
    /// Given-name lexicon backing `person_name` detection.
    #[serde(default)]
    pub name_lexicon: Option<String>,
    #[serde(default)]
    pub custom_patterns: Vec<CustomPattern>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPattern {
    pub name: String,
    pub pattern: String,
    #[serde(default = "default_custom_tier")]
    pub tier: ConfidenceTier,
    #[serde(default)]
    pub always_on: bool,
}

fn default_custom_tier() -> ConfidenceTier {
    ConfidenceTier::Medium
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default)]
    pub accelerated: bool,
    #[serde(default)]
    pub min_confidence: f32,
}

fn default_true() -> bool {
    true
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            languages: default_languages(),
            accelerated: false,
            min_confidence: 0.0,
        }
    }
}
