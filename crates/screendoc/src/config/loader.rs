use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;
use crate::pii::categories;
use crate::redaction::RedactionMode;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub const ENV_MAX_FRAMES: &str = "SCREENDOC_MAX_FRAMES";
pub const ENV_MAX_EMBED: &str = "SCREENDOC_MAX_EMBED";
pub const ENV_REDACTION_MODE: &str = "SCREENDOC_REDACTION_MODE";
pub const ENV_OCR_ACCELERATED: &str = "SCREENDOC_OCR_ACCELERATED";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = load_config_from_str(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;

    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Applies `SCREENDOC_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_MAX_FRAMES) {
        config.frames.max_context_frames = parse_override(ENV_MAX_FRAMES, &value)?;
    }
    if let Some(value) = lookup(ENV_MAX_EMBED) {
        config.frames.max_embed_frames = parse_override(ENV_MAX_EMBED, &value)?;
    }
    if let Some(value) = lookup(ENV_REDACTION_MODE) {
        config.redaction.default_mode =
            value
                .parse::<RedactionMode>()
                .map_err(|reason| ConfigError::InvalidOverride {
                    key: ENV_REDACTION_MODE.to_string(),
                    value: value.clone(),
                    reason,
                })?;
    }
    if let Some(value) = lookup(ENV_OCR_ACCELERATED) {
        config.ocr.accelerated = match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" | "" => false,
            _ => {
                return Err(ConfigError::InvalidOverride {
                    key: ENV_OCR_ACCELERATED.to_string(),
                    value,
                    reason: "expected a boolean".to_string(),
                })
            }
        };
    }
    Ok(())
}

fn parse_override(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::InvalidOverride {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    let frames = &config.frames;
    if frames.max_embed_frames == 0 {
        return Err(ConfigError::Validation {
            message: "frames.max_embed_frames must be at least 1".to_string(),
        });
    }
    if frames.max_context_frames < frames.max_embed_frames {
        return Err(ConfigError::Validation {
            message: format!(
                "frames.max_context_frames ({}) must not be smaller than frames.max_embed_frames ({})",
                frames.max_context_frames, frames.max_embed_frames
            ),
        });
    }

    if !(config.redaction.blur_sigma > 0.0) {
        return Err(ConfigError::Validation {
            message: "redaction.blur_sigma must be positive".to_string(),
        });
    }
    if config.redaction.pixelate_grid == 0 {
        return Err(ConfigError::Validation {
            message: "redaction.pixelate_grid must be at least 1".to_string(),
        });
    }

    if !(0.0..=1.0).contains(&config.ocr.min_confidence) {
        return Err(ConfigError::Validation {
            message: "ocr.min_confidence must lie in [0, 1]".to_string(),
        });
    }

    let mut custom_names = HashSet::new();
    for custom in &config.detection.custom_patterns {
        if categories::find(&custom.name).is_some() {
            return Err(ConfigError::InvalidPattern {
                name: custom.name.clone(),
                reason: "Name clashes with a built-in category".to_string(),
            });
        }
        if !custom_names.insert(custom.name.as_str()) {
            return Err(ConfigError::InvalidPattern {
                name: custom.name.clone(),
                reason: "Duplicate custom pattern name".to_string(),
            });
        }
        if let Err(e) = regex::Regex::new(&custom.pattern) {
            return Err(ConfigError::InvalidPattern {
                name: custom.name.clone(),
                reason: e.to_string(),
            });
        }
    }

    for name in &config.detection.default_optional {
        let builtin_optional = categories::find(name).is_some_and(|c| !c.always_on);
        let custom_optional = config
            .detection
            .custom_patterns
            .iter()
            .any(|c| &c.name == name && !c.always_on);
        if !builtin_optional && !custom_optional {
            return Err(ConfigError::Validation {
                message: format!("Unknown optional PII category in detection.default_optional: {}", name),
            });
        }
    }

    Ok(())
}
