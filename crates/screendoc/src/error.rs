use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreendocError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Redaction error: {0}")]
    Redaction(#[from] RedactionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid PII pattern '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Invalid environment override {key}='{value}': {reason}")]
    InvalidOverride {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Frame extraction failed: {0}")]
    FrameExtraction(String),

    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image '{path}': {reason}")]
    ImageDecode { path: PathBuf, reason: String },

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("OCR is not available in this build")]
    OcrUnavailable,

    #[error("Narrative generation failed: {0}")]
    Narrative(String),

    #[error("Document rendering failed: {0}")]
    Rendering(String),
}

#[derive(Error, Debug)]
pub enum RedactionError {
    #[error("Failed to load image '{path}': {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Failed to save image '{path}': {reason}")]
    Save { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: String,
        to: String,
    },

    #[error("Job {job_id} is {status}; operation requires {expected}")]
    WrongStatus {
        job_id: String,
        status: String,
        expected: String,
    },

    #[error("Job {0} already has work in progress")]
    Busy(String),

    #[error("Job {job_id} has no match {match_index} on frame {frame_id}")]
    UnknownMatch {
        job_id: String,
        frame_id: usize,
        match_index: usize,
    },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),
}

pub type Result<T> = std::result::Result<T, ScreendocError>;
