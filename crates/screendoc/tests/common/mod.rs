//! Shared test utilities for screendoc integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp work/output directories
//! - `ScriptedText`, an extractor that returns canned text per frame file

pub mod harness;

pub use harness::{frame_level, frame_name, ScriptedText, TestHarness};
