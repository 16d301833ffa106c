//! Stand-in used when the crate is built without the `tesseract` feature.
//!
//! Every extraction reports OCR as unavailable; the pipeline treats that
//! like any other per-frame OCR failure and continues with no regions.

use std::path::Path;

use crate::error::ProcessError;
use crate::extraction::{TextRegion, TextRegionExtractor};

#[derive(Clone)]
pub struct TesseractExtractor {
    languages: String,
}

impl TesseractExtractor {
    pub fn new(languages: &[String], _accelerated: bool) -> Self {
        let languages = if languages.is_empty() {
            "eng".to_string()
        } else {
            languages.join("+")
        };
        Self { languages }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }
}

impl TextRegionExtractor for TesseractExtractor {
    fn extract(&self, _image_path: &Path) -> Result<Vec<TextRegion>, ProcessError> {
        Err(ProcessError::OcrUnavailable)
    }

    fn name(&self) -> &str {
        "tesseract (unavailable)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_reports_unavailable() {
        let extractor = TesseractExtractor::new(&["eng".to_string()], true);
        let result = extractor.extract(Path::new("frame.png"));
        assert!(matches!(result, Err(ProcessError::OcrUnavailable)));
        assert_eq!(extractor.languages(), "eng");
    }
}
