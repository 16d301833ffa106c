use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use crate::error::ProcessError;
use crate::extraction::{BoundingBox, TextRegion, TextRegionExtractor};

/// Line-level text regions from Tesseract via `leptess`.
#[derive(Clone)]
pub struct TesseractExtractor {
    inner: Arc<TesseractInner>,
}

struct TesseractInner {
    languages: String,
    accelerated: bool,
}

impl TesseractExtractor {
    pub fn new(languages: &[String], accelerated: bool) -> Self {
        let lang_str = if languages.is_empty() {
            "eng".to_string()
        } else {
            languages.join("+")
        };

        Self {
            inner: Arc::new(TesseractInner {
                languages: lang_str,
                accelerated,
            }),
        }
    }

    pub fn languages(&self) -> &str {
        &self.inner.languages
    }

    fn extract_bytes(&self, image_data: &[u8]) -> Result<Vec<TextRegion>, ProcessError> {
        let _span = tracing::info_span!("extraction.tesseract").entered();

        if self.inner.accelerated {
            log::debug!("Tesseract has no accelerated backend, running on CPU");
        }

        let img = image::load_from_memory(image_data)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to load image: {}", e)))?;

        // leptonica reads PNG reliably regardless of the source encoding
        let mut png_data = Vec::new();
        img.write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to convert image: {}", e)))?;

        let mut lt = leptess::LepTess::new(None, &self.inner.languages).map_err(|e| {
            ProcessError::OcrFailed(format!("Failed to initialize Tesseract: {}", e))
        })?;

        lt.set_image_from_mem(&png_data)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to set image for OCR: {}", e)))?;

        let Some(boxes) =
            lt.get_component_boxes(leptess::capi::TessPageIteratorLevel_RIL_TEXTLINE, true)
        else {
            return Ok(Vec::new());
        };

        let mut regions = Vec::new();
        for b in &boxes {
            lt.set_rectangle(&b);
            let text = lt
                .get_utf8_text()
                .map_err(|e| ProcessError::OcrFailed(format!("OCR failed: {}", e)))?;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            let geometry = b.get_geometry();
            let confidence = lt.mean_text_conf() as f32 / 100.0;
            regions.push(TextRegion::new(
                text,
                BoundingBox::from_origin_size(geometry.x, geometry.y, geometry.w, geometry.h),
                confidence,
            ));
        }

        Ok(regions)
    }
}

impl TextRegionExtractor for TesseractExtractor {
    fn extract(&self, image_path: &Path) -> Result<Vec<TextRegion>, ProcessError> {
        let data = std::fs::read(image_path).map_err(|e| ProcessError::ReadFile {
            path: image_path.to_path_buf(),
            source: e,
        })?;
        self.extract_bytes(&data)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_languages_joined() {
        let extractor = TesseractExtractor::new(&["eng".to_string(), "deu".to_string()], false);
        assert_eq!(extractor.languages(), "eng+deu");
    }

    #[test]
    fn test_default_language() {
        let extractor = TesseractExtractor::new(&[], false);
        assert_eq!(extractor.languages(), "eng");
    }

    #[test]
    fn test_invalid_image_data_error() {
        let extractor = TesseractExtractor::new(&[], false);
        match extractor.extract_bytes(b"not an image") {
            Err(ProcessError::OcrFailed(msg)) => assert!(msg.contains("Failed to load image")),
            other => panic!("Expected OcrFailed, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_nonexistent_file_error() {
        let extractor = TesseractExtractor::new(&[], false);
        let result = extractor.extract(Path::new("/nonexistent/frame.png"));
        assert!(matches!(result, Err(ProcessError::ReadFile { .. })));
    }
}
