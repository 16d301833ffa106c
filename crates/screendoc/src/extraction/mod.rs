pub mod region;

#[cfg(feature = "tesseract")]
pub mod tesseract;

#[cfg(not(feature = "tesseract"))]
pub mod tesseract_stub;

use std::path::Path;
use std::sync::Arc;

use crate::config::OcrConfig;
use crate::error::ProcessError;

pub use region::{BoundingBox, PixelRect, TextRegion};

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractExtractor;

#[cfg(not(feature = "tesseract"))]
pub use tesseract_stub::TesseractExtractor;

/// Recognises text spans, with geometry and confidence, in a single image.
pub trait TextRegionExtractor: Send + Sync {
    fn extract(&self, image_path: &Path) -> Result<Vec<TextRegion>, ProcessError>;

    fn name(&self) -> &str;
}

/// Extractor used when OCR is switched off in config: every frame has no text.
pub struct DisabledExtractor;

impl TextRegionExtractor for DisabledExtractor {
    fn extract(&self, _image_path: &Path) -> Result<Vec<TextRegion>, ProcessError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

/// Wraps another extractor and drops regions below a confidence floor.
pub struct ConfidenceFilter {
    inner: Arc<dyn TextRegionExtractor>,
    min_confidence: f32,
}

impl ConfidenceFilter {
    pub fn new(inner: Arc<dyn TextRegionExtractor>, min_confidence: f32) -> Self {
        Self {
            inner,
            min_confidence,
        }
    }
}

impl TextRegionExtractor for ConfidenceFilter {
    fn extract(&self, image_path: &Path) -> Result<Vec<TextRegion>, ProcessError> {
        let regions = self.inner.extract(image_path)?;
        Ok(regions
            .into_iter()
            .filter(|r| r.confidence >= self.min_confidence && !r.text.trim().is_empty())
            .collect())
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Builds the production extractor for the given OCR settings.
pub fn build_extractor(config: &OcrConfig) -> Arc<dyn TextRegionExtractor> {
    if !config.enabled {
        return Arc::new(DisabledExtractor);
    }

    #[cfg(not(feature = "tesseract"))]
    log::warn!("Built without the tesseract feature; no text will be found and nothing is redacted");

    let engine: Arc<dyn TextRegionExtractor> =
        Arc::new(TesseractExtractor::new(&config.languages, config.accelerated));
    if config.min_confidence > 0.0 {
        Arc::new(ConfidenceFilter::new(engine, config.min_confidence))
    } else {
        engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedExtractor(Vec<TextRegion>);

    impl TextRegionExtractor for FixedExtractor {
        fn extract(&self, _image_path: &Path) -> Result<Vec<TextRegion>, ProcessError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_disabled_extractor_returns_nothing() {
        let regions = DisabledExtractor.extract(Path::new("frame.png")).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_confidence_filter_drops_low_and_blank_regions() {
        let bbox = BoundingBox::new(0, 0, 10, 10);
        let inner = Arc::new(FixedExtractor(vec![
            TextRegion::new("keep me", bbox, 0.9),
            TextRegion::new("too faint", bbox, 0.2),
            TextRegion::new("   ", bbox, 0.95),
        ]));

        let filter = ConfidenceFilter::new(inner, 0.5);
        let regions = filter.extract(Path::new("frame.png")).unwrap();

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].text, "keep me");
        assert_eq!(filter.name(), "fixed");
    }

    #[cfg(feature = "tesseract")]
    #[test]
    fn test_default_build_uses_tesseract() {
        let extractor = build_extractor(&OcrConfig::default());
        assert_eq!(extractor.name(), "tesseract");
    }

    #[test]
    fn test_build_extractor_disabled() {
        let config = OcrConfig {
            enabled: false,
            ..OcrConfig::default()
        };
        let extractor = build_extractor(&config);
        assert_eq!(extractor.name(), "disabled");
    }
}
