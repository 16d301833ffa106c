use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use log::debug;

use crate::config::RedactionConfig;
use crate::error::RedactionError;
use crate::extraction::{BoundingBox, PixelRect};
use crate::pii::PiiMatch;

use super::glyphs::{self, GLYPH_HEIGHT};
use super::mode::RedactionMode;

const OUTLINE: Rgba<u8> = Rgba([255, 0, 0, 255]);
const LABEL_TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);
const OUTLINE_WIDTH: u32 = 3;
const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy)]
pub struct RedactionEngine {
    padding: u32,
    blur_sigma: f32,
    pixelate_grid: u32,
}

impl Default for RedactionEngine {
    fn default() -> Self {
        Self::from_config(&RedactionConfig::default())
    }
}

impl RedactionEngine {
    pub fn new(padding: u32, blur_sigma: f32, pixelate_grid: u32) -> Self {
        Self {
            padding,
            blur_sigma: blur_sigma.max(0.1),
            pixelate_grid: pixelate_grid.max(1),
        }
    }

    pub fn from_config(config: &RedactionConfig) -> Self {
        Self::new(config.padding, config.blur_sigma, config.pixelate_grid)
    }

    /// The padded, clamped rectangle that would be redacted for `bbox`.
    pub fn region_for(&self, bbox: &BoundingBox, width: u32, height: u32) -> Option<PixelRect> {
        bbox.padded_within(self.padding, width, height)
    }

    /// Redacts every match whose decision is `true`. Returns how many regions
    /// were changed; boxes entirely outside the image are skipped.
    pub fn apply(&self, image: &mut RgbaImage, decisions: &[(&PiiMatch, bool)], mode: RedactionMode) -> usize {
        let (width, height) = image.dimensions();
        let mut redacted = 0;

        for (m, redact) in decisions {
            if !redact {
                continue;
            }
            let Some(rect) = self.region_for(&m.bbox, width, height) else {
                debug!("Skipping {} match outside image bounds", m.pii_type);
                continue;
            };

            match mode {
                RedactionMode::Blur => self.blur(image, rect),
                RedactionMode::Black => fill(image, rect),
                RedactionMode::Pixelate => self.pixelate(image, rect),
            }
            redacted += 1;
        }

        redacted
    }

    /// Returns a copy of `image` with each match outlined and labelled by
    /// type. Pixels under the outlines are the only ones changed.
    pub fn annotate(&self, image: &RgbaImage, matches: &[PiiMatch]) -> RgbaImage {
        let mut annotated = image.clone();
        let (width, height) = image.dimensions();

        for m in matches {
            let Some(rect) = self.region_for(&m.bbox, width, height) else {
                continue;
            };
            outline(&mut annotated, rect);
            label(&mut annotated, rect, &m.pii_type);
        }

        annotated
    }

    fn blur(&self, image: &mut RgbaImage, rect: PixelRect) {
        let region = imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image();
        let blurred = imageproc::filter::gaussian_blur_f32(&region, self.blur_sigma);
        imageops::replace(image, &blurred, i64::from(rect.x), i64::from(rect.y));
    }

    fn pixelate(&self, image: &mut RgbaImage, rect: PixelRect) {
        let region = imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image();
        let tiles_x = self.pixelate_grid.min(rect.width);
        let tiles_y = self.pixelate_grid.min(rect.height);

        let small = imageops::resize(&region, tiles_x, tiles_y, FilterType::Triangle);
        let blocky = imageops::resize(&small, rect.width, rect.height, FilterType::Nearest);
        imageops::replace(image, &blocky, i64::from(rect.x), i64::from(rect.y));
    }

    /// Loads `source`, applies the accepted decisions and writes the result
    /// to `dest`.
    pub fn redact_file(
        &self,
        source: &Path,
        dest: &Path,
        decisions: &[(&PiiMatch, bool)],
        mode: RedactionMode,
    ) -> Result<usize, RedactionError> {
        let mut image = load_image(source)?;
        let count = self.apply(&mut image, decisions, mode);
        save_image(&image, dest)?;
        Ok(count)
    }

    pub fn preview_file(&self, source: &Path, dest: &Path, matches: &[PiiMatch]) -> Result<(), RedactionError> {
        let image = load_image(source)?;
        save_image(&self.annotate(&image, matches), dest)
    }
}

fn fill(image: &mut RgbaImage, rect: PixelRect) {
    draw_filled_rect_mut(image, to_rect(rect), FILL);
}

fn outline(image: &mut RgbaImage, rect: PixelRect) {
    for inset in 0..OUTLINE_WIDTH {
        if rect.width <= inset * 2 || rect.height <= inset * 2 {
            break;
        }
        let r = Rect::at((rect.x + inset) as i32, (rect.y + inset) as i32)
            .of_size(rect.width - inset * 2, rect.height - inset * 2);
        draw_hollow_rect_mut(image, r, OUTLINE);
    }
}

/// Type label on a red plate above the box, or inside its top edge when there
/// is no room above.
fn label(image: &mut RgbaImage, rect: PixelRect, text: &str) {
    let plate_height = GLYPH_HEIGHT + 4;
    let plate_width = glyphs::text_width(text) + 4;
    let top = if rect.y >= plate_height {
        rect.y - plate_height
    } else {
        rect.y
    };

    draw_filled_rect_mut(
        image,
        Rect::at(rect.x as i32, top as i32).of_size(plate_width, plate_height),
        OUTLINE,
    );
    glyphs::draw_text(image, i64::from(rect.x) + 2, i64::from(top) + 2, text, LABEL_TEXT);
}

fn to_rect(rect: PixelRect) -> Rect {
    Rect::at(rect.x as i32, rect.y as i32).of_size(rect.width, rect.height)
}

pub fn load_image(path: &Path) -> Result<RgbaImage, RedactionError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| RedactionError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Writes `image` in the format implied by the extension of `path`. JPEG
/// output drops alpha.
pub fn save_image(image: &RgbaImage, path: &Path) -> Result<(), RedactionError> {
    let save_err = |reason: String| RedactionError::Save {
        path: path.to_path_buf(),
        reason,
    };

    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false);

    if is_jpeg {
        let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        let file = File::create(path).map_err(|e| save_err(e.to_string()))?;
        let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
        rgb.write_with_encoder(encoder)
            .map_err(|e| save_err(e.to_string()))
    } else {
        image.save(path).map_err(|e| save_err(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pii::ConfidenceTier;

    fn pii(bbox: BoundingBox) -> PiiMatch {
        PiiMatch {
            region_index: 0,
            bbox,
            pii_type: "email".to_string(),
            confidence: ConfidenceTier::High,
            matched_text: "a@b.com".to_string(),
        }
    }

    /// Horizontal gradient so blur and pixelate visibly change pixels.
    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 7 + y * 3) % 256) as u8;
            Rgba([v, 255 - v, (x % 2 * 255) as u8, 255])
        })
    }

    fn changed_pixels(a: &RgbaImage, b: &RgbaImage) -> Vec<(u32, u32)> {
        a.enumerate_pixels()
            .filter(|(x, y, p)| b.get_pixel(*x, *y) != *p)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn test_black_fills_padded_region() {
        let engine = RedactionEngine::new(5, 15.0, 8);
        let mut image = gradient(100, 80);
        let m = pii(BoundingBox::new(20, 20, 40, 30));

        assert_eq!(engine.apply(&mut image, &[(&m, true)], RedactionMode::Black), 1);

        for y in 15..35 {
            for x in 15..45 {
                assert_eq!(*image.get_pixel(x, y), FILL);
            }
        }
        assert_ne!(*image.get_pixel(14, 15), FILL);
        assert_ne!(*image.get_pixel(45, 34), FILL);
    }

    #[test]
    fn test_rejected_decisions_left_alone() {
        let engine = RedactionEngine::default();
        let original = gradient(60, 60);
        let mut image = original.clone();
        let m = pii(BoundingBox::new(10, 10, 30, 20));

        assert_eq!(engine.apply(&mut image, &[(&m, false)], RedactionMode::Black), 0);
        assert_eq!(image, original);
    }

    #[test]
    fn test_overflowing_box_stays_within_image() {
        let engine = RedactionEngine::new(5, 15.0, 8);
        let original = gradient(50, 40);
        let bbox = BoundingBox::new(-20, 30, 70, 60);

        let rect = engine.region_for(&bbox, 50, 40).unwrap();
        assert!(rect.right() <= 50 && rect.bottom() <= 40);

        for mode in RedactionMode::ALL {
            let mut image = original.clone();
            engine.apply(&mut image, &[(&pii(bbox), true)], mode);
            assert_eq!(image.dimensions(), (50, 40));
            for (x, y) in changed_pixels(&original, &image) {
                assert!(y >= 25, "{} touched row {}", mode, y);
                assert!(x < 50);
            }
        }
    }

    #[test]
    fn test_box_outside_image_skipped() {
        let engine = RedactionEngine::default();
        let mut image = gradient(30, 30);
        let m = pii(BoundingBox::new(100, 100, 120, 110));
        assert_eq!(engine.apply(&mut image, &[(&m, true)], RedactionMode::Blur), 0);
    }

    #[test]
    fn test_blur_changes_only_region() {
        let engine = RedactionEngine::new(0, 4.0, 8);
        let original = gradient(64, 64);
        let mut image = original.clone();
        let m = pii(BoundingBox::new(16, 16, 48, 48));

        engine.apply(&mut image, &[(&m, true)], RedactionMode::Blur);

        let changed = changed_pixels(&original, &image);
        assert!(!changed.is_empty());
        assert!(changed
            .iter()
            .all(|&(x, y)| (16..48).contains(&x) && (16..48).contains(&y)));
    }

    #[test]
    fn test_pixelate_produces_uniform_tiles() {
        let engine = RedactionEngine::new(0, 15.0, 4);
        let mut image = gradient(64, 64);
        let m = pii(BoundingBox::new(0, 0, 32, 32));

        engine.apply(&mut image, &[(&m, true)], RedactionMode::Pixelate);

        // 32px region on a 4x4 grid gives 8px tiles
        let tile = *image.get_pixel(0, 0);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(*image.get_pixel(x, y), tile);
            }
        }
    }

    #[test]
    fn test_overlapping_boxes_compound() {
        let engine = RedactionEngine::new(2, 3.0, 4);
        let mut image = gradient(80, 80);
        let a = pii(BoundingBox::new(10, 10, 50, 50));
        let b = pii(BoundingBox::new(30, 30, 70, 70));

        let count = engine.apply(&mut image, &[(&a, true), (&b, true)], RedactionMode::Pixelate);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_annotate_does_not_mutate_source() {
        let engine = RedactionEngine::new(0, 15.0, 8);
        let original = gradient(100, 100);
        let m = pii(BoundingBox::new(30, 40, 70, 60));

        let annotated = engine.annotate(&original, &[m]);

        assert_eq!(original, gradient(100, 100));
        assert_eq!(*annotated.get_pixel(30, 50), OUTLINE);
        assert_eq!(*annotated.get_pixel(32, 50), OUTLINE);
        // interior keeps its content
        assert_eq!(annotated.get_pixel(50, 50), original.get_pixel(50, 50));
    }

    #[test]
    fn test_annotate_label_fits_near_top_edge() {
        let engine = RedactionEngine::new(0, 15.0, 8);
        let original = gradient(100, 100);
        let m = pii(BoundingBox::new(0, 0, 40, 20));
        let annotated = engine.annotate(&original, &[m]);
        assert_eq!(annotated.dimensions(), (100, 100));
    }

    #[test]
    fn test_redact_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("frame.png");
        let dest = dir.path().join("frame_redacted.jpg");
        gradient(40, 40).save(&source).unwrap();

        let engine = RedactionEngine::default();
        let m = pii(BoundingBox::new(5, 5, 20, 20));
        let count = engine
            .redact_file(&source, &dest, &[(&m, true)], RedactionMode::Black)
            .unwrap();

        assert_eq!(count, 1);
        let written = image::open(&dest).unwrap();
        assert_eq!((written.width(), written.height()), (40, 40));
    }

    #[test]
    fn test_load_missing_image() {
        let result = load_image(Path::new("/nonexistent/frame.png"));
        assert!(matches!(result, Err(RedactionError::Load { .. })));
    }
}
