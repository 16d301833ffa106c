use serde::{Deserialize, Serialize};

/// Axis-aligned box in source-image pixel space, `x2`/`y2` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Builds a box from a top-left corner and a size.
    pub fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Grows the box by `padding` on every side, then clamps it to an image of
    /// `width` x `height`. Returns `None` when nothing of the box remains inside
    /// the image.
    pub fn padded_within(&self, padding: u32, width: u32, height: u32) -> Option<PixelRect> {
        let pad = i64::from(padding);
        let x1 = (i64::from(self.x1) - pad).max(0);
        let y1 = (i64::from(self.y1) - pad).max(0);
        let x2 = (i64::from(self.x2) + pad).min(i64::from(width));
        let y2 = (i64::from(self.y2) + pad).min(i64::from(height));

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(PixelRect {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}

/// A rectangle already known to lie inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// A span of recognised text on one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub text: String,
    pub bbox: BoundingBox,
    /// Recogniser confidence in `[0, 1]`.
    pub confidence: f32,
}

impl TextRegion {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
