use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::GrayImage;
use log::{debug, warn};
use rayon::prelude::*;

/// Size of the grayscale thumbnail compared between neighbouring frames.
pub const DIFF_WIDTH: u32 = 320;
pub const DIFF_HEIGHT: u32 = 180;

/// Chooses the frames worth embedding from an ordered capture.
pub struct FrameSelector;

impl FrameSelector {
    /// Returns at most `max_embed` frames in temporal order.
    ///
    /// With more frames than `max_embed`, the first and last frames are always
    /// kept and the remaining slots go to the frames that differ most from
    /// their predecessor.
    pub fn select(frames: &[PathBuf], max_embed: usize) -> Vec<PathBuf> {
        Self::select_indices(frames, max_embed)
            .into_iter()
            .map(|i| frames[i].clone())
            .collect()
    }

    pub fn select_indices(frames: &[PathBuf], max_embed: usize) -> Vec<usize> {
        if frames.len() <= max_embed {
            return (0..frames.len()).collect();
        }

        let _span = tracing::info_span!("frames.select", total = frames.len(), max_embed).entered();
        let scores = Self::difference_scores(frames);
        let selected = select_by_scores(&scores, max_embed);
        debug!("Selected frames {:?} of {}", selected, frames.len());
        selected
    }

    /// Mean absolute difference of each frame against the last frame that
    /// decoded. The first frame and frames that fail to decode score zero.
    pub fn difference_scores(frames: &[PathBuf]) -> Vec<f64> {
        let thumbnails: Vec<Option<GrayImage>> = frames.par_iter().map(|p| thumbnail(p)).collect();

        let mut scores = Vec::with_capacity(frames.len());
        let mut previous: Option<&GrayImage> = None;

        for current in &thumbnails {
            let score = match (previous, current) {
                (Some(prev), Some(cur)) => mean_abs_diff(prev, cur),
                _ => 0.0,
            };
            scores.push(score);
            if let Some(cur) = current {
                previous = Some(cur);
            }
        }

        scores
    }
}

/// Index selection over precomputed scores; `scores[i]` belongs to frame `i`.
pub fn select_by_scores(scores: &[f64], max_embed: usize) -> Vec<usize> {
    let n = scores.len();
    if n <= max_embed {
        return (0..n).collect();
    }
    match max_embed {
        0 => return Vec::new(),
        1 => return vec![0],
        _ => {}
    }

    let mut interior: Vec<usize> = (1..n - 1).collect();
    // stable: equal scores keep ascending index order
    interior.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut selected: Vec<usize> = interior.into_iter().take(max_embed - 2).collect();
    selected.push(0);
    selected.push(n - 1);
    selected.sort_unstable();
    selected
}

fn thumbnail(path: &Path) -> Option<GrayImage> {
    match image::open(path) {
        Ok(img) => Some(image::imageops::resize(
            &img.to_luma8(),
            DIFF_WIDTH,
            DIFF_HEIGHT,
            FilterType::Triangle,
        )),
        Err(e) => {
            warn!(
                "Could not decode frame {}: {}",
                crate::sanitize::redact_path(path),
                e
            );
            None
        }
    }
}

fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> f64 {
    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    total as f64 / a.as_raw().len().max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use tempfile::TempDir;

    fn write_frames(dir: &Path, levels: &[u8]) -> Vec<PathBuf> {
        levels
            .iter()
            .enumerate()
            .map(|(i, &level)| {
                let path = dir.join(format!("frame_{:04}.png", i));
                GrayImage::from_pixel(64, 36, Luma([level])).save(&path).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_short_input_returned_unchanged() {
        let frames: Vec<PathBuf> = (0..4).map(|i| PathBuf::from(format!("f{}.png", i))).collect();
        assert_eq!(FrameSelector::select(&frames, 4), frames);
        assert_eq!(FrameSelector::select(&frames, 10), frames);
        assert!(FrameSelector::select(&[], 3).is_empty());
    }

    #[test]
    fn test_twelve_frames_pick_five() {
        let dir = TempDir::new().unwrap();
        // large jumps at 3, 7 and 9
        let frames = write_frames(
            dir.path(),
            &[10, 10, 12, 200, 200, 201, 200, 50, 52, 255, 255, 254],
        );

        let selected = FrameSelector::select(&frames, 5);

        let expected: Vec<PathBuf> = [0, 3, 7, 9, 11].iter().map(|&i| frames[i].clone()).collect();
        assert_eq!(selected, expected);
    }

    #[test]
    fn test_undecodable_frame_scores_zero() {
        let dir = TempDir::new().unwrap();
        let mut frames = write_frames(dir.path(), &[0, 0, 0, 100]);
        std::fs::write(&frames[2], b"not an image").unwrap();

        let scores = FrameSelector::difference_scores(&frames);
        assert_eq!(scores[0], 0.0);
        assert_eq!(scores[2], 0.0);
        // compared against frame 1, the last one that decoded
        assert!((scores[3] - 100.0).abs() < 1e-9);

        frames.push(dir.path().join("missing.png"));
        assert_eq!(FrameSelector::difference_scores(&frames)[4], 0.0);
    }

    #[test]
    fn test_select_by_scores_properties() {
        let scores = [0.0, 5.0, 1.0, 9.0, 9.0, 2.0, 0.0, 3.0];
        for max in 2..scores.len() {
            let selected = select_by_scores(&scores, max);
            assert_eq!(selected.len(), max);
            assert_eq!(selected[0], 0);
            assert_eq!(*selected.last().unwrap(), scores.len() - 1);
            assert!(selected.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_ties_prefer_earlier_index() {
        let scores = [0.0, 4.0, 4.0, 4.0, 0.0];
        assert_eq!(select_by_scores(&scores, 3), vec![0, 1, 4]);
        assert_eq!(select_by_scores(&scores, 4), vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_last_frame_score_not_double_counted() {
        // last frame has the highest score but is always included anyway
        let scores = [0.0, 1.0, 2.0, 3.0, 50.0];
        assert_eq!(select_by_scores(&scores, 3), vec![0, 3, 4]);
    }

    #[test]
    fn test_single_slot_keeps_first_frame() {
        assert_eq!(select_by_scores(&[0.0, 1.0, 2.0], 1), vec![0]);
        assert!(select_by_scores(&[0.0, 1.0], 0).is_empty());
    }
}
