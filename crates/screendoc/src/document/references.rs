use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::warn;
use regex::Regex;
use serde::Serialize;

static RE_FRAME_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\s*frame\s*:\s*([^\]\n]*?)\s*\]").unwrap());

/// Reference number (1-based, as written in the narrative) to redacted image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameMapping {
    frames: BTreeMap<usize, PathBuf>,
}

impl FrameMapping {
    /// Numbers `key_frames` from 1 in the order given.
    pub fn from_key_frames(key_frames: &[PathBuf]) -> Self {
        Self {
            frames: key_frames
                .iter()
                .enumerate()
                .map(|(i, p)| (i + 1, p.clone()))
                .collect(),
        }
    }

    pub fn get(&self, reference: usize) -> Option<&Path> {
        self.frames.get(&reference).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedInstruction {
    pub reference: usize,
    pub image: PathBuf,
    /// Zero-based line of the narrative holding the tag.
    pub line: usize,
    /// Byte offset of the tag in the narrative.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceWarning {
    pub tag: String,
    pub line: usize,
    pub reason: String,
}

impl std::fmt::Display for ReferenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {} ({})", self.line + 1, self.tag, self.reason)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub embeds: Vec<EmbedInstruction>,
    pub warnings: Vec<ReferenceWarning>,
    /// No frame tags at all were present.
    pub text_only: bool,
}

/// Resolves every `[FRAME: n]` tag in `narrative` against `mapping`.
///
/// Invalid tags are dropped and reported as warnings; resolution never fails.
pub fn resolve(narrative: &str, mapping: &FrameMapping) -> Resolution {
    let mut resolution = Resolution::default();
    let mut tags = 0;

    for caps in RE_FRAME_TAG.captures_iter(narrative) {
        let (Some(tag), Some(payload)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        tags += 1;
        let line = narrative[..tag.start()].matches('\n').count();

        match parse_reference(payload.as_str(), mapping) {
            Ok((reference, image)) => resolution.embeds.push(EmbedInstruction {
                reference,
                image: image.to_path_buf(),
                line,
                offset: tag.start(),
            }),
            Err(reason) => {
                warn!("Dropping frame reference {} on line {}: {}", tag.as_str(), line + 1, reason);
                resolution.warnings.push(ReferenceWarning {
                    tag: tag.as_str().to_string(),
                    line,
                    reason,
                });
            }
        }
    }

    resolution.text_only = tags == 0;
    resolution
}

fn parse_reference<'a>(payload: &str, mapping: &'a FrameMapping) -> Result<(usize, &'a Path), String> {
    if payload.is_empty() {
        return Err("empty reference".to_string());
    }
    if payload.contains(',') || payload.trim_start_matches('-').contains('-') {
        return Err("expected a single frame number, not a range or list".to_string());
    }
    if !payload.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' is not a positive integer", payload));
    }

    let reference: usize = payload
        .parse()
        .map_err(|_| format!("'{}' is out of range", payload))?;
    if reference == 0 {
        return Err("frame numbers start at 1".to_string());
    }

    mapping
        .get(reference)
        .map(|image| (reference, image))
        .ok_or_else(|| format!("only {} key frames exist", mapping.len()))
}

/// Removes every frame tag and trims the whitespace left behind at line ends.
pub fn strip_tags(text: &str) -> String {
    let stripped = RE_FRAME_TAG.replace_all(text, "");
    stripped
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(n: usize) -> FrameMapping {
        let frames: Vec<PathBuf> = (0..n)
            .map(|i| PathBuf::from(format!("redacted/frame_{:04}.png", i)))
            .collect();
        FrameMapping::from_key_frames(&frames)
    }

    #[test]
    fn test_mapping_is_one_based() {
        let m = mapping(3);
        assert_eq!(m.len(), 3);
        assert!(m.get(0).is_none());
        assert_eq!(m.get(1), Some(Path::new("redacted/frame_0000.png")));
        assert_eq!(m.get(3), Some(Path::new("redacted/frame_0002.png")));
    }

    #[test]
    fn test_resolves_valid_tags() {
        let text = "### Step 1\nOpen settings [FRAME: 1]\n### Step 2\nClick save [frame:2]";
        let r = resolve(text, &mapping(3));

        assert!(r.warnings.is_empty());
        assert!(!r.text_only);
        assert_eq!(r.embeds.len(), 2);
        assert_eq!(r.embeds[0].reference, 1);
        assert_eq!(r.embeds[0].line, 1);
        assert_eq!(r.embeds[1].reference, 2);
        assert_eq!(r.embeds[1].line, 3);
        assert_eq!(&text[r.embeds[1].offset..r.embeds[1].offset + 9], "[frame:2]");
    }

    #[test]
    fn test_out_of_range_reference_dropped_with_warning() {
        let text = "Step A [FRAME: 3]\nStep B [FRAME: 15]";
        let r = resolve(text, &mapping(10));

        assert_eq!(r.embeds.len(), 1);
        assert_eq!(r.embeds[0].reference, 3);
        assert_eq!(r.warnings.len(), 1);
        assert_eq!(r.warnings[0].tag, "[FRAME: 15]");
        assert_eq!(r.warnings[0].line, 1);
    }

    #[test]
    fn test_malformed_references() {
        let text = "[FRAME: 0] [FRAME: -2] [FRAME: 3-5] [FRAME: 3,4] [FRAME: two] [FRAME: ]";
        let r = resolve(text, &mapping(10));

        assert!(r.embeds.is_empty());
        assert_eq!(r.warnings.len(), 6);
        assert!(!r.text_only);
    }

    #[test]
    fn test_reused_reference_embeds_twice() {
        let r = resolve("[FRAME: 2] then again [FRAME: 2]", &mapping(2));
        assert_eq!(r.embeds.len(), 2);
        assert!(r.embeds.iter().all(|e| e.reference == 2));
    }

    #[test]
    fn test_no_tags_is_text_only() {
        let r = resolve("# Guide\nJust words.", &mapping(4));
        assert!(r.text_only);
        assert!(r.embeds.is_empty());
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn test_empty_mapping_drops_every_tag() {
        let r = resolve("[FRAME: 1]", &FrameMapping::default());
        assert!(r.embeds.is_empty());
        assert_eq!(r.warnings.len(), 1);
    }

    #[test]
    fn test_strip_tags() {
        let text = "Open the menu [FRAME: 1]\n[frame: 2]\nDone";
        assert_eq!(strip_tags(text), "Open the menu\n\nDone");
    }

    #[test]
    fn test_huge_number_is_a_warning() {
        let r = resolve("[FRAME: 99999999999999999999999]", &mapping(2));
        assert!(r.embeds.is_empty());
        assert_eq!(r.warnings.len(), 1);
    }
}
