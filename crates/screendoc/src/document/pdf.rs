use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use image::GenericImageView;
use log::{debug, warn};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::ProcessError;

use super::references::{strip_tags, EmbedInstruction};
use super::{DocumentRenderer, RenderRequest};

// US Letter in points
const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;
const MARGIN: f64 = 50.0;
const MAX_IMAGE_HEIGHT: f64 = 320.0;
/// Width of `- ` at body size.
const BULLET_INDENT: f64 = 10.0;
const LINE_SPACING: f64 = 1.4;
/// Average Helvetica glyph width as a fraction of the font size.
const CHAR_WIDTH: f64 = 0.5;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block<'a> {
    Title(&'a str),
    Section(&'a str),
    Step(&'a str),
    Label { label: &'a str, rest: &'a str },
    Bullet(&'a str),
    Body(&'a str),
    Blank,
}

fn classify(line: &str) -> Block<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Block::Blank;
    }
    if let Some(text) = line.strip_prefix("### ") {
        return Block::Step(text.trim());
    }
    if let Some(text) = line.strip_prefix("## ") {
        return Block::Section(text.trim());
    }
    if let Some(text) = line.strip_prefix("# ") {
        return Block::Title(text.trim());
    }
    if let Some(text) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Block::Bullet(text.trim());
    }
    if let Some(after) = line.strip_prefix("**") {
        if let Some(end) = after.find("**") {
            return Block::Label {
                label: after[..end].trim(),
                rest: after[end + 2..].trim(),
            };
        }
    }
    Block::Body(line)
}

#[derive(Default)]
struct Page {
    content: String,
    images: Vec<(String, ObjectId)>,
}

struct Layout {
    pages: Vec<Page>,
    y: f64,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn ensure(&mut self, height: f64) {
        if self.y - height < MARGIN && self.y < PAGE_HEIGHT - MARGIN {
            self.pages.push(Page::default());
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn gap(&mut self, height: f64) {
        self.y -= height;
    }

    /// Writes one line whose baseline sits one font size below the cursor.
    fn line(&mut self, spans: &[(&str, &str)], size: f64, x: f64) {
        let advance = size * LINE_SPACING;
        self.ensure(advance);
        let baseline = self.y - size;

        let mut cursor = x;
        let mut ops = String::new();
        for (font, text) in spans {
            if text.is_empty() {
                continue;
            }
            ops.push_str(&format!(
                "BT\n/{} {} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
                font,
                size,
                cursor,
                baseline,
                escape_pdf_string(text)
            ));
            cursor += (text.chars().count() as f64 + 1.0) * size * CHAR_WIDTH;
        }
        self.page().content.push_str(&ops);
        self.y -= advance;
    }

    fn paragraph(&mut self, font: &'static str, size: f64, x: f64, text: &str) {
        let width = PAGE_WIDTH - MARGIN - x;
        for line in wrap(text, max_chars(width, size)) {
            self.line(&[(font, line.as_str())], size, x);
        }
    }

    fn image(&mut self, name: &str, id: ObjectId, width_px: u32, height_px: u32) {
        let available = PAGE_WIDTH - 2.0 * MARGIN;
        let scale = (available / f64::from(width_px))
            .min(MAX_IMAGE_HEIGHT / f64::from(height_px))
            .min(1.0);
        let (w, h) = (f64::from(width_px) * scale, f64::from(height_px) * scale);

        self.ensure(h + 8.0);
        self.gap(4.0);
        let x = MARGIN + (available - w) / 2.0;
        let y = self.y - h;

        let page = self.page();
        page.content.push_str(&format!(
            "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/{} Do\nQ\n",
            w, h, x, y, name
        ));
        page.images.push((name.to_string(), id));
        self.y = y - 8.0;
    }
}

fn max_chars(width: f64, size: f64) -> usize {
    ((width / (size * CHAR_WIDTH)) as usize).max(10)
}

/// Greedy word wrap; words longer than a line are split.
fn wrap(text: &str, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            '\u{2018}' | '\u{2019}' => "'".to_string(),
            '\u{201C}' | '\u{201D}' => "\"".to_string(),
            '\u{2013}' | '\u{2014}' | '\u{2022}' => "-".to_string(),
            c if c.is_ascii() && !c.is_control() => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

/// Renders the narrative as a paginated PDF with Helvetica text and the
/// resolved frames placed after the line that referenced them.
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<Vec<u8>, ProcessError> {
        let _span = tracing::info_span!(
            "document.pdf",
            embeds = request.resolution.embeds.len(),
            text_only = request.resolution.text_only
        )
        .entered();

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });

        let mut by_line: BTreeMap<usize, Vec<&EmbedInstruction>> = BTreeMap::new();
        for embed in &request.resolution.embeds {
            by_line.entry(embed.line).or_default().push(embed);
        }

        let mut images: HashMap<PathBuf, Option<(ObjectId, u32, u32)>> = HashMap::new();
        let mut layout = Layout::new();

        let has_title = request
            .narrative
            .lines()
            .find(|l| !l.trim().is_empty())
            .is_some_and(|l| matches!(classify(l), Block::Title(_)));
        if !has_title {
            layout.paragraph(BOLD, 20.0, MARGIN, request.title);
            layout.gap(8.0);
        }

        for (index, raw) in request.narrative.lines().enumerate() {
            let line = strip_tags(raw);
            match classify(&line) {
                Block::Title(text) => {
                    layout.paragraph(BOLD, 20.0, MARGIN, text);
                    layout.gap(8.0);
                }
                Block::Section(text) => {
                    layout.gap(6.0);
                    layout.paragraph(BOLD, 15.0, MARGIN, text);
                    layout.gap(2.0);
                }
                Block::Step(text) => {
                    layout.gap(4.0);
                    layout.paragraph(BOLD, 12.0, MARGIN, text);
                }
                Block::Label { label, rest } => {
                    let max = max_chars(PAGE_WIDTH - 2.0 * MARGIN, 10.0);
                    let mut lines = wrap(rest, max.saturating_sub(label.chars().count() + 1).max(10));
                    let first = if lines.is_empty() { String::new() } else { lines.remove(0) };
                    layout.line(&[(BOLD, label), (REGULAR, first.as_str())], 10.0, MARGIN);
                    for line in lines {
                        layout.line(&[(REGULAR, line.as_str())], 10.0, MARGIN);
                    }
                }
                Block::Bullet(text) => {
                    let max = max_chars(PAGE_WIDTH - MARGIN - (MARGIN + BULLET_INDENT), 10.0);
                    for (i, line) in wrap(&text.replace("**", ""), max).iter().enumerate() {
                        if i == 0 {
                            layout.line(&[(REGULAR, "-"), (REGULAR, line.as_str())], 10.0, MARGIN);
                        } else {
                            layout.line(&[(REGULAR, line.as_str())], 10.0, MARGIN + BULLET_INDENT);
                        }
                    }
                }
                Block::Body(text) => layout.paragraph(REGULAR, 10.0, MARGIN, &text.replace("**", "")),
                Block::Blank => layout.gap(5.0),
            }

            for embed in by_line.get(&index).into_iter().flatten() {
                let loaded = images
                    .entry(embed.image.clone())
                    .or_insert_with(|| embed_image(&mut doc, &embed.image));
                if let Some((id, w, h)) = *loaded {
                    let name = format!("Im{}", id.0);
                    layout.image(&name, id, w, h);
                }
            }
        }

        let mut page_ids = Vec::with_capacity(layout.pages.len());
        for page in layout.pages {
            let mut xobjects = Dictionary::new();
            for (name, id) in &page.images {
                xobjects.set(name.as_str(), *id);
            }
            let content_id = doc.add_object(Stream::new(dictionary! {}, page.content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! {
                        REGULAR => regular_id,
                        BOLD => bold_id,
                    },
                    "XObject" => xobjects,
                },
                "Contents" => content_id,
            });
            page_ids.push(page_id);
        }

        debug!("Rendered {} PDF pages", page_ids.len());
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => page_ids.len() as i64,
                "Kids" => page_ids.into_iter().map(Object::from).collect::<Vec<Object>>(),
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| ProcessError::Rendering(e.to_string()))?;
        Ok(buffer)
    }

    fn extension(&self) -> &str {
        "pdf"
    }
}

/// Adds the image at `path` as an RGB XObject. Unreadable images are logged
/// and left out of the document.
fn embed_image(doc: &mut Document, path: &Path) -> Option<(ObjectId, u32, u32)> {
    let img = match image::open(path) {
        Ok(img) => img,
        Err(e) => {
            warn!(
                "Skipping frame {} in document: {}",
                crate::sanitize::redact_path(path),
                e
            );
            return None;
        }
    };

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        img.to_rgb8().into_raw(),
    );
    Some((doc.add_object(stream), width, height))
}
