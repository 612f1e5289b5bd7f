//! Text Extraction
//!
//! Structured text is derived from a page on every call, serialized into a
//! scratch buffer and released before the envelope is returned:
//!
//! ```text
//! page ──► StructuredText ──► JSON writer ──► ScratchBuffer ──► String
//!                        └──► plain writer ─┘
//! ```
//!
//! Both intermediates are ledger-tracked and dropped on every exit path.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::buffer::ScratchBuffer;
use crate::context::Context;
use crate::engine::{Engine, Point, Rect};
use crate::envelope::Envelope;
use crate::error::{BoundaryError, Result};
use crate::ledger::{ResourceKind, Tracked};
use crate::page::Page;

/// Writing direction of a line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WritingMode {
    #[default]
    Horizontal,
    Vertical,
}

impl WritingMode {
    /// Numeric mode used in serialized output (0 horizontal, 1 vertical)
    pub fn as_u8(self) -> u8 {
        match self {
            WritingMode::Horizontal => 0,
            WritingMode::Vertical => 1,
        }
    }
}

/// Generic family of a font
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    Serif,
    #[default]
    SansSerif,
    Monospace,
}

impl FontFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            FontFamily::Serif => "serif",
            FontFamily::SansSerif => "sans-serif",
            FontFamily::Monospace => "monospace",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn as_str(self) -> &'static str {
        match self {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

impl FontStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
        }
    }
}

/// Font of a line's first character.
///
/// Attributes the engine does not report keep their defaults: an empty
/// name, sans-serif, normal weight and style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StextFont {
    pub name: String,
    pub family: FontFamily,
    pub weight: FontWeight,
    pub style: FontStyle,
}

/// One positioned character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StextChar {
    pub c: char,
    /// Baseline origin in page space
    pub origin: Point,
    /// Font size in points
    pub size: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StextLine {
    pub bbox: Rect,
    pub wmode: WritingMode,
    #[serde(default)]
    pub font: StextFont,
    pub chars: Vec<StextChar>,
}

impl StextLine {
    pub fn text(&self) -> String {
        self.chars.iter().map(|ch| ch.c).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StextBlock {
    pub bbox: Rect,
    pub lines: Vec<StextLine>,
}

/// Engine-independent structured text of one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredText {
    pub blocks: Vec<StextBlock>,
}

impl StructuredText {
    /// Build the serialized document, scaling every coordinate by `scale`.
    pub fn layout(&self, scale: f32) -> TextLayout {
        TextLayout {
            blocks: self
                .blocks
                .iter()
                .map(|block| LayoutBlock {
                    kind: "text".to_string(),
                    bbox: LayoutBox::scaled(&block.bbox, scale),
                    lines: block
                        .lines
                        .iter()
                        .map(|line| LayoutLine::scaled(line, scale))
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn write_json<W: Write>(&self, out: W, scale: f32) -> Result<()> {
        serde_json::to_writer(out, &self.layout(scale))?;
        Ok(())
    }

    /// One line of text per structured line, a blank line after each block.
    pub fn write_plain<W: Write>(&self, mut out: W) -> io::Result<()> {
        for block in &self.blocks {
            for line in &block.lines {
                let mut utf8 = [0u8; 4];
                for ch in &line.chars {
                    out.write_all(ch.c.encode_utf8(&mut utf8).as_bytes())?;
                }
                out.write_all(b"\n")?;
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// Integer box as emitted in JSON output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl LayoutBox {
    // Coordinates are truncated toward zero after scaling.
    fn scaled(rect: &Rect, scale: f32) -> Self {
        Self {
            x: (rect.x0 * scale) as i32,
            y: (rect.y0 * scale) as i32,
            w: (rect.width() * scale) as i32,
            h: (rect.height() * scale) as i32,
        }
    }
}

/// Line font as emitted in JSON output; every field is always present
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFont {
    pub name: String,
    pub family: String,
    pub weight: String,
    pub style: String,
    pub size: i32,
}

impl LayoutFont {
    fn scaled(font: &StextFont, size: f32, scale: f32) -> Self {
        Self {
            name: font.name.clone(),
            family: font.family.as_str().to_string(),
            weight: font.weight.as_str().to_string(),
            style: font.style.as_str().to_string(),
            size: (size * scale) as i32,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutLine {
    pub wmode: u8,
    pub bbox: LayoutBox,
    pub font: LayoutFont,
    /// Origin of the first character
    pub x: i32,
    pub y: i32,
    pub text: String,
}

impl LayoutLine {
    fn scaled(line: &StextLine, scale: f32) -> Self {
        let (origin, size) = line
            .chars
            .first()
            .map(|ch| (ch.origin, ch.size))
            .unwrap_or_default();

        Self {
            wmode: line.wmode.as_u8(),
            bbox: LayoutBox::scaled(&line.bbox, scale),
            font: LayoutFont::scaled(&line.font, size, scale),
            x: (origin.x * scale) as i32,
            y: (origin.y * scale) as i32,
            text: line.text(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub bbox: LayoutBox,
    pub lines: Vec<LayoutLine>,
}

/// Deserialized form of [`Context::page_as_json`] output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLayout {
    pub blocks: Vec<LayoutBlock>,
}

impl TextLayout {
    /// Every line's text, in reading order
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.blocks
            .iter()
            .flat_map(|block| block.lines.iter().map(|line| line.text.as_str()))
    }
}

/// Structured text living only for the duration of one operation
struct TransientText {
    text: StructuredText,
    _tracked: Tracked,
}

fn validate_scale(scale: f32) -> Result<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(BoundaryError::InvalidArgument(format!(
            "scale must be a positive finite number, got {}",
            scale
        )))
    }
}

impl<E: Engine> Context<E> {
    fn transient_text(&self, page: &Page<'_, E>) -> Result<TransientText> {
        let tracked = self.track(ResourceKind::StructuredText);
        let text = self.engine().structured_text(page.inner())?;
        Ok(TransientText {
            text,
            _tracked: tracked,
        })
    }

    /// Structured text of `page` serialized as JSON, coordinates scaled by `scale`.
    pub fn page_as_json(&self, page: &Page<'_, E>, scale: f32) -> Envelope<String> {
        self.attempt("page_as_json", || {
            self.ensure_owns(page.context_id())?;
            validate_scale(scale)?;

            let mut out = ScratchBuffer::new(self.track(ResourceKind::Buffer));
            let stext = self.transient_text(page)?;
            stext.text.write_json(&mut out, scale)?;
            drop(stext);

            out.into_string()
        })
    }

    /// Structured text of `page` as plain text.
    ///
    /// Serialization failures are reported as `Err`, never as an empty or
    /// truncated `Ok`.
    pub fn page_as_plain_text(&self, page: &Page<'_, E>) -> Envelope<String> {
        self.attempt("page_as_plain_text", || {
            self.ensure_owns(page.context_id())?;

            let stext = self.transient_text(page)?;
            let mut out = ScratchBuffer::new(self.track(ResourceKind::Buffer));
            stext.text.write_plain(&mut out)?;
            drop(stext);

            out.into_string()
        })
    }

    /// [`page_as_json`](Self::page_as_json) parsed back into a [`TextLayout`].
    pub fn page_text_layout(&self, page: &Page<'_, E>, scale: f32) -> Envelope<TextLayout> {
        self.page_as_json(page, scale)
            .into_result()
            .map_or_else(Envelope::Err, |json| {
                self.attempt("page_text_layout", || {
                    serde_json::from_str(&json).map_err(BoundaryError::from)
                })
            })
    }
}
