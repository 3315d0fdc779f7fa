//! Single-frame flow layout: stack blocks top-to-bottom inside a page frame.
//!
//! This is the typesetting layer underneath [`crate::pipeline::compose`]. It
//! knows about three kinds of block (image, fixed spacer, paragraph), wraps
//! paragraph text with Helvetica metrics and places everything at absolute
//! PDF coordinates (origin bottom-left, units are points).
//!
//! ## Overflow
//!
//! A page holds one frame. Content that runs past the frame bottom is cut:
//! the flow stops at the first block that does not fit, keeping the lines of
//! a straddling paragraph that do fit, and the result is flagged
//! `truncated`. An image larger than the whole frame can never be placed and
//! is an error rather than a cut, so the caller can fall back to text-only.

use crate::pipeline::document::EmbeddedImage;
use thiserror::Error;

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Margins {
    /// 1.25 in on the sides and top, 1.75 in at the bottom (footer room).
    pub const GENEROUS: Margins = Margins {
        left: 90.0,
        right: 90.0,
        top: 90.0,
        bottom: 126.0,
    };
}

/// The rectangle content is flowed into. `y` is the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Frame {
    /// The frame left over on a `page_width` × `page_height` page.
    pub fn inside(page_width: f32, page_height: f32, margins: Margins) -> Frame {
        Frame {
            x: margins.left,
            y: margins.bottom,
            width: page_width - margins.left - margins.right,
            height: page_height - margins.top - margins.bottom,
        }
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }
}

/// Typographic settings for a flowed paragraph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParagraphStyle {
    pub font_size: f32,
    pub leading: f32,
    pub space_before: f32,
    pub space_after: f32,
}

impl Default for ParagraphStyle {
    fn default() -> Self {
        Self {
            font_size: 11.0,
            leading: 14.0,
            space_before: 6.0,
            space_after: 6.0,
        }
    }
}

/// Input to [`flow`].
#[derive(Debug, Clone)]
pub enum Block {
    Image {
        image: EmbeddedImage,
        width: f32,
        height: f32,
    },
    Spacer(f32),
    Paragraph {
        text: String,
        style: ParagraphStyle,
    },
}

/// One laid-out line of text; `baseline` is the PDF y coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x: f32,
    pub baseline: f32,
}

/// A block at its final position on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacedBlock {
    Image {
        image: EmbeddedImage,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Text {
        /// The paragraph source this block was flowed from.
        text: String,
        font_size: f32,
        lines: Vec<TextLine>,
    },
}

/// Result of flowing a block sequence into a frame.
#[derive(Debug, Clone, Default)]
pub struct Flowed {
    pub blocks: Vec<PlacedBlock>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LayoutError {
    #[error("frame has no usable area ({width}x{height})")]
    DegenerateFrame { width: f32, height: f32 },

    #[error("block size {width}x{height} is not a positive finite size")]
    InvalidSize { width: f32, height: f32 },

    #[error("block {width:.1}x{height:.1} cannot fit a {frame_width:.1}x{frame_height:.1} frame")]
    BlockTooLarge {
        width: f32,
        height: f32,
        frame_width: f32,
        frame_height: f32,
    },
}

/// Flow `blocks` top-to-bottom into `frame`.
pub fn flow(blocks: Vec<Block>, frame: Frame) -> Result<Flowed, LayoutError> {
    if !(frame.width > 0.0 && frame.height > 0.0) {
        return Err(LayoutError::DegenerateFrame {
            width: frame.width,
            height: frame.height,
        });
    }

    let mut out = Flowed::default();
    let bottom = frame.y;
    let mut cursor = frame.top();

    for block in blocks {
        match block {
            Block::Spacer(h) => {
                cursor = (cursor - h).max(bottom);
            }
            Block::Image {
                image,
                width,
                height,
            } => {
                if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
                    return Err(LayoutError::InvalidSize { width, height });
                }
                if width > frame.width || height > frame.height {
                    return Err(LayoutError::BlockTooLarge {
                        width,
                        height,
                        frame_width: frame.width,
                        frame_height: frame.height,
                    });
                }
                if cursor - height < bottom {
                    out.truncated = true;
                    break;
                }
                let y = cursor - height;
                out.blocks.push(PlacedBlock::Image {
                    image,
                    x: frame.x + (frame.width - width) / 2.0,
                    y,
                    width,
                    height,
                });
                cursor = y;
            }
            Block::Paragraph { text, style } => {
                if cursor < frame.top() {
                    cursor -= style.space_before;
                }
                let wrapped = wrap_lines(&text, style.font_size, frame.width);
                let mut lines = Vec::with_capacity(wrapped.len());
                for line in wrapped {
                    if cursor - style.leading < bottom {
                        out.truncated = true;
                        break;
                    }
                    lines.push(TextLine {
                        text: line,
                        x: frame.x,
                        baseline: cursor - style.font_size,
                    });
                    cursor -= style.leading;
                }
                if !lines.is_empty() {
                    out.blocks.push(PlacedBlock::Text {
                        text,
                        font_size: style.font_size,
                        lines,
                    });
                }
                if out.truncated {
                    break;
                }
                cursor = (cursor - style.space_after).max(bottom);
            }
        }
    }

    Ok(out)
}

/// Greedy word wrap. A `\n` inside `text` is a forced line break; words
/// wider than the line are split between characters.
pub fn wrap_lines(text: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for hard_line in text.split('\n') {
        let mut current = String::new();
        for word in hard_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, font_size) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(word, font_size) <= max_width {
                current = word.to_string();
            } else {
                for chunk in split_long_word(word, font_size, max_width) {
                    if !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                    }
                    current = chunk;
                }
            }
        }
        lines.push(current);
    }
    lines
}

fn split_long_word(word: &str, font_size: f32, max_width: f32) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        // A lone character always stays, even if it is wider than the line.
        if current.chars().count() > 1 && text_width(&current, font_size) > max_width {
            current.pop();
            chunks.push(std::mem::replace(&mut current, ch.to_string()));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Rendered width of `text` in Helvetica at `font_size` points.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| helvetica_width(c) as u32).sum();
    units as f32 * font_size / 1000.0
}

/// Helvetica advance widths (1/1000 em) from the standard AFM metrics.
fn helvetica_width(c: char) -> u16 {
    const ASCII: [u16; 95] = [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
        278, 278, 584, 584, 584, 556, 1015, // :;<=>?@
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
        278, 278, 278, 469, 556, 333, // [\]^_`
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
        556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
        334, 260, 334, 584, // {|}~
    ];
    match c as u32 {
        code @ 32..=126 => ASCII[(code - 32) as usize],
        _ => 556,
    }
}
