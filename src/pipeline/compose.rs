//! Page composition: translated text + embedded images → one output page.
//!
//! ## Layout
//!
//! Images come first, each scaled by [`fit_image`] and followed by a 12 pt
//! spacer, then the translated text split into paragraphs. Everything is
//! flowed into a single frame inset by [`Margins::GENEROUS`].
//!
//! ## Fallback
//!
//! [`compose`] tries [`compose_with_images`] and, if that fails for any
//! reason, [`compose_text_only`]. Images are best-effort; text is what the
//! reader came for.

use crate::config::PageSize;
use crate::pipeline::decode::decode;
use crate::pipeline::document::{ComposedPage, EmbeddedImage};
use crate::pipeline::extract::RawImageRecord;
use crate::pipeline::layout::{flow, Block, Frame, LayoutError, Margins, ParagraphStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// Widest an image may be, as a fraction of the frame width.
pub const MAX_IMAGE_WIDTH_RATIO: f32 = 0.8;
/// Tallest an image may be, as a fraction of the frame height.
pub const MAX_IMAGE_HEIGHT_RATIO: f32 = 0.4;
/// Gap after every image and paragraph.
pub const BLOCK_SPACING: f32 = 12.0;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("layout failed: {0}")]
    Layout(#[from] LayoutError),

    #[error("image encoding failed: {0}")]
    ImageEncoding(#[from] std::io::Error),
}

/// Compose a page, falling back to text-only if the full layout fails.
pub fn compose(
    source_index: usize,
    translated_text: &str,
    images: &[RawImageRecord],
    page_size: PageSize,
) -> Result<ComposedPage, ComposeError> {
    first_success(
        source_index,
        || compose_with_images(source_index, translated_text, images, page_size),
        || compose_text_only(source_index, translated_text, page_size),
    )
}

fn first_success<F, G>(source_index: usize, primary: F, fallback: G) -> Result<ComposedPage, ComposeError>
where
    F: FnOnce() -> Result<ComposedPage, ComposeError>,
    G: FnOnce() -> Result<ComposedPage, ComposeError>,
{
    match primary() {
        Ok(page) => Ok(page),
        Err(e) => {
            warn!(
                "Page {}: image layout failed ({}), retrying text-only",
                source_index + 1,
                e
            );
            fallback()
        }
    }
}

/// Images (decoded, scaled) followed by the translated paragraphs.
///
/// Images that fail to decode are left out; that alone is not an error.
pub fn compose_with_images(
    source_index: usize,
    translated_text: &str,
    images: &[RawImageRecord],
    page_size: PageSize,
) -> Result<ComposedPage, ComposeError> {
    let (width, height) = page_size.dimensions();
    let frame = Frame::inside(width, height, Margins::GENEROUS);

    let mut blocks = Vec::new();
    for (i, record) in images.iter().enumerate() {
        let decoded = match decode(record) {
            Ok(d) => d,
            Err(e) => {
                debug!("Page {}: skipping image {}: {}", source_index + 1, i + 1, e);
                continue;
            }
        };
        let (w, h) = fit_image(decoded.width as f32, decoded.height as f32, &frame);
        blocks.push(Block::Image {
            image: EmbeddedImage::encode(&decoded)?,
            width: w,
            height: h,
        });
        blocks.push(Block::Spacer(BLOCK_SPACING));
    }
    blocks.extend(text_blocks(translated_text));

    finish(source_index, width, height, blocks, frame, false)
}

/// The translated paragraphs alone.
pub fn compose_text_only(
    source_index: usize,
    translated_text: &str,
    page_size: PageSize,
) -> Result<ComposedPage, ComposeError> {
    let (width, height) = page_size.dimensions();
    let frame = Frame::inside(width, height, Margins::GENEROUS);
    finish(
        source_index,
        width,
        height,
        text_blocks(translated_text),
        frame,
        true,
    )
}

fn finish(
    source_index: usize,
    width: f32,
    height: f32,
    blocks: Vec<Block>,
    frame: Frame,
    text_only: bool,
) -> Result<ComposedPage, ComposeError> {
    let flowed = flow(blocks, frame)?;
    if flowed.truncated {
        warn!(
            "Page {}: translated content overflows the page and was cut",
            source_index + 1
        );
    }
    Ok(ComposedPage {
        source_index,
        width,
        height,
        blocks: flowed.blocks,
        text_only,
    })
}

fn text_blocks(text: &str) -> Vec<Block> {
    split_paragraphs(text)
        .into_iter()
        .flat_map(|p| {
            [
                Block::Paragraph {
                    text: p,
                    style: ParagraphStyle::default(),
                },
                Block::Spacer(BLOCK_SPACING),
            ]
        })
        .collect()
}

/// Split on blank lines. Single newlines stay inside the paragraph as
/// forced breaks; blank paragraphs are dropped.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let normalised = text.replace("\r\n", "\n");
    PARAGRAPH_BREAK
        .split(&normalised)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Display size for an image with the given natural size (pixels read as
/// points) inside `frame`.
pub fn fit_image(natural_width: f32, natural_height: f32, frame: &Frame) -> (f32, f32) {
    let max_w = (frame.width * MAX_IMAGE_WIDTH_RATIO).min(natural_width);
    let max_h = frame.height * MAX_IMAGE_HEIGHT_RATIO;
    let aspect = natural_height / natural_width;

    let (mut w, mut h) = (natural_width, natural_height);
    if w > max_w {
        w = max_w;
        h = w * aspect;
    }
    if h > max_h {
        h = max_h;
        w = h / aspect;
    }
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::{ColorSpace, ImageEncoding};
    use crate::pipeline::layout::PlacedBlock;

    fn letter_frame() -> Frame {
        Frame::inside(612.0, 792.0, Margins::GENEROUS)
    }

    fn rgb_record(w: u32, h: u32) -> RawImageRecord {
        RawImageRecord {
            width: w,
            height: h,
            color_space: ColorSpace::Rgb,
            encoding: ImageEncoding::Raw,
            bytes: vec![128; (w * h * 3) as usize],
        }
    }

    #[test]
    fn fit_image_respects_caps_and_aspect() {
        let frame = letter_frame();
        for &(nw, nh) in &[
            (100.0, 100.0),
            (2000.0, 1000.0),
            (300.0, 2000.0),
            (1000.0, 10.0),
            (10.0, 1000.0),
            (345.6, 230.4),
        ] {
            let (w, h) = fit_image(nw, nh, &frame);
            assert!(w <= frame.width * 0.8 + 1e-3, "{nw}x{nh} → width {w}");
            assert!(h <= frame.height * 0.4 + 1e-3, "{nw}x{nh} → height {h}");
            let ratio = (w / h) / (nw / nh);
            assert!((ratio - 1.0).abs() < 1e-3, "{nw}x{nh} → {w}x{h}");
        }
    }

    #[test]
    fn small_images_keep_natural_size() {
        assert_eq!(fit_image(100.0, 50.0, &letter_frame()), (100.0, 50.0));
    }

    #[test]
    fn wide_image_scaled_to_width_cap() {
        let (w, h) = fit_image(864.0, 432.0, &letter_frame());
        assert!((w - 345.6).abs() < 1e-3);
        assert!((h - 172.8).abs() < 1e-3);
    }

    #[test]
    fn tall_image_scaled_to_height_cap() {
        let (w, h) = fit_image(100.0, 400.0, &letter_frame());
        assert!((h - 230.4).abs() < 1e-3);
        assert!((w - 57.6).abs() < 1e-3);
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        assert_eq!(split_paragraphs("Hello\n\nWorld"), vec!["Hello", "World"]);
        assert_eq!(split_paragraphs("a\r\n \t\r\nb"), vec!["a", "b"]);
        assert_eq!(split_paragraphs("one\ntwo\n\n\n\nthree"), vec!["one\ntwo", "three"]);
        assert!(split_paragraphs("  \n\n \n").is_empty());
    }

    #[test]
    fn unsupported_image_yields_text_only_content() {
        let images = vec![RawImageRecord {
            width: 10,
            height: 10,
            color_space: ColorSpace::Unknown,
            encoding: ImageEncoding::Other("JBIG2Decode".into()),
            bytes: vec![0; 16],
        }];
        let page = compose(0, "Hello\n\nWorld", &images, PageSize::Letter).unwrap();
        assert_eq!(page.text_blocks(), vec!["Hello", "World"]);
        assert_eq!(page.image_count(), 0);
        assert!(!page.text_only);
    }

    #[test]
    fn images_are_placed_before_text() {
        let page = compose(3, "Caption", &[rgb_record(40, 20)], PageSize::Letter).unwrap();
        assert_eq!(page.source_index, 3);
        assert!(matches!(page.blocks[0], PlacedBlock::Image { .. }));
        match (&page.blocks[0], &page.blocks[1]) {
            (PlacedBlock::Image { y, .. }, PlacedBlock::Text { lines, .. }) => {
                assert!(lines[0].baseline < *y);
            }
            other => panic!("unexpected blocks: {other:?}"),
        }
    }

    #[test]
    fn failed_primary_falls_back_to_text_only() {
        let page = first_success(
            1,
            || {
                Err(ComposeError::Layout(LayoutError::InvalidSize {
                    width: f32::NAN,
                    height: 1.0,
                }))
            },
            || compose_text_only(1, "Still here", PageSize::Letter),
        )
        .unwrap();
        assert!(page.text_only);
        assert_eq!(page.text_blocks(), vec!["Still here"]);
    }

    #[test]
    fn fallback_error_escalates() {
        let err = first_success(
            0,
            || Err(ComposeError::ImageEncoding(std::io::Error::other("boom"))),
            || compose_text_only(0, "x", PageSize::Custom { width: 100.0, height: 100.0 }),
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::Layout(LayoutError::DegenerateFrame { .. })));
    }

    #[test]
    fn composition_is_deterministic() {
        let images = [rgb_record(30, 30)];
        let a = compose(0, "Uno\n\nDos tres", &images, PageSize::A4).unwrap();
        let b = compose(0, "Uno\n\nDos tres", &images, PageSize::A4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_translation_gives_empty_page() {
        let page = compose(0, "", &[], PageSize::Letter).unwrap();
        assert!(page.blocks.is_empty());
    }
}
