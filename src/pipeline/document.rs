//! Output document: composed pages → a new PDF file.
//!
//! The writer emits a deliberately small PDF: one shared Helvetica font
//! (WinAnsi encoding), one content stream per page, and one FlateDecode RGB
//! image XObject per placed image. Images are compressed when they are
//! composed (see [`EmbeddedImage::encode`]) so an encoding problem surfaces
//! during composition, where it can still trigger the text-only fallback.

use crate::error::TranslateError;
use crate::pipeline::decode::DecodedImage;
use crate::pipeline::layout::PlacedBlock;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// An image ready to be embedded: 8-bit RGB, zlib-compressed.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    data: Vec<u8>,
}

impl EmbeddedImage {
    /// Flatten to RGB and compress for a `/FlateDecode` image stream.
    pub fn encode(image: &DecodedImage) -> std::io::Result<Self> {
        let rgb = image.pixels.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(rgb.as_raw())?;
        let data = encoder.finish()?;

        Ok(Self {
            width,
            height,
            data,
        })
    }

    fn to_stream(&self) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => self.width as i64,
                "Height" => self.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
                "Filter" => "FlateDecode",
            },
            self.data.clone(),
        )
        .with_compression(false)
    }

    #[cfg(test)]
    pub(crate) fn test_fixture(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: Vec::new(),
        }
    }
}

/// One generated page: its size and the blocks placed on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPage {
    /// 0-based index of the source page this page was built from.
    pub source_index: usize,
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<PlacedBlock>,
    /// True when the page was built by the text-only fallback.
    pub text_only: bool,
}

impl ComposedPage {
    /// Paragraph sources of the text blocks, in placement order.
    pub fn text_blocks(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                PlacedBlock::Text { text, .. } => Some(text.as_str()),
                PlacedBlock::Image { .. } => None,
            })
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, PlacedBlock::Image { .. }))
            .count()
    }
}

/// Pages accumulated for one source document, written once at the end.
#[derive(Debug, Default)]
pub struct OutputDocument {
    pages: Vec<ComposedPage>,
}

impl OutputDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, page: ComposedPage) {
        self.pages.push(page);
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn pages(&self) -> &[ComposedPage] {
        &self.pages
    }

    /// Serialise to PDF bytes.
    pub fn to_pdf_bytes(&self) -> Result<Vec<u8>, TranslateError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let mut xobjects = Dictionary::new();
            let mut operations = Vec::new();

            for block in &page.blocks {
                match block {
                    PlacedBlock::Image {
                        image,
                        x,
                        y,
                        width,
                        height,
                    } => {
                        let name = format!("Im{}", xobjects.len() + 1);
                        let image_id = doc.add_object(image.to_stream());
                        xobjects.set(name.clone(), image_id);
                        operations.push(Operation::new("q", vec![]));
                        operations.push(Operation::new(
                            "cm",
                            vec![
                                (*width).into(),
                                0.into(),
                                0.into(),
                                (*height).into(),
                                (*x).into(),
                                (*y).into(),
                            ],
                        ));
                        operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                        operations.push(Operation::new("Q", vec![]));
                    }
                    PlacedBlock::Text {
                        font_size, lines, ..
                    } => {
                        for line in lines.iter().filter(|l| !l.text.is_empty()) {
                            operations.push(Operation::new("BT", vec![]));
                            operations.push(Operation::new("Tf", vec!["F1".into(), (*font_size).into()]));
                            operations.push(Operation::new("Td", vec![line.x.into(), line.baseline.into()]));
                            operations.push(Operation::new(
                                "Tj",
                                vec![Object::String(win_ansi_encode(&line.text), StringFormat::Literal)],
                            ));
                            operations.push(Operation::new("ET", vec![]));
                        }
                    }
                }
            }

            let content = Content { operations }
                .encode()
                .map_err(|e| TranslateError::Internal(format!("content stream encoding: {e}")))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), page.width.into(), page.height.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => xobjects,
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buf = Vec::new();
        doc.save_to(&mut buf)
            .map_err(|e| TranslateError::Internal(format!("PDF serialisation: {e}")))?;
        debug!("Serialised {} pages → {} bytes", self.pages.len(), buf.len());
        Ok(buf)
    }

    /// Write the document to `path`.
    ///
    /// Bytes go to a temp file beside `path` which is then renamed over it,
    /// so an interrupted run never leaves a half-written PDF.
    pub fn save(&self, path: &Path) -> Result<(), TranslateError> {
        let bytes = self.to_pdf_bytes()?;
        let write_failed = |source: std::io::Error| TranslateError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_failed)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_failed)?;
        tmp.write_all(&bytes).map_err(write_failed)?;
        tmp.persist(path).map_err(|e| write_failed(e.error))?;
        Ok(())
    }
}

/// Encode text for a WinAnsi-encoded base-14 font. Characters outside the
/// code page become `?`.
pub fn win_ansi_encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\t' => b' ',
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::layout::TextLine;
    use image::{DynamicImage, Rgb, RgbImage};

    fn text_page(index: usize, text: &str) -> ComposedPage {
        ComposedPage {
            source_index: index,
            width: 612.0,
            height: 792.0,
            blocks: vec![PlacedBlock::Text {
                text: text.to_string(),
                font_size: 11.0,
                lines: vec![TextLine {
                    text: text.to_string(),
                    x: 90.0,
                    baseline: 691.0,
                }],
            }],
            text_only: true,
        }
    }

    #[test]
    fn win_ansi_maps_latin1_and_typography() {
        assert_eq!(win_ansi_encode("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(win_ansi_encode("“ok”—€"), vec![0x93, b'o', b'k', 0x94, 0x97, 0x80]);
        assert_eq!(win_ansi_encode("日本"), vec![b'?', b'?']);
    }

    #[test]
    fn embedded_image_round_trips_through_zlib() {
        use flate2::read::ZlibDecoder;
        use std::io::Read;

        let decoded = DecodedImage {
            width: 2,
            height: 1,
            pixels: DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 1, Rgb([1, 2, 3]))),
        };
        let embedded = EmbeddedImage::encode(&decoded).unwrap();
        let mut raw = Vec::new();
        ZlibDecoder::new(&embedded.data[..]).read_to_end(&mut raw).unwrap();
        assert_eq!(raw, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn written_pdf_reopens_with_all_pages() {
        let mut out = OutputDocument::new();
        out.push(text_page(0, "first"));
        out.push(text_page(2, "third"));
        let bytes = out.to_pdf_bytes().unwrap();

        let reopened = Document::load_mem(&bytes).unwrap();
        assert_eq!(reopened.get_pages().len(), 2);
        let text = reopened.extract_text(&[2]).unwrap();
        assert!(text.contains("third"), "got: {text:?}");
    }

    #[test]
    fn empty_document_is_still_a_pdf() {
        let bytes = OutputDocument::new().to_pdf_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn save_writes_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.pdf");
        let mut out = OutputDocument::new();
        out.push(text_page(0, "hello"));
        out.save(&path).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert!(written.starts_with(b"%PDF"));
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1, "temp file must be renamed, not copied");
    }
}
