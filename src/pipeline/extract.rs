//! Page extraction: source PDF → per-page text and raw image records.
//!
//! Parsing is done with `lopdf`, a pure-Rust object model, which gives
//! direct access to each image XObject's `/Filter`, `/ColorSpace` and stream
//! bytes. That is exactly the information the decoder needs to pick a
//! decoding strategy, and nothing is re-encoded on the way out.
//!
//! Only whole-document failures are errors. A page whose text cannot be
//! extracted yields an empty string and an image entry that cannot be
//! resolved is skipped.

use crate::error::TranslateError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One page of a source document.
#[derive(Debug, Clone)]
pub struct SourcePage {
    /// 0-based page index in the source document.
    pub index: usize,
    pub text: String,
    /// Image XObjects in resource-table order.
    pub images: Vec<RawImageRecord>,
}

/// An embedded raster image exactly as stored in the page resources.
#[derive(Debug, Clone)]
pub struct RawImageRecord {
    /// Width in pixels; 0 when the dictionary has no usable `/Width`.
    pub width: u32,
    /// Height in pixels; 0 when the dictionary has no usable `/Height`.
    pub height: u32,
    pub color_space: ColorSpace,
    pub encoding: ImageEncoding,
    /// Decompressed pixels for [`ImageEncoding::Raw`], the untouched
    /// compressed payload otherwise.
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    Rgb,
    Cmyk,
    Unknown,
}

impl ColorSpace {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"DeviceRGB" => ColorSpace::Rgb,
            b"DeviceCMYK" => ColorSpace::Cmyk,
            _ => ColorSpace::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageEncoding {
    /// FlateDecode: a dense pixel buffer once decompressed.
    Raw,
    /// DCTDecode (JPEG).
    Dct,
    /// JPXDecode (JPEG 2000).
    Jpx,
    /// Any other filter chain, or no filter at all.
    Other(String),
}

impl ImageEncoding {
    fn from_filter(filter: Option<&[u8]>) -> Self {
        match filter {
            Some(b"FlateDecode") => ImageEncoding::Raw,
            Some(b"DCTDecode") => ImageEncoding::Dct,
            Some(b"JPXDecode") => ImageEncoding::Jpx,
            Some(other) => ImageEncoding::Other(String::from_utf8_lossy(other).into_owned()),
            None => ImageEncoding::Other("none".to_string()),
        }
    }
}

/// Extract every page of the PDF at `path`.
///
/// Runs inside `spawn_blocking` since parsing is CPU-bound and synchronous.
pub async fn extract(path: &Path) -> Result<Vec<SourcePage>, TranslateError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&path))
        .await
        .map_err(|e| TranslateError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of [`extract`].
pub fn extract_blocking(path: &Path) -> Result<Vec<SourcePage>, TranslateError> {
    let bytes = read_pdf_bytes(path)?;
    let document = Document::load_mem(&bytes).map_err(|e| {
        let detail = e.to_string();
        if detail.contains("ncrypt") {
            TranslateError::Encrypted {
                path: path.to_path_buf(),
            }
        } else {
            TranslateError::CorruptPdf {
                path: path.to_path_buf(),
                detail,
            }
        }
    })?;

    let pages = extract_document(&document);
    info!("PDF loaded: {} pages from {}", pages.len(), path.display());
    Ok(pages)
}

/// Extract all pages from an already-parsed document.
pub fn extract_document(document: &Document) -> Vec<SourcePage> {
    document
        .get_pages()
        .into_iter()
        .enumerate()
        .map(|(index, (page_number, page_id))| {
            let text = document.extract_text(&[page_number]).unwrap_or_else(|e| {
                debug!("Page {}: no extractable text ({})", page_number, e);
                String::new()
            });
            let images = collect_images(document, page_id);
            debug!(
                "Page {}: {} chars, {} images",
                page_number,
                text.len(),
                images.len()
            );
            SourcePage {
                index,
                text,
                images,
            }
        })
        .collect()
}

/// Read the file, mapping I/O failures and validating the `%PDF` magic.
fn read_pdf_bytes(path: &Path) -> Result<Vec<u8>, TranslateError> {
    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => TranslateError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => TranslateError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| TranslateError::CorruptPdf {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(TranslateError::NotAPdf {
            path: PathBuf::from(path),
            magic,
        });
    }

    Ok(bytes)
}

/// Follow a single level of indirection.
fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up `key` on the page, walking up `/Parent` for inherited attributes.
fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    // Bounded walk: malformed files can contain /Parent cycles.
    for _ in 0..32 {
        let dict = document.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Collect image XObjects from the page's resource table, in table order.
fn collect_images(document: &Document, page_id: ObjectId) -> Vec<RawImageRecord> {
    let Some(resources) = inherited(document, page_id, b"Resources")
        .and_then(|r| resolve(document, r))
        .and_then(|r| r.as_dict().ok())
    else {
        return Vec::new();
    };

    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve(document, x))
        .and_then(|x| x.as_dict().ok())
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, entry)| {
            let stream = resolve(document, entry)?.as_stream().ok()?;
            if name_of(document, &stream.dict, b"Subtype") != Some(b"Image".as_slice()) {
                return None;
            }
            let record = image_record(document, stream);
            if record.is_none() {
                warn!("Skipping unreadable image /{}", String::from_utf8_lossy(name));
            }
            record
        })
        .collect()
}

/// Read a name-valued entry, resolving indirect references.
fn name_of<'a>(document: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    let object = resolve(document, dict.get(key).ok()?)?;
    object.as_name().ok()
}

fn dimension(document: &Document, dict: &Dictionary, key: &[u8]) -> u32 {
    dict.get(key)
        .ok()
        .and_then(|o| resolve(document, o))
        .and_then(|o| o.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

/// The single filter name, if the stream has exactly one.
///
/// Filter chains are reported as `Other` so the decoder does not guess.
fn single_filter(document: &Document, dict: &Dictionary) -> Result<Option<Vec<u8>>, String> {
    let Some(filter) = dict.get(b"Filter").ok().and_then(|f| resolve(document, f)) else {
        return Ok(None);
    };
    match filter {
        Object::Name(name) => Ok(Some(name.clone())),
        Object::Array(items) if items.len() == 1 => match &items[0] {
            Object::Name(name) => Ok(Some(name.clone())),
            _ => Err("non-name filter".to_string()),
        },
        Object::Array(items) => Err(items
            .iter()
            .filter_map(|i| i.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .collect::<Vec<_>>()
            .join("+")),
        _ => Err("malformed filter".to_string()),
    }
}

fn color_space_of(document: &Document, dict: &Dictionary) -> ColorSpace {
    match dict.get(b"ColorSpace").ok().and_then(|c| resolve(document, c)) {
        Some(Object::Name(name)) => ColorSpace::from_name(name),
        _ => ColorSpace::Unknown,
    }
}

fn image_record(document: &Document, stream: &Stream) -> Option<RawImageRecord> {
    let dict = &stream.dict;
    let encoding = match single_filter(document, dict) {
        Ok(filter) => ImageEncoding::from_filter(filter.as_deref()),
        Err(chain) => ImageEncoding::Other(chain),
    };

    let bytes = match encoding {
        ImageEncoding::Raw => stream.decompressed_content().ok()?,
        _ => stream.content.clone(),
    };

    Some(RawImageRecord {
        width: dimension(document, dict, b"Width"),
        height: dimension(document, dict, b"Height"),
        color_space: color_space_of(document, dict),
        encoding,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::dictionary;

    fn compress(data: &[u8]) -> Vec<u8> {
        use flate2::write::ZlibEncoder;
        use std::io::Write;
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// One page with text and three image XObjects: Flate RGB, DCT, CCITT.
    fn sample_document() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let flate = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2i64,
                "Height" => 1i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
                "Filter" => "FlateDecode",
            },
            compress(&[255, 0, 0, 0, 0, 255]),
        ));
        let dct = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 4i64,
                "Height" => 4i64,
                "ColorSpace" => "DeviceCMYK",
                "Filter" => "DCTDecode",
            },
            vec![0xFF, 0xD8, 0xFF],
        ));
        let fax = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 8i64,
                "Height" => 8i64,
                "Filter" => "CCITTFaxDecode",
            },
            vec![0; 4],
        ));
        let form = doc.add_object(Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Form" },
            Vec::new(),
        ));

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Bonjour")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => dictionary! {
                    "Im1" => flate,
                    "Fm1" => form,
                    "Im2" => dct,
                    "Im3" => fax,
                },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn collects_images_in_resource_order() {
        let pages = extract_document(&sample_document());
        assert_eq!(pages.len(), 1);
        let images = &pages[0].images;
        assert_eq!(images.len(), 3, "form XObjects are not images");

        assert_eq!(images[0].encoding, ImageEncoding::Raw);
        assert_eq!(images[0].color_space, ColorSpace::Rgb);
        assert_eq!(images[0].bytes, vec![255, 0, 0, 0, 0, 255]);
        assert_eq!((images[0].width, images[0].height), (2, 1));

        assert_eq!(images[1].encoding, ImageEncoding::Dct);
        assert_eq!(images[1].color_space, ColorSpace::Cmyk);
        assert_eq!(images[1].bytes, vec![0xFF, 0xD8, 0xFF]);

        assert_eq!(images[2].encoding, ImageEncoding::Other("CCITTFaxDecode".into()));
        assert_eq!(images[2].color_space, ColorSpace::Unknown);
    }

    #[test]
    fn extracts_page_text() {
        let pages = extract_document(&sample_document());
        assert!(pages[0].text.contains("Bonjour"), "got: {:?}", pages[0].text);
        assert_eq!(pages[0].index, 0);
    }

    #[test]
    fn encoding_from_filter_names() {
        assert_eq!(
            ImageEncoding::from_filter(Some(b"JPXDecode".as_slice())),
            ImageEncoding::Jpx
        );
        assert_eq!(
            ImageEncoding::from_filter(None),
            ImageEncoding::Other("none".into())
        );
    }

    #[test]
    fn rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"hello world").unwrap();
        let err = extract_blocking(&path).unwrap_err();
        assert!(matches!(err, TranslateError::NotAPdf { .. }), "got: {err}");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = extract_blocking(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, TranslateError::FileNotFound { .. }));
    }

    #[test]
    fn truncated_pdf_yields_no_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.5\n1 0 obj\n<<").unwrap();
        match extract_blocking(&path) {
            Err(TranslateError::CorruptPdf { .. }) => {}
            Ok(pages) => assert!(pages.is_empty()),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
