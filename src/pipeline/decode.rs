//! Image decoding: embedded image record → canonical in-memory bitmap.
//!
//! Decoding is best-effort. A record that cannot be turned into pixels is
//! simply "no image" for the composer, so every failure is reported as a
//! [`DecodeError`] value and never escalates past the caller.
//!
//! ## Dispatch
//!
//! | Encoding | Handling |
//! |----------|----------|
//! | `Raw` (FlateDecode) | bytes are a dense 8-bit buffer, 3 or 4 channels |
//! | `Dct` / `Jpx` | handed to the `image` crate, which sniffs the format |
//! | anything else | not attempted |

use crate::pipeline::extract::{ColorSpace, ImageEncoding, RawImageRecord};
use image::{DynamicImage, RgbImage};
use thiserror::Error;

/// A successfully decoded embedded image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: DynamicImage,
}

/// Why an embedded image could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported image encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("image has no usable dimensions ({width}x{height})")]
    MissingDimensions { width: u32, height: u32 },

    #[error("raw pixel buffer too short: {actual} bytes, expected {expected}")]
    ShortBuffer { expected: usize, actual: usize },

    #[error("codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// Pixel layout used to interpret a raw buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelMode {
    Rgb,
    Cmyk,
}

impl PixelMode {
    fn channels(self) -> usize {
        match self {
            PixelMode::Rgb => 3,
            PixelMode::Cmyk => 4,
        }
    }
}

impl From<ColorSpace> for PixelMode {
    fn from(cs: ColorSpace) -> Self {
        match cs {
            ColorSpace::Cmyk => PixelMode::Cmyk,
            // Unknown colour spaces are read as RGB.
            ColorSpace::Rgb | ColorSpace::Unknown => PixelMode::Rgb,
        }
    }
}

/// Decode an embedded image record.
pub fn decode(record: &RawImageRecord) -> Result<DecodedImage, DecodeError> {
    match &record.encoding {
        ImageEncoding::Raw => decode_raw(record),
        ImageEncoding::Dct | ImageEncoding::Jpx => {
            let pixels = image::load_from_memory(&record.bytes)?;
            Ok(DecodedImage {
                width: pixels.width(),
                height: pixels.height(),
                pixels,
            })
        }
        ImageEncoding::Other(name) => Err(DecodeError::UnsupportedEncoding(name.clone())),
    }
}

fn decode_raw(record: &RawImageRecord) -> Result<DecodedImage, DecodeError> {
    let (width, height) = (record.width, record.height);
    if width == 0 || height == 0 {
        return Err(DecodeError::MissingDimensions { width, height });
    }

    let mode = PixelMode::from(record.color_space);
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(mode.channels()))
        .ok_or(DecodeError::MissingDimensions { width, height })?;
    if record.bytes.len() < expected {
        return Err(DecodeError::ShortBuffer {
            expected,
            actual: record.bytes.len(),
        });
    }

    let data = &record.bytes[..expected];
    let rgb = match mode {
        PixelMode::Rgb => data.to_vec(),
        PixelMode::Cmyk => cmyk_to_rgb(data),
    };

    let buffer = RgbImage::from_raw(width, height, rgb).ok_or(DecodeError::ShortBuffer {
        expected,
        actual: record.bytes.len(),
    })?;

    Ok(DecodedImage {
        width,
        height,
        pixels: DynamicImage::ImageRgb8(buffer),
    })
}

/// Naive CMYK → RGB conversion without colour management.
fn cmyk_to_rgb(data: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(data.len() / 4 * 3);
    for px in data.chunks_exact(4) {
        let k = 1.0 - px[3] as f32 / 255.0;
        for &ink in &px[..3] {
            let v = (1.0 - ink as f32 / 255.0) * k * 255.0;
            rgb.push(v.round() as u8);
        }
    }
    rgb
}
