//! # Image Payloads
//!
//! Turns the encoded rasters stored in a [`FormRecord`](crate::model::FormRecord)
//! (evidence photos and signatures) into something the PDF writer can embed.
//!
//! JPEG passes through untouched and is embedded with DCTDecode. Everything
//! else (PNG from the signature pad, WebP from phone uploads) is decoded to
//! RGB with an optional alpha plane that becomes an SMask.
//!
//! Decoding is synchronous and happens during layout, before any page
//! content is emitted, so a bad payload can still be swapped for a
//! placeholder box.

use crate::error::RncError;

/// A decoded image ready for PDF embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Original JPEG stream.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// `width * height * 3` RGB bytes and, if any pixel is translucent,
    /// `width * height` alpha bytes.
    Decoded { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

impl JpegColorSpace {
    pub fn pdf_name(self) -> &'static str {
        match self {
            JpegColorSpace::DeviceRGB => "/DeviceRGB",
            JpegColorSpace::DeviceGray => "/DeviceGray",
        }
    }
}

/// Decode an image payload.
///
/// Accepted forms:
/// - `data:image/...;base64,...`
/// - a file path starting with `/`, `./` or `../`
/// - bare base64
pub fn load_image(src: &str) -> Result<LoadedImage, RncError> {
    let bytes = read_source_bytes(src.trim())?;
    decode_image_bytes(&bytes)
}

fn read_source_bytes(src: &str) -> Result<Vec<u8>, RncError> {
    if let Some(rest) = src.strip_prefix("data:") {
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| RncError::ImageDecode("data URI has no ',' separator".to_string()))?;
        if !header.ends_with(";base64") {
            return Err(RncError::ImageDecode(format!(
                "data URI is not base64 encoded ({header})"
            )));
        }
        return base64_decode(payload);
    }

    // Base64 contains '/', so only explicit path prefixes count as files.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src)
            .map_err(|e| RncError::ImageDecode(format!("failed to read '{}': {}", src, e)));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, RncError> {
    use base64::Engine;
    // Some encoders wrap long payloads.
    let compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| RncError::ImageDecode(format!("base64: {}", e)))
}

fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, RncError> {
    if data.len() < 4 {
        return Err(RncError::ImageDecode("image data too short".to_string()));
    }

    if is_jpeg(data) {
        decode_jpeg(data)
    } else if is_png(data) || is_webp(data) {
        decode_raster(data)
    } else {
        Err(RncError::ImageDecode(
            "unsupported image format (expected JPEG, PNG or WebP)".to_string(),
        ))
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xD8])
}

fn is_png(data: &[u8]) -> bool {
    data.starts_with(&[0x89, b'P', b'N', b'G'])
}

fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
}

fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, RncError> {
    // Full decode so truncated or corrupt scans are caught here, while a
    // placeholder can still be drawn. Only the original bytes are embedded.
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map_err(|e| RncError::ImageDecode(format!("JPEG decode failed: {}", e)))?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: jpeg_color_space(data),
        },
        width_px: img.width(),
        height_px: img.height(),
    })
}

/// Read the component count from the first SOF segment.
fn jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2;
    while i + 3 < data.len() && data[i] == 0xFF {
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            return if data[i + 9] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            };
        }
        let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + seg_len;
    }
    JpegColorSpace::DeviceRGB
}

fn decode_raster(data: &[u8]) -> Result<LoadedImage, RncError> {
    let img = image::load_from_memory(data)
        .map_err(|e| RncError::ImageDecode(format!("decode failed: {}", e)))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixel_count = (width as usize) * (height as usize);

    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }
    let translucent = alpha.iter().any(|&a| a != 255);

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: translucent.then_some(alpha),
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn png_bytes(pixel: [u8; 4]) -> Vec<u8> {
        let mut img = image::RgbaImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgba(pixel));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 1, 1, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    #[test]
    fn test_magic_bytes() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(is_webp(b"RIFF\0\0\0\0WEBPVP8 "));
        assert!(!is_webp(b"RIFF\0\0\0\0WAVE"));
    }

    #[test]
    fn test_data_uri_without_comma() {
        let err = load_image("data:image/png;base64").unwrap_err();
        assert!(matches!(err, RncError::ImageDecode(_)));
    }

    #[test]
    fn test_data_uri_must_be_base64() {
        assert!(load_image("data:image/svg+xml,<svg/>").is_err());
    }

    #[test]
    fn test_garbage_base64() {
        assert!(load_image("definitely not an image!").is_err());
    }

    #[test]
    fn test_unsupported_format() {
        let err = decode_image_bytes(b"GIF89a....").unwrap_err();
        assert!(err.to_string().contains("unsupported image format"));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_image("/nonexistent/evidence.jpg").is_err());
    }

    #[test]
    fn test_opaque_png_has_no_alpha() {
        let loaded = decode_image_bytes(&png_bytes([255, 0, 0, 255])).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (1, 1));
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert!(alpha.is_none());
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_signature_png_keeps_alpha() {
        let loaded = decode_image_bytes(&png_bytes([0, 0, 0, 0])).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { alpha, .. } => {
                assert_eq!(alpha.as_deref(), Some(&[0u8][..]));
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_jpeg_passes_through() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();

        let loaded = decode_image_bytes(&buf).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 2));
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert_eq!(data, &buf);
                assert_eq!(*color_space, JpegColorSpace::DeviceRGB);
            }
            _ => panic!("JPEG should stay as Jpeg variant"),
        }
    }

    #[test]
    fn test_truncated_jpeg_is_rejected() {
        let img = image::RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 37 % 256) as u8, (y * 91 % 256) as u8, ((x ^ y) * 13 % 256) as u8])
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 95);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 64, 64, image::ColorType::Rgb8)
            .unwrap();
        assert!(decode_image_bytes(&buf).is_ok());

        // Headers intact, scan cut short.
        buf.truncate(buf.len() * 2 / 3);
        let err = decode_image_bytes(&buf).unwrap_err();
        assert!(matches!(err, RncError::ImageDecode(_)));
    }

    #[test]
    fn test_data_uri_and_bare_base64() {
        let b64 = base64::engine::general_purpose::STANDARD.encode(png_bytes([0, 255, 0, 255]));
        assert!(load_image(&format!("data:image/png;base64,{}", b64)).is_ok());
        assert!(load_image(&b64).is_ok());
    }
}
