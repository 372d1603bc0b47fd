//! Byte-level decoding, downscaling, and encoding.
//!
//! Format acceptance is decided here by sniffing the magic bytes; declared
//! MIME types are advisory and checked by the engine before the bytes ever
//! reach this module. Only JPEG and PNG sources are let through.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};

use crate::error::EngineError;

/// Sniffs and decodes source bytes into an RGB buffer.
///
/// The detected format is authoritative regardless of any file name or
/// declared type the bytes arrived with. Alpha channels are dropped during
/// the RGB conversion.
pub fn decode_source(bytes: &[u8]) -> Result<RgbImage, EngineError> {
    let format = image::guess_format(bytes).map_err(|_| EngineError::UnsupportedFormat {
        detected: "unknown".to_string(),
    })?;
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
        return Err(EngineError::UnsupportedFormat {
            detected: format.to_mime_type().to_string(),
        });
    }
    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(EngineError::Decode)?;
    Ok(decoded.to_rgb8())
}

/// Shrinks the image so its longer side is at most `max_dimension`.
///
/// Aspect ratio is preserved with rounded dimensions and Lanczos3 resampling.
/// Images already inside the bound pass through untouched, as does everything
/// when `max_dimension` is 0.
pub fn downscale_to_fit(image: RgbImage, max_dimension: u32) -> RgbImage {
    if max_dimension == 0 {
        return image;
    }
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= max_dimension {
        return image;
    }

    let ratio = max_dimension as f32 / longest as f32;
    let new_width = ((width as f32 * ratio).round() as u32).max(1);
    let new_height = ((height as f32 * ratio).round() as u32).max(1);
    imageops::resize(&image, new_width, new_height, FilterType::Lanczos3)
}

/// Encodes the image as JPEG at the given quality (1-100).
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, EngineError> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    image.write_with_encoder(encoder).map_err(EngineError::Encode)?;
    Ok(bytes)
}

/// Encodes the image as PNG.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, EngineError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(EngineError::Encode)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn checker(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([200, 60, 220])
            } else {
                Rgb([20, 20, 40])
            }
        })
    }

    fn encoded(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn downscale_matches_known_ratios() {
        let shrunk = downscale_to_fit(RgbImage::new(3000, 2000), 1280);
        assert_eq!(shrunk.dimensions(), (1280, 853));

        let shrunk = downscale_to_fit(RgbImage::new(1600, 900), 1280);
        assert_eq!(shrunk.dimensions(), (1280, 720));

        // Portrait orientation bounds the height instead
        let shrunk = downscale_to_fit(RgbImage::new(900, 1600), 1280);
        assert_eq!(shrunk.dimensions(), (720, 1280));
    }

    #[test]
    fn downscale_leaves_small_images_alone() {
        let source = checker(800, 600);
        let untouched = downscale_to_fit(source.clone(), 1280);
        assert_eq!(untouched, source);
    }

    #[test]
    fn downscale_zero_bound_means_no_limit() {
        let source = checker(100, 50);
        assert_eq!(downscale_to_fit(source.clone(), 0), source);
    }

    #[test]
    fn decode_rejects_unrecognized_bytes() {
        let err = decode_source(b"definitely not an image").unwrap_err();
        match err {
            EngineError::UnsupportedFormat { detected } => assert_eq!(detected, "unknown"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_bmp_sources() {
        let bytes = encoded(&checker(4, 4), ImageFormat::Bmp);
        let err = decode_source(&bytes).unwrap_err();
        match err {
            EngineError::UnsupportedFormat { detected } => assert_eq!(detected, "image/bmp"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_gif_sources() {
        let bytes = encoded(&checker(4, 4), ImageFormat::Gif);
        let err = decode_source(&bytes).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat { detected } if detected == "image/gif"));
    }

    #[test]
    fn decode_reports_corrupt_supported_bytes_as_decode_errors() {
        let mut bytes = encoded(&checker(16, 16), ImageFormat::Jpeg);
        bytes.truncate(24);
        let err = decode_source(&bytes).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn jpeg_round_trip_keeps_dimensions() {
        let bytes = encode_jpeg(&checker(10, 12), 75).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8], "missing JPEG magic");
        let decoded = decode_source(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (10, 12));
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let source = checker(9, 7);
        let bytes = encode_png(&source).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G'], "missing PNG magic");
        assert_eq!(decode_source(&bytes).unwrap(), source);
    }
}
