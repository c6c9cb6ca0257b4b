// src/engine/decoder.rs
//
// Decoder operations: JPEG (mozjpeg), PNG (zune-png), Photoshop documents
// via their merged image, everything else via the image crate.

use crate::engine::common::run_with_panic_policy;
use crate::engine::layer_records::PSD_SIGNATURE;
use crate::engine::layered::psd_merged_image;
use crate::error::MockupError;
use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use mozjpeg::Decompress;
use zune_core::bytestream::ZCursor;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

use crate::engine::{MAX_DIMENSION, MAX_PIXELS};

type DecoderResult<T> = std::result::Result<T, MockupError>;

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo)
pub fn decode_jpeg_mozjpeg(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:mozjpeg", || {
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(MockupError::decode_failed(
                "mozjpeg: missing JPEG EOI marker",
            ));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            MockupError::decode_failed(format!("mozjpeg decompress init failed: {e:?}"))
        })?;

        let mut decompress = decompress.rgb().map_err(|e| {
            MockupError::decode_failed(format!("mozjpeg rgb conversion failed: {e:?}"))
        })?;

        let width = decompress.width();
        let height = decompress.height();
        if width > MAX_DIMENSION as usize || height > MAX_DIMENSION as usize {
            return Err(MockupError::dimension_exceeds_limit(
                width.max(height) as u32,
                MAX_DIMENSION,
            ));
        }
        let width = width as u32;
        let height = height as u32;
        check_dimensions(width, height)?;

        let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
            MockupError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
        })?;
        let flat_pixels: Vec<u8> = pixels.into_iter().flatten().collect();

        let rgb_image = RgbImage::from_raw(width, height, flat_pixels).ok_or_else(|| {
            MockupError::decode_failed("mozjpeg: failed to create image from raw data")
        })?;

        Ok(DynamicImage::ImageRgb8(rgb_image))
    })
}

/// Decode PNG using zune-png. 16-bit input is stripped to 8-bit.
pub fn decode_png_zune(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:png", || {
        let options = DecoderOptions::default().png_set_strip_to_8bit(true);
        let mut decoder = PngDecoder::new_with_options(ZCursor::new(data), options);
        let pixels = decoder
            .decode()
            .map_err(|e| MockupError::decode_failed(format!("png: decode failed: {e}")))?;

        let info = decoder
            .info()
            .ok_or_else(|| MockupError::decode_failed("png: missing header info"))?;
        let width = info.width as u32;
        let height = info.height as u32;
        check_dimensions(width, height)?;

        let buf = match pixels {
            zune_core::result::DecodingResult::U8(v) => v,
            _ => {
                return Err(MockupError::decode_failed(
                    "png: unexpected non-U8 pixel buffer",
                ))
            }
        };

        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| MockupError::decode_failed("png: missing colorspace"))?;

        let img = match colorspace {
            ColorSpace::RGB => RgbImage::from_raw(width, height, buf).map(DynamicImage::ImageRgb8),
            ColorSpace::RGBA => {
                RgbaImage::from_raw(width, height, buf).map(DynamicImage::ImageRgba8)
            }
            ColorSpace::Luma => {
                GrayImage::from_raw(width, height, buf).map(DynamicImage::ImageLuma8)
            }
            ColorSpace::LumaA => {
                GrayAlphaImage::from_raw(width, height, buf).map(DynamicImage::ImageLumaA8)
            }
            other => {
                return Err(MockupError::unsupported_format(format!(
                    "png colorspace {other:?}"
                )))
            }
        };

        img.ok_or_else(|| MockupError::decode_failed("png: pixel buffer does not match header"))
    })
}

/// Decode the remaining formats using the image crate.
pub fn decode_with_image_crate(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:image", || {
        let img = image::load_from_memory(data)
            .map_err(|e| MockupError::decode_failed(format!("decode failed: {e}")))?;
        check_dimensions(img.width(), img.height())?;
        Ok(img)
    })
}

/// Decode a Photoshop document as a flat bitmap: its merged image.
pub fn decode_psd_merged(data: &[u8]) -> DecoderResult<DynamicImage> {
    psd_merged_image(data).map_err(|err| match err {
        MockupError::LayeredDocument { message } => {
            MockupError::decode_failed(format!("psd: {message}"))
        }
        other => other,
    })
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Unified decode entrypoint:
/// - Detect format once (magic bytes)
/// - Route JPEG to mozjpeg, PNG to zune-png, PSD to its merged image,
///   others to the image crate
pub fn decode_image(bytes: &[u8]) -> DecoderResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(MockupError::decode_failed("empty image buffer"));
    }
    if bytes.starts_with(PSD_SIGNATURE) {
        return decode_psd_merged(bytes);
    }
    match detect_format(bytes) {
        Some(ImageFormat::Jpeg) => decode_jpeg_mozjpeg(bytes),
        Some(ImageFormat::Png) => decode_png_zune(bytes),
        _ => decode_with_image_crate(bytes),
    }
}

/// Check if image dimensions are within safe limits.
/// Returns an error if the image is too large (potential decompression bomb).
pub fn check_dimensions(width: u32, height: u32) -> DecoderResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(MockupError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(MockupError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, Rgba};
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([0, 0, 0]))),
            ImageFormat::Png,
        )
    }

    #[test]
    fn test_detect_format_jpeg_and_png() {
        let png = encode_png(2, 2);
        let jpeg = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]))),
            ImageFormat::Jpeg,
        );
        assert_eq!(detect_format(&png), Some(ImageFormat::Png));
        assert_eq!(detect_format(&jpeg), Some(ImageFormat::Jpeg));
        assert_eq!(detect_format(b"8BPS\x00\x01"), None);
    }

    #[test]
    fn test_decode_image_routes_png_to_zune() {
        let png = encode_png(3, 1);
        let img = decode_image(&png).unwrap();
        assert_eq!(img.dimensions(), (3, 1));
        assert_eq!(img.to_rgb8().get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_decode_png_keeps_alpha() {
        let png = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 40]))),
            ImageFormat::Png,
        );
        let img = decode_image(&png).unwrap();
        assert!(img.color().has_alpha());
        assert_eq!(img.to_rgba8().get_pixel(1, 1).0, [10, 20, 30, 40]);
    }

    #[test]
    fn test_decode_image_routes_jpeg_to_mozjpeg() {
        let jpeg = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([9, 8, 7]))),
            ImageFormat::Jpeg,
        );
        let img = decode_image(&jpeg).unwrap();
        assert_eq!(img.dimensions(), (2, 2));
        assert!(!img.color().has_alpha());
    }

    #[test]
    fn test_decode_image_reads_psd_merged_image() {
        let psd = include_bytes!("../../tests/data/rle-3-layer-8x8.psd");
        let img = decode_image(psd).unwrap();
        assert_eq!(img.dimensions(), (8, 8));
        assert_eq!(img.to_rgba8().get_pixel(4, 4).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_malformed_psd_is_decode_error() {
        let err = decode_image(b"8BPS").unwrap_err();
        assert!(matches!(err, MockupError::DecodeFailed { .. }));
        assert!(err.to_string().contains("psd"));
    }

    #[test]
    fn test_truncated_jpeg_is_rejected() {
        let jpeg = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([9, 8, 7]))),
            ImageFormat::Jpeg,
        );
        let truncated = &jpeg[..jpeg.len() / 2];
        assert!(decode_jpeg_mozjpeg(truncated).is_err());
    }

    #[test]
    fn test_garbage_and_empty_input_fail() {
        assert!(decode_image(b"definitely not an image").is_err());
        assert!(decode_image(&[]).is_err());
    }

    #[test]
    fn test_check_dimensions_limits() {
        assert!(check_dimensions(64, 64).is_ok());
        assert!(matches!(
            check_dimensions(MAX_DIMENSION + 1, 1),
            Err(MockupError::DimensionExceedsLimit { .. })
        ));
        assert!(matches!(
            check_dimensions(20_000, 20_000),
            Err(MockupError::PixelCountExceedsLimit { .. })
        ));
    }
}
