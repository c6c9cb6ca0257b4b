// src/engine/encoder.rs
//
// Final output: opaque RGB, JPEG via mozjpeg, JFIF pixel density.

use crate::engine::common::run_with_panic_policy;
use crate::error::MockupError;
use crate::ops::JpegOutput;
use image::{DynamicImage, RgbImage};
use img_parts::jpeg::{markers::APP0, Jpeg, JpegSegment};
use img_parts::Bytes;
use mozjpeg::{ColorSpace, Compress};
use std::borrow::Cow;

use crate::engine::MAX_DIMENSION;

type EncoderResult<T> = std::result::Result<T, MockupError>;

const JFIF_IDENTIFIER: &[u8; 5] = b"JFIF\0";
const JFIF_UNITS_DPI: u8 = 1;

/// Coerce to opaque 8-bit RGB. Transparent pixels are laid over white.
pub fn flatten_to_rgb(img: &DynamicImage) -> Cow<'_, RgbImage> {
    match img {
        DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb),
        other if other.color().has_alpha() => {
            let rgba = other.to_rgba8();
            let (w, h) = rgba.dimensions();
            Cow::Owned(RgbImage::from_fn(w, h, |x, y| {
                let [r, g, b, a] = rgba.get_pixel(x, y).0;
                let over_white = |c: u8| -> u8 {
                    let a = a as u32;
                    ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8
                };
                image::Rgb([over_white(r), over_white(g), over_white(b)])
            }))
        }
        other => Cow::Owned(other.to_rgb8()),
    }
}

/// Encode to baseline JPEG with optimized Huffman tables and the requested
/// DPI in the JFIF header.
pub fn encode_jpeg(img: &DynamicImage, settings: JpegOutput) -> EncoderResult<Vec<u8>> {
    let rgb = flatten_to_rgb(img);
    let encoded = encode_rgb_mozjpeg(&rgb, settings.quality)?;
    embed_density_jpeg(encoded, settings.dpi)
}

fn encode_rgb_mozjpeg(rgb: &RgbImage, quality: u8) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:jpeg", || {
        let quality = quality.min(100);
        let (w, h) = rgb.dimensions();
        let pixels: &[u8] = rgb.as_raw();

        if w == 0 || h == 0 {
            return Err(MockupError::encode_failed(
                "jpeg",
                "width or height is zero",
            ));
        }
        if w > MAX_DIMENSION || h > MAX_DIMENSION {
            return Err(MockupError::dimension_exceeds_limit(
                w.max(h),
                MAX_DIMENSION,
            ));
        }

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(w as usize, h as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(quality as f32);
        comp.set_optimize_coding(true);

        let mut output = Vec::with_capacity((w as usize * h as usize * 3 / 10).max(4096));
        {
            let mut writer = comp.start_compress(&mut output).map_err(|e| {
                MockupError::encode_failed(
                    "jpeg",
                    format!("mozjpeg: failed to start compress: {e:?}"),
                )
            })?;

            let stride = w as usize * 3;
            for row in pixels.chunks(stride) {
                writer.write_scanlines(row).map_err(|e| {
                    MockupError::encode_failed(
                        "jpeg",
                        format!("mozjpeg: failed to write scanlines: {e:?}"),
                    )
                })?;
            }

            writer.finish().map_err(|e| {
                MockupError::encode_failed("jpeg", format!("mozjpeg: failed to finish: {e:?}"))
            })?;
        }

        Ok(output)
    })
}

fn jfif_segment_contents(dpi: u16) -> Vec<u8> {
    let mut contents = Vec::with_capacity(14);
    contents.extend_from_slice(JFIF_IDENTIFIER);
    contents.extend_from_slice(&[1, 1]); // version 1.01
    contents.push(JFIF_UNITS_DPI);
    contents.extend_from_slice(&dpi.to_be_bytes());
    contents.extend_from_slice(&dpi.to_be_bytes());
    contents.extend_from_slice(&[0, 0]); // no thumbnail
    contents
}

/// Replace (or insert) the JFIF APP0 segment so it carries `dpi` x `dpi`.
pub fn embed_density_jpeg(jpeg_data: Vec<u8>, dpi: u16) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:jpeg:density", || {
        let mut jpeg = Jpeg::from_bytes(Bytes::from(jpeg_data)).map_err(|e| {
            MockupError::encode_failed("jpeg", format!("failed to parse JPEG for density: {e}"))
        })?;

        let segment = JpegSegment::new_with_contents(APP0, Bytes::from(jfif_segment_contents(dpi)));
        let segments = jpeg.segments_mut();
        match segments
            .iter()
            .position(|s| s.marker() == APP0 && s.contents().starts_with(JFIF_IDENTIFIER))
        {
            Some(index) => segments[index] = segment,
            None => segments.insert(0, segment),
        }

        let mut output = Vec::new();
        jpeg.encoder().write_to(&mut output).map_err(|e| {
            MockupError::encode_failed("jpeg", format!("failed to write JPEG with density: {e}"))
        })?;

        Ok(output)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbaImage, Rgba};

    /// JFIF APP0 layout right after SOI: FFE0, length, "JFIF\0", version,
    /// units, x density, y density.
    fn jfif_density(jpeg: &[u8]) -> (u8, u16, u16) {
        assert_eq!(&jpeg[0..4], &[0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(&jpeg[6..11], JFIF_IDENTIFIER);
        let units = jpeg[13];
        let x = u16::from_be_bytes([jpeg[14], jpeg[15]]);
        let y = u16::from_be_bytes([jpeg[16], jpeg[17]]);
        (units, x, y)
    }

    #[test]
    fn encode_jpeg_roundtrips_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([200, 10, 10])));
        let jpeg = encode_jpeg(&img, JpegOutput::default()).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
    }

    #[test]
    fn encode_jpeg_writes_300_dpi() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])));
        let jpeg = encode_jpeg(&img, JpegOutput::default()).unwrap();
        assert_eq!(jfif_density(&jpeg), (1, 300, 300));
    }

    #[test]
    fn embed_density_inserts_missing_jfif() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([1, 2, 3])));
        let jpeg = encode_jpeg(&img, JpegOutput { quality: 90, dpi: 72 }).unwrap();
        let mut parsed = Jpeg::from_bytes(Bytes::from(jpeg)).unwrap();
        parsed.segments_mut().retain(|s| s.marker() != APP0);
        let mut stripped = Vec::new();
        parsed.encoder().write_to(&mut stripped).unwrap();

        let restored = embed_density_jpeg(stripped, 150).unwrap();
        assert_eq!(jfif_density(&restored), (1, 150, 150));
    }

    #[test]
    fn flatten_lays_transparency_over_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([0, 0, 0, 255])
            }
        }));
        let rgb = flatten_to_rgb(&img);
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn flatten_borrows_rgb_input() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([5, 6, 7])));
        assert!(matches!(flatten_to_rgb(&img), Cow::Borrowed(_)));
    }

    #[test]
    fn encode_rejects_garbage_for_density() {
        assert!(embed_density_jpeg(b"not a jpeg".to_vec(), 300).is_err());
    }
}
