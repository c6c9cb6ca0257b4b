// src/engine/composite.rs
//
// Paste a fitted overlay onto a base canvas.

use image::{DynamicImage, ImageBuffer, Pixel, RgbaImage};
use std::borrow::Cow;

/// Paste `overlay` onto `base` with its top-left corner at `offset`.
///
/// An overlay with an alpha channel is pasted through its own alpha as
/// mask: every base channel, alpha included, moves towards the overlay by
/// the overlay alpha. An overlay without alpha replaces the covered pixels.
/// Anything outside the canvas is clipped.
///
/// Borrowed bases are cloned; owned bases are painted in place.
pub fn composite(
    base: Cow<'_, DynamicImage>,
    overlay: &DynamicImage,
    offset: (i32, i32),
) -> DynamicImage {
    let masked = overlay.color().has_alpha();
    let overlay = overlay.to_rgba8();

    match base.into_owned() {
        DynamicImage::ImageRgb8(mut canvas) => {
            paste(&mut canvas, &overlay, offset, masked);
            DynamicImage::ImageRgb8(canvas)
        }
        DynamicImage::ImageRgba8(mut canvas) => {
            paste(&mut canvas, &overlay, offset, masked);
            DynamicImage::ImageRgba8(canvas)
        }
        other if other.color().has_alpha() => {
            let mut canvas = other.to_rgba8();
            paste(&mut canvas, &overlay, offset, masked);
            DynamicImage::ImageRgba8(canvas)
        }
        other => {
            let mut canvas = other.to_rgb8();
            paste(&mut canvas, &overlay, offset, masked);
            DynamicImage::ImageRgb8(canvas)
        }
    }
}

/// Intersection of the overlay with the canvas as
/// `(canvas_x, canvas_y, overlay_x, overlay_y, width, height)`.
fn clip(
    canvas: (u32, u32),
    overlay: (u32, u32),
    offset: (i32, i32),
) -> Option<(u32, u32, u32, u32, u32, u32)> {
    let (ox, oy) = (offset.0 as i64, offset.1 as i64);
    let left = ox.max(0);
    let top = oy.max(0);
    let right = (ox + overlay.0 as i64).min(canvas.0 as i64);
    let bottom = (oy + overlay.1 as i64).min(canvas.1 as i64);
    if right <= left || bottom <= top {
        return None;
    }
    Some((
        left as u32,
        top as u32,
        (left - ox) as u32,
        (top - oy) as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

fn paste<P>(
    canvas: &mut ImageBuffer<P, Vec<u8>>,
    overlay: &RgbaImage,
    offset: (i32, i32),
    masked: bool,
) where
    P: Pixel<Subpixel = u8>,
{
    let Some((cx, cy, sx, sy, w, h)) = clip(canvas.dimensions(), overlay.dimensions(), offset)
    else {
        return;
    };

    for dy in 0..h {
        for dx in 0..w {
            let src = overlay.get_pixel(sx + dx, sy + dy).0;
            let dst = canvas.get_pixel_mut(cx + dx, cy + dy).channels_mut();
            let mask = if masked { src[3] } else { 255 };
            match mask {
                0 => {}
                255 => {
                    for (c, value) in dst.iter_mut().enumerate() {
                        *value = src[c.min(3)];
                    }
                }
                m => {
                    for (c, value) in dst.iter_mut().enumerate() {
                        *value = blend(*value, src[c.min(3)], m);
                    }
                }
            }
        }
    }
}

#[inline]
fn blend(dst: u8, src: u8, mask: u8) -> u8 {
    let m = mask as u32;
    ((src as u32 * m + dst as u32 * (255 - m) + 127) / 255) as u8
}
