#![no_main]

use arbitrary::Arbitrary;
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};
use libfuzzer_sys::fuzz_target;
use mockup_compositor::engine::{composite, fit};
use std::borrow::Cow;

#[derive(Arbitrary, Debug)]
struct Placement {
    base_w: u8,
    base_h: u8,
    art_w: u8,
    art_h: u8,
    x: i16,
    y: i16,
    target_w: u16,
    target_h: u16,
    pixels: Vec<u8>,
}

fn build_artwork(p: &Placement) -> DynamicImage {
    let (w, h) = (p.art_w as u32 % 64 + 1, p.art_h as u32 % 64 + 1);
    let mut buffer = vec![0u8; (w * h * 4) as usize];
    if !p.pixels.is_empty() {
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = p.pixels[i % p.pixels.len()];
        }
    }
    RgbaImage::from_raw(w, h, buffer)
        .map(DynamicImage::ImageRgba8)
        .unwrap_or_else(|| DynamicImage::new_rgba8(1, 1))
}

fuzz_target!(|p: Placement| {
    let base = DynamicImage::ImageRgb8(RgbImage::new(
        p.base_w as u32 % 128 + 1,
        p.base_h as u32 % 128 + 1,
    ));
    let artwork = build_artwork(&p);
    let (tw, th) = (p.target_w as u32 % 512 + 1, p.target_h as u32 % 512 + 1);

    let fitted = fit(&artwork, tw, th).expect("fit to a positive size never fails");
    assert_eq!(fitted.dimensions(), (tw, th));

    let out = composite(Cow::Borrowed(&base), &fitted, (p.x as i32, p.y as i32));
    assert_eq!(out.dimensions(), base.dimensions());
});
