use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use mockup_compositor::engine::{composite, encode_jpeg, encode_payload, fit};
use mockup_compositor::{process_request, ComposeConfig, JpegOutput, Region};
use std::borrow::Cow;
use std::hint::black_box;
use std::io::Cursor;

fn artwork(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 96, 255 - (x % 128) as u8])
    }))
}

fn mockup(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([235, 235, 235])))
}

fn png_b64(img: &DynamicImage) -> String {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    encode_payload(&buf)
}

fn bench_fit(c: &mut Criterion) {
    let src = artwork(1600, 1200);
    let mut group = c.benchmark_group("fit");
    for (w, h) in [(280, 210), (700, 700), (1400, 500)] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{w}x{h}")),
            &(w, h),
            |b, &(w, h)| b.iter(|| fit(black_box(&src), w, h).unwrap()),
        );
    }
    group.finish();
}

fn bench_composite_and_encode(c: &mut Criterion) {
    let base = mockup(2000, 1500);
    let region = Region::centered(2000, 1500, 70).unwrap();
    let fitted = fit(&artwork(800, 800), region.width, region.height).unwrap();

    c.bench_function("composite 1400x1050 onto 2000x1500", |b| {
        b.iter(|| composite(Cow::Borrowed(black_box(&base)), &fitted, region.offset()))
    });

    let composed = composite(Cow::Borrowed(&base), &fitted, region.offset());
    c.bench_function("encode_jpeg 2000x1500", |b| {
        b.iter(|| encode_jpeg(black_box(&composed), JpegOutput::default()).unwrap())
    });
}

fn bench_request(c: &mut Criterion) {
    let request = serde_json::json!({
        "mockup": png_b64(&mockup(1000, 800)),
        "artwork": png_b64(&artwork(600, 400)),
        "filename": "mockup.png",
    })
    .to_string();

    c.bench_function("process_request flat 1000x800", |b| {
        b.iter(|| process_request(black_box(&request), ComposeConfig::default()))
    });
}

criterion_group!(benches, bench_fit, bench_composite_and_encode, bench_request);
criterion_main!(benches);
