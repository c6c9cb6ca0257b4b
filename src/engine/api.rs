// src/engine/api.rs
//
// Dispatcher: picks the layered or the fallback path, fits and composites
// the artwork, encodes the result.

use crate::config::ComposeConfig;
use crate::engine::composite::composite;
use crate::engine::deadline::Deadline;
use crate::engine::decoder::decode_image;
use crate::engine::encoder::encode_jpeg;
use crate::engine::io::decode_payload;
use crate::engine::layered::{inspect, LayeredFormat, PsdFormat};
use crate::engine::pipeline::fit;
use crate::error::Result;
use crate::ops::{Method, Region};
use image::DynamicImage;
use std::borrow::Cow;
use tracing::info;

/// Encoded composition plus the metadata reported to the caller.
#[derive(Clone, Debug)]
pub struct Composition {
    pub jpeg: Vec<u8>,
    pub method: Method,
    pub width: u32,
    pub height: u32,
}

pub struct Dispatcher<F = PsdFormat> {
    config: ComposeConfig,
    format: F,
}

impl Dispatcher<PsdFormat> {
    pub fn new(config: ComposeConfig) -> Self {
        Self::with_format(config, PsdFormat)
    }
}

impl<F: LayeredFormat> Dispatcher<F> {
    pub fn with_format(config: ComposeConfig, format: F) -> Self {
        Self { config, format }
    }

    /// Decode both base64 payloads and compose them.
    pub fn compose_encoded(
        &self,
        mockup: &str,
        artwork: &str,
        filename: Option<&str>,
    ) -> Result<Composition> {
        let deadline = Deadline::start(self.config.timeout);
        let mockup = decode_payload("mockup", mockup)?;
        let artwork = decode_payload("artwork", artwork)?;
        deadline.enforce("payload")?;
        self.run(&mockup, &artwork, filename, deadline)
    }

    /// Compose raw mockup and artwork bytes. `filename` only selects the
    /// processing path; `None` means the configured default.
    pub fn compose(
        &self,
        mockup: &[u8],
        artwork: &[u8],
        filename: Option<&str>,
    ) -> Result<Composition> {
        self.run(mockup, artwork, filename, Deadline::start(self.config.timeout))
    }

    fn run(
        &self,
        mockup: &[u8],
        artwork: &[u8],
        filename: Option<&str>,
        deadline: Deadline,
    ) -> Result<Composition> {
        let filename = filename.unwrap_or(self.config.default_filename);

        let artwork = decode_image(artwork)?;
        info!(
            width = artwork.width(),
            height = artwork.height(),
            color = ?artwork.color(),
            "artwork loaded"
        );
        deadline.enforce("decode")?;

        let layered_attempted = self.config.is_layered_filename(filename);
        let layered = if layered_attempted {
            let found = inspect(&self.format, mockup);
            deadline.enforce("inspect")?;
            found
        } else {
            None
        };

        let (composed, method) = match layered {
            Some((base, region)) => (self.place(base, &artwork, region, &deadline)?, Method::Psd),
            None => {
                let method = if layered_attempted {
                    Method::Fallback
                } else {
                    Method::Image
                };
                (self.place_centered(mockup, &artwork, &deadline)?, method)
            }
        };

        let jpeg = encode_jpeg(&composed, self.config.jpeg)?;
        let elapsed = deadline.disarm("encode")?;
        info!(
            %method,
            width = composed.width(),
            height = composed.height(),
            elapsed_ms = elapsed.as_millis() as u64,
            "composition finished"
        );

        Ok(Composition {
            jpeg,
            method,
            width: composed.width(),
            height: composed.height(),
        })
    }

    /// Flat mockup: artwork covers the centered fallback region. A layered
    /// mockup is taken as its merged image.
    fn place_centered(
        &self,
        mockup: &[u8],
        artwork: &DynamicImage,
        deadline: &Deadline,
    ) -> Result<DynamicImage> {
        let mockup = decode_image(mockup)?;
        let base = DynamicImage::ImageRgb8(mockup.to_rgb8());
        let artwork = DynamicImage::ImageRgba8(artwork.to_rgba8());
        deadline.enforce("decode")?;

        let region = Region::centered(
            base.width(),
            base.height(),
            self.config.fallback_ratio_percent,
        )?;
        self.place(base, &artwork, region, deadline)
    }

    fn place(
        &self,
        base: DynamicImage,
        artwork: &DynamicImage,
        region: Region,
        deadline: &Deadline,
    ) -> Result<DynamicImage> {
        let fitted = fit(artwork, region.width, region.height)?;
        deadline.enforce("fit")?;
        info!(
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            "placing artwork"
        );
        let composed = composite(Cow::Owned(base), &fitted, region.offset());
        deadline.enforce("composite")?;
        Ok(composed)
    }
}
