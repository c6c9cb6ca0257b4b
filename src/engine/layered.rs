// src/engine/layered.rs
//
// Layered-document inspection: open a layered mockup, pick the target
// layer, take the flattened document as the base canvas.
//
// The document library sits behind `LayeredFormat` / `LayeredDocument`;
// `PsdFormat` is the shipped backend.

use crate::engine::common::run_with_panic_policy;
use crate::engine::decoder::check_dimensions;
use crate::engine::layer_records::{layer_listing, read_layer_records};
use crate::error::MockupError;
use crate::ops::Region;
use image::{DynamicImage, RgbaImage};
use psd::Psd;
use tracing::{error, info, warn};

type LayeredResult<T> = std::result::Result<T, MockupError>;

/// Read-only snapshot of one layer's placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerInfo {
    pub name: String,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub visible: bool,
}

pub trait LayeredDocument {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Every layer in document order (bottom-most first), nested groups
    /// flattened depth-first with each group ahead of its children.
    fn layers(&self) -> Vec<LayerInfo>;
    /// Composite of all visible layers at document size.
    fn flatten(&self) -> LayeredResult<DynamicImage>;
}

pub trait LayeredFormat {
    type Document: LayeredDocument;

    fn open(&self, bytes: &[u8]) -> LayeredResult<Self::Document>;
}

/// First visible layer in document order.
pub fn select_target_layer(layers: &[LayerInfo]) -> Option<&LayerInfo> {
    layers.iter().find(|layer| layer.visible)
}

/// Inspect `bytes` as a layered document.
///
/// Returns the flattened base canvas and the target region, or `None` when
/// the document cannot be used. Failures are logged, never returned.
pub fn inspect<F: LayeredFormat>(format: &F, bytes: &[u8]) -> Option<(DynamicImage, Region)> {
    match try_inspect(format, bytes) {
        Ok(found) => found,
        Err(err) => {
            error!(error = %err, "layered document processing failed");
            None
        }
    }
}

fn try_inspect<F: LayeredFormat>(
    format: &F,
    bytes: &[u8],
) -> LayeredResult<Option<(DynamicImage, Region)>> {
    let document = format.open(bytes)?;
    let layers = document.layers();
    info!(
        width = document.width(),
        height = document.height(),
        layers = layers.len(),
        "layered document opened"
    );

    let Some(target) = select_target_layer(&layers) else {
        info!("no visible layer to place artwork into");
        return Ok(None);
    };

    let region = match Region::from_bounds(target.left, target.top, target.right, target.bottom) {
        Ok(region) => region,
        Err(err) => {
            warn!(layer = %target.name, error = %err, "target layer has no usable area");
            return Ok(None);
        }
    };
    info!(
        layer = %target.name,
        x = region.x,
        y = region.y,
        width = region.width,
        height = region.height,
        "target layer selected"
    );

    let base = document.flatten()?;
    Ok(Some((base, region)))
}

/// Photoshop documents. Pixel data comes from the `psd` crate; the layer
/// tree is read from the layer records directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct PsdFormat;

pub struct PsdDocument {
    psd: Psd,
    layers: Vec<LayerInfo>,
}

impl LayeredFormat for PsdFormat {
    type Document = PsdDocument;

    fn open(&self, bytes: &[u8]) -> LayeredResult<PsdDocument> {
        let psd = parse_psd(bytes)?;
        let layers = layer_listing(read_layer_records(bytes)?);
        Ok(PsdDocument { psd, layers })
    }
}

impl LayeredDocument for PsdDocument {
    fn width(&self) -> u32 {
        self.psd.width()
    }

    fn height(&self) -> u32 {
        self.psd.height()
    }

    fn layers(&self) -> Vec<LayerInfo> {
        self.layers.clone()
    }

    fn flatten(&self) -> LayeredResult<DynamicImage> {
        merged_image(&self.psd)
    }
}

fn parse_psd(bytes: &[u8]) -> LayeredResult<Psd> {
    let psd = run_with_panic_policy("layered:open", || {
        Psd::from_bytes(bytes).map_err(|e| MockupError::layered_document(e.to_string()))
    })?;
    check_dimensions(psd.width(), psd.height())?;
    Ok(psd)
}

/// The merged image Photoshop stores with the document: every visible layer
/// composited, hidden layers and groups left out.
fn merged_image(psd: &Psd) -> LayeredResult<DynamicImage> {
    let pixels = run_with_panic_policy("layered:flatten", || Ok(psd.rgba()))?;
    RgbaImage::from_raw(psd.width(), psd.height(), pixels)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| MockupError::layered_document("merged pixels do not match document size"))
}

/// Merged image of a Photoshop document, without reading its layers.
pub fn psd_merged_image(bytes: &[u8]) -> LayeredResult<DynamicImage> {
    merged_image(&parse_psd(bytes)?)
}
