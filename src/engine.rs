// src/engine.rs
//
// The compositing core. A request flows through:
// 1. payload decoding (base64, then image or layered document)
// 2. target region selection (layer bounds or the centered fallback)
// 3. crop-to-fill fitting and masked paste
// 4. JPEG encoding with the output density
//
// This file is a facade over the modules in engine/.

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Larger inputs are rejected before any pixel buffer is allocated.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod api;
mod common;
mod composite;
mod deadline;
mod decoder;
mod encoder;
mod io;
mod layer_records;
mod layered;
mod pipeline;

pub use api::{Composition, Dispatcher};
pub use common::run_with_panic_policy;
pub use composite::composite;
pub use deadline::Deadline;
pub use decoder::{check_dimensions, decode_image, detect_format};
pub use encoder::{embed_density_jpeg, encode_jpeg, flatten_to_rgb};
pub use io::{decode_payload, encode_payload, strip_data_uri};
pub use layer_records::{layer_listing, read_layer_records, LayerRecord, Section};
pub use layered::{
    inspect, select_target_layer, LayerInfo, LayeredDocument, LayeredFormat, PsdDocument,
    PsdFormat,
};
pub use pipeline::{calc_fill_crop, fit, CropWindow};
