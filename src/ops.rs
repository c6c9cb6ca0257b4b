// src/ops.rs
//
// Placement vocabulary: where the artwork goes and how the result was made.

use crate::error::{MockupError, Result};
use serde::Serialize;
use std::fmt;

/// Processing path that produced a composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Artwork pasted into the first visible layer of a layered document
    Psd,
    /// Flat mockup, layered path never attempted
    Image,
    /// Layered path attempted but produced no usable target
    Fallback,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Psd => "psd",
            Method::Image => "image",
            Method::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target rectangle on the base canvas.
///
/// `x`/`y` are signed because layer bounds may start off-canvas.
/// `width` and `height` are never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Build a region from `(left, top, right, bottom)` pixel bounds.
    pub fn from_bounds(left: i32, top: i32, right: i32, bottom: i32) -> Result<Self> {
        let width = right as i64 - left as i64;
        let height = bottom as i64 - top as i64;
        if width <= 0 || height <= 0 {
            return Err(MockupError::region_degenerate(width, height));
        }
        Ok(Self {
            x: left,
            y: top,
            // Both are bounded by the i32 span of the bounds
            width: width as u32,
            height: height as u32,
        })
    }

    /// `percent` of the canvas in each dimension (floored), centered with
    /// floor division.
    pub fn centered(canvas_width: u32, canvas_height: u32, percent: u32) -> Result<Self> {
        let width = (canvas_width as u64 * percent as u64 / 100) as u32;
        let height = (canvas_height as u64 * percent as u64 / 100) as u32;
        if width == 0 || height == 0 {
            return Err(MockupError::region_degenerate(width as i64, height as i64));
        }
        Ok(Self {
            x: ((canvas_width - width) / 2) as i32,
            y: ((canvas_height - height) / 2) as i32,
            width,
            height,
        })
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// Final JPEG settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JpegOutput {
    pub quality: u8,
    pub dpi: u16,
}

impl Default for JpegOutput {
    fn default() -> Self {
        Self {
            quality: 90,
            dpi: 300,
        }
    }
}
