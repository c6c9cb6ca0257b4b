// src/error.rs
//
// Unified error handling for mockup-compositor
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - UserError: Invalid request or payload, recoverable
// - CodecError: Decode/resize/encode issues
// - ResourceLimit: Dimension and time limits
// - InternalBug: Library bugs (should not happen)

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy shared by the library and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid input, recoverable by the caller
    UserError,
    /// Format/encoding issues
    CodecError,
    /// Dimension/time limits
    ResourceLimit,
    /// Library bugs (should not happen)
    InternalBug,
}

/// mockup-compositor error types
#[derive(Debug, Error)]
pub enum MockupError {
    // Request Errors
    #[error("Invalid request: {message}")]
    InvalidRequest { message: Cow<'static, str> },

    #[error("Invalid base64 payload in '{field}': {message}")]
    InvalidPayload {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Invalid configuration {name}={value}: {reason}")]
    InvalidConfig {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    // Decode Errors
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    // Size Limit Errors
    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // Layered document Errors (recovered by the inspector, never surfaced)
    #[error("Layered document unusable: {message}")]
    LayeredDocument { message: Cow<'static, str> },

    #[error("Region {width}x{height} is degenerate")]
    RegionDegenerate { width: i64, height: i64 },

    // Operation Errors
    #[error("Invalid resize dimensions: width={width}, height={height}")]
    InvalidResizeDimensions { width: u32, height: u32 },

    #[error("Resize failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResizeFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    #[error("Processing timed out after {elapsed_ms}ms at {stage} stage (limit: {limit_ms}ms)")]
    Timeout {
        stage: &'static str,
        limit_ms: u64,
        elapsed_ms: u64,
    },

    // Encode Errors
    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Internal Errors
    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

// Constructor Helpers
impl MockupError {
    pub fn invalid_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn invalid_payload(
        field: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidPayload {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_config(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidConfig {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn layered_document(message: impl Into<Cow<'static, str>>) -> Self {
        Self::LayeredDocument {
            message: message.into(),
        }
    }

    pub fn region_degenerate(width: i64, height: i64) -> Self {
        Self::RegionDegenerate { width, height }
    }

    pub fn invalid_resize_dimensions(width: u32, height: u32) -> Self {
        Self::InvalidResizeDimensions { width, height }
    }

    pub fn resize_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResizeFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn timeout(stage: &'static str, limit_ms: u64, elapsed_ms: u64) -> Self {
        Self::Timeout {
            stage,
            limit_ms,
            elapsed_ms,
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. }
            | Self::InvalidPayload { .. }
            | Self::InvalidConfig { .. }
            | Self::InvalidResizeDimensions { .. } => ErrorCategory::UserError,

            Self::UnsupportedFormat { .. }
            | Self::DecodeFailed { .. }
            | Self::LayeredDocument { .. }
            | Self::RegionDegenerate { .. }
            | Self::ResizeFailed { .. }
            | Self::EncodeFailed { .. } => ErrorCategory::CodecError,

            Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. }
            | Self::Timeout { .. } => ErrorCategory::ResourceLimit,

            Self::InternalPanic { .. } => ErrorCategory::InternalBug,
        }
    }

    /// Stable name reported as `type` in failure responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "InvalidRequest",
            Self::InvalidPayload { .. }
            | Self::UnsupportedFormat { .. }
            | Self::DecodeFailed { .. } => "DecodeError",
            Self::InvalidConfig { .. } => "ConfigError",
            Self::DimensionExceedsLimit { .. } | Self::PixelCountExceedsLimit { .. } => {
                "LimitExceeded"
            }
            Self::LayeredDocument { .. } => "LayeredDocumentError",
            Self::RegionDegenerate { .. } => "RegionDegenerate",
            Self::InvalidResizeDimensions { .. } | Self::ResizeFailed { .. } => "ResizeError",
            Self::Timeout { .. } => "TimeoutError",
            Self::EncodeFailed { .. } => "EncodingError",
            Self::InternalPanic { .. } => "InternalError",
        }
    }
}

impl ErrorCategory {
    /// Get string representation of error category
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "UserError",
            ErrorCategory::CodecError => "CodecError",
            ErrorCategory::ResourceLimit => "ResourceLimit",
            ErrorCategory::InternalBug => "InternalBug",
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, MockupError>;
