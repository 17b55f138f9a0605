// src/error.rs
//
// Unified error handling for tiled-transform
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - UserError: Invalid configuration or input, recoverable
// - TransformError: The opaque transform failed or broke its size contract
// - ResourceLimit: Dimension/pixel limits and file system failures
// - CodecError: Format/encoding issues
// - Cancelled: Cooperative cancellation was observed
// - InternalBug: Library bugs (should not happen)

use std::borrow::Cow;
use thiserror::Error;

/// Boxed error returned by transform capabilities.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error taxonomy used by callers to decide how to surface a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Invalid input, recoverable by user
    UserError,
    /// The transform returned an error or a wrongly shaped tile
    TransformError,
    /// Dimension/pixel limits, file system pressure
    ResourceLimit,
    /// Format/encoding issues
    CodecError,
    /// Run was cancelled by the caller
    Cancelled,
    /// Library bugs (should not happen)
    InternalBug,
}

impl ErrorCategory {
    /// Get string representation of error category
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserError => "UserError",
            ErrorCategory::TransformError => "TransformError",
            ErrorCategory::ResourceLimit => "ResourceLimit",
            ErrorCategory::CodecError => "CodecError",
            ErrorCategory::Cancelled => "Cancelled",
            ErrorCategory::InternalBug => "InternalBug",
        }
    }
}

/// tiled-transform error types
///
/// Every variant aborts the whole run. No partial image is ever returned
/// alongside an error.
#[derive(Debug, Error)]
pub enum TileError {
    // Configuration Errors
    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("Unknown blend mode: '{value}'. Expected none, clip, or linear")]
    InvalidBlendMode { value: Cow<'static, str> },

    #[error("Unknown normalization: '{value}'. Expected zero-to-one or one-to-one")]
    InvalidNormalization { value: Cow<'static, str> },

    // Size Limit Errors
    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // Transform Errors
    #[error(
        "Tile {index} has size {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    TileSizeMismatch {
        index: usize,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Tile {index} has {actual} channels, expected {expected}")]
    TileChannelMismatch {
        index: usize,
        expected: u8,
        actual: u8,
    },

    #[error("Transform failed on tile {index}: {source}")]
    TransformFailed {
        index: usize,
        #[source]
        source: BoxError,
    },

    // Cancellation
    #[error("Run cancelled after {completed} of {total} tiles")]
    Cancelled { completed: usize, total: usize },

    // File I/O Errors
    #[error("File not found: {path}")]
    FileNotFound { path: Cow<'static, str> },

    #[error("Failed to read file '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWriteFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    // Codec Errors
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Internal Errors
    #[error("Blend finished with {received} of {expected} tiles")]
    IncompleteBlend { received: usize, expected: usize },

    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

// Constructor Helpers
impl TileError {
    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_blend_mode(value: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidBlendMode {
            value: value.into(),
        }
    }

    pub fn invalid_normalization(value: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidNormalization {
            value: value.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn tile_size_mismatch(index: usize, expected: (u32, u32), actual: (u32, u32)) -> Self {
        Self::TileSizeMismatch {
            index,
            expected_width: expected.0,
            expected_height: expected.1,
            actual_width: actual.0,
            actual_height: actual.1,
        }
    }

    pub fn tile_channel_mismatch(index: usize, expected: u8, actual: u8) -> Self {
        Self::TileChannelMismatch {
            index,
            expected,
            actual,
        }
    }

    pub fn transform_failed(index: usize, source: BoxError) -> Self {
        Self::TransformFailed { index, source }
    }

    pub fn cancelled(completed: usize, total: usize) -> Self {
        Self::Cancelled { completed, total }
    }

    pub fn file_not_found(path: impl Into<Cow<'static, str>>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn file_write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            source,
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

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn incomplete_blend(received: usize, expected: usize) -> Self {
        Self::IncompleteBlend { received, expected }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// True when the run stopped because the caller asked it to.
    ///
    /// Hosts usually treat this as a normal outcome rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Check if this error is recoverable (user can fix it)
    ///
    /// Consistent with category():
    /// - UserError, ResourceLimit and Cancelled are recoverable
    /// - TransformError, CodecError and InternalBug are not
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::UserError | ErrorCategory::ResourceLimit | ErrorCategory::Cancelled => {
                true
            }
            ErrorCategory::TransformError
            | ErrorCategory::CodecError
            | ErrorCategory::InternalBug => false,
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArgument { .. }
            | Self::InvalidBlendMode { .. }
            | Self::InvalidNormalization { .. }
            | Self::FileNotFound { .. }
            | Self::UnsupportedFormat { .. } => ErrorCategory::UserError,

            Self::TileSizeMismatch { .. }
            | Self::TileChannelMismatch { .. }
            | Self::TransformFailed { .. } => ErrorCategory::TransformError,

            // Note: file I/O failures are grouped with limits because they usually
            // mean disk or permission pressure the user can clear.
            Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. }
            | Self::FileReadFailed { .. }
            | Self::FileWriteFailed { .. } => ErrorCategory::ResourceLimit,

            Self::DecodeFailed { .. } | Self::EncodeFailed { .. } => ErrorCategory::CodecError,

            Self::Cancelled { .. } => ErrorCategory::Cancelled,

            Self::IncompleteBlend { .. } | Self::InternalPanic { .. } => {
                ErrorCategory::InternalBug
            }
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, TileError>;
