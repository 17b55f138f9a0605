// src/ops.rs
//
// Run configuration values.
// These are cheap to create and copy - the expensive work happens in TiledExecutor::run().

use crate::error::{Result, TileError};
use bitflags::bitflags;
use std::str::FromStr;

/// Default maximum tile edge, matching what most upscaler models are exported at.
pub const DEFAULT_MAX_TILE_SIZE: u32 = 512;

/// Default overlap margin between adjacent tiles, in source pixels.
pub const DEFAULT_TILE_OVERLAP: u32 = 16;

/// How overlapping tile outputs are combined into the final image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// No tiling: the whole image goes through the transform in one pass.
    None,
    /// Paste each tile's interior, cut at the middle of every overlap.
    #[default]
    ClipBlend,
    /// Feather overlaps with a linear alpha ramp.
    LinearBlend,
}

impl BlendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlendMode::None => "none",
            BlendMode::ClipBlend => "clip",
            BlendMode::LinearBlend => "linear",
        }
    }
}

impl FromStr for BlendMode {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "clip" | "clipblend" | "clip-blend" => Ok(Self::ClipBlend),
            "linear" | "linearblend" | "linear-blend" => Ok(Self::LinearBlend),
            other => Err(TileError::invalid_blend_mode(other.to_string())),
        }
    }
}

/// Value range a model consumes or produces.
///
/// The engine always works in `[0, 1]`; tiles are mapped into the model's
/// input range before the transform and back out of its output range after.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Normalization {
    /// `[0, 1]` (identity)
    #[default]
    ZeroToOne,
    /// `[-1, 1]`
    OneToOne,
}

impl Normalization {
    /// Map an engine sample (`[0, 1]`) into this range.
    #[inline]
    pub fn normalize(self, v: f32) -> f32 {
        match self {
            Normalization::ZeroToOne => v,
            Normalization::OneToOne => v * 2.0 - 1.0,
        }
    }

    /// Map a sample in this range back to `[0, 1]`, clamping overshoot.
    #[inline]
    pub fn denormalize(self, v: f32) -> f32 {
        let v = match self {
            Normalization::ZeroToOne => v,
            Normalization::OneToOne => (v + 1.0) * 0.5,
        };
        v.clamp(0.0, 1.0)
    }
}

impl FromStr for Normalization {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "zero-to-one" | "zerotoone" | "0..1" => Ok(Self::ZeroToOne),
            "one-to-one" | "onetoone" | "-1..1" => Ok(Self::OneToOne),
            other => Err(TileError::invalid_normalization(other.to_string())),
        }
    }
}

bitflags! {
    /// Optional steps applied to transform output.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PostProcess: u8 {
        /// Invert every produced sample (`1 - v`) before blending.
        const INVERT = 1 << 0;
        /// Composite the final output with the original input.
        const MERGE_INPUT = 1 << 1;
    }
}

/// Tiling configuration consumed from the host application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileConfig {
    /// Maximum tile edge in source pixels (> 0)
    pub max_tile_size: u32,
    /// Overlap between adjacent tiles in source pixels (< max_tile_size)
    pub overlap: u32,
    /// How tile outputs are combined
    pub blend_mode: BlendMode,
    /// Integer growth factor produced by the transform (>= 1)
    pub scale_factor: u32,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            max_tile_size: DEFAULT_MAX_TILE_SIZE,
            overlap: DEFAULT_TILE_OVERLAP,
            blend_mode: BlendMode::default(),
            scale_factor: 1,
        }
    }
}

impl TileConfig {
    pub fn new(max_tile_size: u32, overlap: u32, blend_mode: BlendMode, scale_factor: u32) -> Self {
        Self {
            max_tile_size,
            overlap,
            blend_mode,
            scale_factor,
        }
    }

    /// Upscaler preset: 512px tiles, 16px overlap, clipped paste.
    pub fn upscaler(scale_factor: u32) -> Self {
        Self {
            scale_factor,
            ..Self::default()
        }
    }

    /// Extractor preset: same tiling as upscalers, output at input resolution.
    ///
    /// Extractors produce masks, so feathering gives softer and more useful edges.
    pub fn extractor() -> Self {
        Self {
            blend_mode: BlendMode::LinearBlend,
            ..Self::default()
        }
    }

    pub fn with_max_tile_size(mut self, max_tile_size: u32) -> Self {
        self.max_tile_size = max_tile_size;
        self
    }

    pub fn with_overlap(mut self, overlap: u32) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: u32) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Reject configurations the scheduler cannot tile.
    pub fn validate(&self) -> Result<()> {
        if self.max_tile_size == 0 {
            return Err(TileError::invalid_argument(
                "max_tile_size",
                "0",
                "must be greater than zero",
            ));
        }
        if self.overlap >= self.max_tile_size {
            return Err(TileError::invalid_argument(
                "overlap",
                self.overlap.to_string(),
                format!("must be smaller than max_tile_size ({})", self.max_tile_size),
            ));
        }
        if self.scale_factor == 0 {
            return Err(TileError::invalid_argument(
                "scale_factor",
                "0",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
