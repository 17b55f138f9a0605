// src/engine.rs
//
// The tiled execution engine. An image is split into overlapping tiles, every
// tile goes through a user transform, and the results are stitched back into
// one output:
// 1. scheduler - tile grid (source, destination and paste rectangles)
// 2. executor  - per-tile crop / normalize / transform / post-step loop
// 3. blender   - clip or feathered reassembly into the output buffer
//
// This file is a facade over the modules in engine/.

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height), input or output.
/// Larger images are rejected before any buffer is allocated.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height) of any image the engine
/// allocates, including upscaled outputs.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod batch;
mod blender;
mod control;
mod executor;
mod image;
mod io;
mod limits;
mod merge;
mod pool;
mod scheduler;
mod transform;

pub use batch::process_frames;
pub use blender::{axis_ramp, feather_weight, TileBlender};
pub use control::{CancellationToken, ProgressLog, ProgressSink};
pub use executor::TiledExecutor;
pub use self::image::{Image, MAX_CHANNELS};
pub use io::{encode, format_from_path, save, Source};
pub use limits::{check_dimensions, estimate_run_bytes};
pub use merge::{merge_input, resample};
pub use pool::{get_pool, THREADS_ENV};
pub use scheduler::{axis_starts, compute_grid, Margins, Rect, TileGrid, TileSpec};
pub use transform::{BoxError, ModelTransform, TileTransform};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{BlendMode, TileConfig};

    #[test]
    fn test_limits_are_consistent() {
        assert!((MAX_DIMENSION as u64) * (MAX_DIMENSION as u64) > MAX_PIXELS);
        assert!(check_dimensions(MAX_DIMENSION as u64, 1).is_ok());
        assert!(check_dimensions(MAX_DIMENSION as u64 + 1, 1).is_err());
    }

    #[test]
    fn test_facade_runs_end_to_end() {
        let input = Image::filled(300, 200, 3, 0.25).unwrap();
        let executor = TiledExecutor::new(TileConfig::new(128, 8, BlendMode::LinearBlend, 1));
        let output = executor
            .run(input.clone(), &|tile: Image| -> Result<Image, BoxError> { Ok(tile) })
            .unwrap();
        assert_eq!(output.dimensions(), input.dimensions());
        assert!(output.data().iter().all(|v| (v - 0.25).abs() < 1e-5));
    }
}
