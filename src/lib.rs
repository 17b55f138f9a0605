// lib.rs
//
// tiled-transform: run per-tile image transforms (super-resolution, matting,
// denoising models) over images of any size.
//
// Design goals:
// - Bounded memory per transform call (one tile at a time)
// - Seamless output: clip or feathered blending across tile borders
// - Deterministic tiling for a given image size and configuration
// - Cooperative cancellation and best-effort progress reporting

// Memory allocator optimization - jemalloc for large float buffers
// Note: jemalloc is not supported on Windows/MSVC, so we exclude it on that platform
#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

pub mod engine;
pub mod error;
pub mod ops;

pub use engine::{
    compute_grid, CancellationToken, Image, ModelTransform, ProgressSink, TileBlender, TileGrid,
    TileSpec, TileTransform, TiledExecutor,
};
pub use error::{ErrorCategory, Result, TileError};
pub use ops::{BlendMode, Normalization, PostProcess, TileConfig};

/// Get library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
