// tests/edge_cases.rs
//
// Edge case tests for tiled-transform
// Tests boundary values, invalid inputs, and error handling

use tiled_transform::engine::{
    axis_starts, check_dimensions, compute_grid, BoxError, Image, TileBlender, TiledExecutor,
    MAX_DIMENSION, MAX_PIXELS,
};
use tiled_transform::ops::{BlendMode, TileConfig};
use tiled_transform::{ErrorCategory, TileError};

fn identity(tile: Image) -> Result<Image, BoxError> {
    Ok(tile)
}

fn ramp(width: u32, height: u32, channels: u8) -> Image {
    Image::from_fn(width, height, channels, |x, y, c| {
        ((x + 2 * y + c as u32) % 64) as f32 / 63.0
    })
    .unwrap()
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_zero_tile_size_rejected() {
    let err = compute_grid(100, 100, &TileConfig::default().with_max_tile_size(0)).unwrap_err();
    assert!(matches!(err, TileError::InvalidArgument { .. }));
    assert_eq!(err.category(), ErrorCategory::UserError);
}

#[test]
fn test_overlap_equal_to_tile_size_rejected() {
    let config = TileConfig::new(64, 64, BlendMode::ClipBlend, 1);
    assert!(compute_grid(100, 100, &config).is_err());
}

#[test]
fn test_zero_scale_rejected() {
    let config = TileConfig::default().with_scale_factor(0);
    let err = TiledExecutor::new(config)
        .run(ramp(8, 8, 3), &identity)
        .unwrap_err();
    assert!(matches!(err, TileError::InvalidArgument { .. }));
}

#[test]
fn test_blend_mode_parsing() {
    assert_eq!("linear".parse::<BlendMode>().unwrap(), BlendMode::LinearBlend);
    assert!(matches!(
        "feather".parse::<BlendMode>(),
        Err(TileError::InvalidBlendMode { .. })
    ));
}

// =============================================================================
// Grid geometry
// =============================================================================

#[test]
fn test_dimension_equal_to_tile_size_is_one_tile() {
    assert_eq!(axis_starts(512, 512, 16), vec![0]);
    let grid = compute_grid(512, 512, &TileConfig::default()).unwrap();
    assert_eq!(grid.len(), 1);
    assert_eq!(grid.effective_mode(BlendMode::LinearBlend), BlendMode::None);
}

#[test]
fn test_one_pixel_past_tile_size() {
    assert_eq!(axis_starts(513, 512, 16), vec![0, 1]);
}

#[test]
fn test_one_pixel_wide_strip() {
    let grid = compute_grid(1, 5000, &TileConfig::default()).unwrap();
    assert_eq!(grid.columns(), 1);
    assert!(grid.tiles().iter().all(|t| t.source.width == 1));
    let output = TiledExecutor::new(TileConfig::default())
        .run(ramp(1, 2000, 1), &identity)
        .unwrap();
    assert_eq!(output, ramp(1, 2000, 1));
}

#[test]
fn test_zero_overlap_tiles_touch() {
    let starts = axis_starts(300, 100, 0);
    assert_eq!(starts, vec![0, 100, 200]);
    let grid = compute_grid(300, 100, &TileConfig::new(100, 0, BlendMode::LinearBlend, 1)).unwrap();
    assert!(grid
        .tiles()
        .iter()
        .all(|t| t.margins.left == 0 && t.margins.right == 0));
}

// =============================================================================
// Limits
// =============================================================================

#[test]
fn test_zero_dimensions_rejected() {
    assert!(compute_grid(0, 10, &TileConfig::default()).is_err());
    assert!(compute_grid(10, 0, &TileConfig::default()).is_err());
}

#[test]
fn test_output_dimension_limit_includes_scale() {
    let err = compute_grid(MAX_DIMENSION / 2 + 1, 8, &TileConfig::upscaler(2)).unwrap_err();
    assert!(matches!(err, TileError::DimensionExceedsLimit { .. }));
    assert_eq!(err.category(), ErrorCategory::ResourceLimit);
}

#[test]
fn test_pixel_limit() {
    let side = ((MAX_PIXELS as f64).sqrt() as u64) + 1;
    assert!(matches!(
        check_dimensions(side, side),
        Err(TileError::PixelCountExceedsLimit { .. })
    ));
    assert!(check_dimensions(10_000, 10_000).is_ok());
}

// =============================================================================
// Transform misbehavior
// =============================================================================

#[test]
fn test_transform_changing_channel_count_between_tiles() {
    let calls = std::sync::atomic::AtomicUsize::new(0);
    let unstable = |tile: Image| -> Result<Image, BoxError> {
        let (w, h) = tile.dimensions();
        let channels = if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
            3
        } else {
            1
        };
        Ok(Image::filled(w, h, channels, 0.5)?)
    };
    let err = TiledExecutor::new(TileConfig::new(32, 4, BlendMode::ClipBlend, 1))
        .run(ramp(64, 32, 3), &unstable)
        .unwrap_err();
    assert!(matches!(
        err,
        TileError::TileChannelMismatch {
            index: 1,
            expected: 3,
            actual: 1
        }
    ));
}

#[test]
fn test_transform_returning_wrong_size_in_single_pass() {
    let shrink = |tile: Image| -> Result<Image, BoxError> {
        Ok(Image::filled(tile.width() - 1, tile.height(), tile.channels(), 0.0)?)
    };
    let err = TiledExecutor::new(TileConfig::default())
        .run(ramp(20, 20, 3), &shrink)
        .unwrap_err();
    match err {
        TileError::TileSizeMismatch {
            index,
            expected_width,
            actual_width,
            ..
        } => {
            assert_eq!(index, 0);
            assert_eq!((expected_width, actual_width), (20, 19));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_transform_error_category() {
    let failing = |_tile: Image| -> Result<Image, BoxError> { Err("device lost".into()) };
    let err = TiledExecutor::new(TileConfig::default())
        .run(ramp(10, 10, 3), &failing)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TransformError);
    assert!(std::error::Error::source(&err).is_some());
}

// =============================================================================
// Blender misuse
// =============================================================================

#[test]
fn test_blender_finish_with_missing_tiles() {
    let grid = compute_grid(100, 100, &TileConfig::new(64, 8, BlendMode::ClipBlend, 1)).unwrap();
    let mut blender = TileBlender::new(&grid, BlendMode::ClipBlend);
    let first = grid.get(0).unwrap();
    blender
        .add(first, Image::filled(64, 64, 3, 0.0).unwrap())
        .unwrap();
    assert!(matches!(
        blender.finish(),
        Err(TileError::IncompleteBlend {
            received: 1,
            expected: 4
        })
    ));
}

#[test]
fn test_blender_rejects_duplicate_tile() {
    let grid = compute_grid(100, 100, &TileConfig::new(64, 8, BlendMode::LinearBlend, 1)).unwrap();
    let mut blender = TileBlender::new(&grid, BlendMode::LinearBlend);
    let first = grid.get(0).unwrap();
    blender
        .add(first, Image::filled(64, 64, 1, 0.0).unwrap())
        .unwrap();
    assert!(blender
        .add(first, Image::filled(64, 64, 1, 0.0).unwrap())
        .is_err());
}

#[test]
fn test_blender_rejects_paste_outside_dest() {
    let grid = compute_grid(100, 50, &TileConfig::new(64, 8, BlendMode::ClipBlend, 1)).unwrap();
    let mut blender = TileBlender::new(&grid, BlendMode::ClipBlend);
    let mut spec = *grid.get(1).unwrap();
    spec.paste.x = 0;
    let err = blender
        .add(&spec, Image::filled(64, 50, 3, 0.5).unwrap())
        .unwrap_err();
    assert!(matches!(err, TileError::InvalidArgument { .. }));

    // A rejected spec leaves the blender usable for the real tiles.
    for tile in grid.tiles() {
        blender
            .add(tile, Image::filled(64, 50, 3, 0.5).unwrap())
            .unwrap();
    }
    assert_eq!(blender.finish().unwrap().dimensions(), (100, 50));
}

#[test]
fn test_two_channel_image_round_trip() {
    let input = ramp(90, 70, 2);
    let output = TiledExecutor::new(TileConfig::new(40, 6, BlendMode::LinearBlend, 1))
        .run(input.clone(), &identity)
        .unwrap();
    assert_eq!(output.channels(), 2);
    for (a, b) in output.data().iter().zip(input.data()) {
        assert!((a - b).abs() < 1e-5);
    }
}
