// src/engine/limits.rs
//
// Size limits for buffers the engine allocates.

use super::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::{Result, TileError};

/// Reject dimensions whose buffer would exceed the engine limits.
///
/// Takes u64 so scaled sizes can be checked before they are narrowed to u32.
pub fn check_dimensions(width: u64, height: u64) -> Result<()> {
    let max = MAX_DIMENSION as u64;
    if width > max || height > max {
        let dimension = width.max(height).min(u32::MAX as u64) as u32;
        return Err(TileError::dimension_exceeds_limit(dimension, MAX_DIMENSION));
    }
    let pixels = width * height;
    if pixels > MAX_PIXELS {
        return Err(TileError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Bytes a run holds at peak for an output of `width x height x channels`:
/// the output buffer plus, for feathered blending, the weight plane.
pub fn estimate_run_bytes(width: u32, height: u32, channels: u8, feathered: bool) -> u64 {
    let pixels = width as u64 * height as u64;
    let samples = pixels * channels as u64;
    let weights = if feathered { pixels } else { 0 };
    (samples + weights) * std::mem::size_of::<f32>() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(1, 1).is_ok());
        assert!(check_dimensions(MAX_DIMENSION as u64, 1).is_ok());
        assert!(matches!(
            check_dimensions(MAX_DIMENSION as u64 + 1, 1),
            Err(TileError::DimensionExceedsLimit { .. })
        ));
        assert!(matches!(
            check_dimensions(20_000, 20_000),
            Err(TileError::PixelCountExceedsLimit { .. })
        ));
    }

    #[test]
    fn test_huge_scaled_dimension_reports_saturated_value() {
        let err = check_dimensions(u32::MAX as u64 * 4, 1).unwrap_err();
        assert!(matches!(
            err,
            TileError::DimensionExceedsLimit { dimension: u32::MAX, .. }
        ));
    }

    #[test]
    fn test_estimate_run_bytes() {
        assert_eq!(estimate_run_bytes(10, 10, 3, false), 100 * 3 * 4);
        assert_eq!(estimate_run_bytes(10, 10, 3, true), 100 * 4 * 4);
    }
}
