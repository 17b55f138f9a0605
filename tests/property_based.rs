use proptest::prelude::*;
use tiled_transform::engine::{compute_grid, BoxError, Image, TileBlender, TiledExecutor};
use tiled_transform::ops::{BlendMode, TileConfig};

fn create_test_image(width: u32, height: u32, channels: u8) -> Image {
    Image::from_fn(width, height, channels, |x, y, c| {
        ((x * 7 + y * 13 + c as u32 * 29) % 251) as f32 / 250.0
    })
    .unwrap()
}

fn identity(tile: Image) -> Result<Image, BoxError> {
    Ok(tile)
}

fn nearest(scale: u32) -> impl Fn(Image) -> Result<Image, BoxError> {
    move |tile: Image| -> Result<Image, BoxError> {
        let (w, h) = tile.dimensions();
        Ok(Image::from_fn(w * scale, h * scale, tile.channels(), |x, y, c| {
            tile.pixel(x / scale, y / scale)[c as usize]
        })?)
    }
}

/// (width, height, max_tile_size, overlap) with overlap < max_tile_size.
fn tiling_strategy() -> impl Strategy<Value = (u32, u32, u32, u32)> {
    (1u32..=120, 1u32..=120, 4u32..=48).prop_flat_map(|(w, h, max)| {
        (Just(w), Just(h), Just(max), 0u32..max)
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_tiles_stay_in_bounds_and_cover_input(
        (w, h, max, overlap) in tiling_strategy(),
        scale in 1u32..=3,
    ) {
        let config = TileConfig::new(max, overlap, BlendMode::ClipBlend, scale);
        let grid = compute_grid(w, h, &config).unwrap();
        prop_assert_eq!(grid.output_dimensions(), (w * scale, h * scale));

        let mut covered = vec![false; (w * h) as usize];
        for (i, tile) in grid.tiles().iter().enumerate() {
            prop_assert_eq!(tile.index, i);
            prop_assert_eq!(tile.source.width, w.min(max));
            prop_assert_eq!(tile.source.height, h.min(max));
            prop_assert!(tile.source.right() <= w && tile.source.bottom() <= h);
            prop_assert_eq!(tile.dest, tile.source.scaled(scale));
            for y in tile.source.y..tile.source.bottom() {
                for x in tile.source.x..tile.source.right() {
                    covered[(y * w + x) as usize] = true;
                }
            }
        }
        prop_assert!(covered.iter().all(|&c| c));
    }

    #[test]
    fn prop_paste_regions_partition_output(
        (w, h, max, overlap) in tiling_strategy(),
        scale in 1u32..=2,
    ) {
        let config = TileConfig::new(max, overlap, BlendMode::ClipBlend, scale);
        let grid = compute_grid(w, h, &config).unwrap();
        let (ow, oh) = grid.output_dimensions();

        let mut hits = vec![0u8; (ow * oh) as usize];
        for tile in grid.tiles() {
            prop_assert!(tile.paste.x >= tile.dest.x && tile.paste.right() <= tile.dest.right());
            prop_assert!(tile.paste.y >= tile.dest.y && tile.paste.bottom() <= tile.dest.bottom());
            for y in tile.paste.y..tile.paste.bottom() {
                for x in tile.paste.x..tile.paste.right() {
                    hits[(y * ow + x) as usize] += 1;
                }
            }
        }
        prop_assert!(hits.iter().all(|&n| n == 1));
    }

    #[test]
    fn prop_grid_is_deterministic((w, h, max, overlap) in tiling_strategy()) {
        let config = TileConfig::new(max, overlap, BlendMode::LinearBlend, 1);
        let a = compute_grid(w, h, &config).unwrap();
        let b = compute_grid(w, h, &config).unwrap();
        prop_assert_eq!(a.tiles(), b.tiles());
    }

    #[test]
    fn prop_clip_blend_is_order_independent(
        (w, h, max, overlap) in (8u32..=80, 8u32..=80, 4u32..=24)
            .prop_flat_map(|(w, h, max)| (Just(w), Just(h), Just(max), 0u32..max)),
        seed in any::<u64>(),
    ) {
        let config = TileConfig::new(max, overlap, BlendMode::ClipBlend, 1);
        let grid = compute_grid(w, h, &config).unwrap();

        // Every tile gets a distinct constant value so overlaps would show.
        let tile_for = |index: usize| {
            let spec = grid.get(index).unwrap();
            let value = (index % 97) as f32 / 96.0;
            Image::filled(spec.source.width, spec.source.height, 1, value).unwrap()
        };

        let mut forward = TileBlender::new(&grid, BlendMode::ClipBlend);
        for spec in grid.tiles() {
            forward.add(spec, tile_for(spec.index)).unwrap();
        }

        // Deterministic shuffle from the seed.
        let mut order: Vec<usize> = (0..grid.len()).collect();
        let mut state = seed | 1;
        for i in (1..order.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            order.swap(i, (state % (i as u64 + 1)) as usize);
        }
        let mut shuffled = TileBlender::new(&grid, BlendMode::ClipBlend);
        for &i in &order {
            shuffled.add(grid.get(i).unwrap(), tile_for(i)).unwrap();
        }

        prop_assert_eq!(forward.finish().unwrap(), shuffled.finish().unwrap());
    }

    #[test]
    fn prop_linear_weights_normalize_constant_tiles(
        (w, h, max, overlap) in tiling_strategy(),
        value in 0.0f32..=1.0,
    ) {
        let config = TileConfig::new(max, overlap, BlendMode::LinearBlend, 1);
        let grid = compute_grid(w, h, &config).unwrap();
        let mut blender = TileBlender::new(&grid, BlendMode::LinearBlend);
        for spec in grid.tiles() {
            let tile = Image::filled(spec.source.width, spec.source.height, 3, value).unwrap();
            blender.add(spec, tile).unwrap();
        }
        for y in 0..h {
            for x in 0..w {
                prop_assert!(blender.weight_sum(x, y).unwrap() > 0.0);
            }
        }
        let output = blender.finish().unwrap();
        prop_assert!(output.data().iter().all(|v| (v - value).abs() < 1e-5));
    }

    #[test]
    fn prop_identity_round_trip(
        (w, h, max, overlap) in tiling_strategy(),
        channels in 1u8..=4,
        linear in any::<bool>(),
    ) {
        let mode = if linear { BlendMode::LinearBlend } else { BlendMode::ClipBlend };
        let input = create_test_image(w, h, channels);
        let output = TiledExecutor::new(TileConfig::new(max, overlap, mode, 1))
            .run(input.clone(), &identity)
            .unwrap();
        prop_assert_eq!(output.dimensions(), input.dimensions());
        prop_assert_eq!(output.channels(), channels);
        for (a, b) in output.data().iter().zip(input.data()) {
            prop_assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn prop_tiled_upscale_matches_whole_image(
        (w, h, max, overlap) in tiling_strategy(),
        scale in 1u32..=3,
    ) {
        let input = create_test_image(w, h, 3);
        let tiled = TiledExecutor::new(TileConfig::new(max, overlap, BlendMode::ClipBlend, scale))
            .run(input.clone(), &nearest(scale))
            .unwrap();
        prop_assert_eq!(tiled, nearest(scale)(input).unwrap());
    }
}
