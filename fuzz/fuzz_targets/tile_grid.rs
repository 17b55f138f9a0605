#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tiled_transform::engine::compute_grid;
use tiled_transform::ops::{BlendMode, TileConfig};

#[derive(Arbitrary, Debug)]
struct Input {
    width: u16,
    height: u16,
    max_tile_size: u16,
    overlap: u16,
    scale_factor: u8,
}

fuzz_target!(|input: Input| {
    let config = TileConfig::new(
        input.max_tile_size as u32,
        input.overlap as u32,
        BlendMode::ClipBlend,
        (input.scale_factor % 8) as u32,
    );
    let Ok(grid) = compute_grid(input.width as u32, input.height as u32, &config) else {
        return;
    };

    // Paste regions must tile the output exactly once.
    let (ow, oh) = grid.output_dimensions();
    let pasted: u64 = grid.tiles().iter().map(|t| t.paste.area()).sum();
    assert_eq!(pasted, ow as u64 * oh as u64);
    for tile in grid.tiles() {
        assert!(tile.source.right() <= input.width as u32);
        assert!(tile.source.bottom() <= input.height as u32);
        assert!(tile.source.width <= config.max_tile_size);
        assert!(tile.dest.right() <= ow && tile.dest.bottom() <= oh);
    }
});
