#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tiled_transform::engine::{BoxError, Image, TiledExecutor};
use tiled_transform::ops::{BlendMode, PostProcess, TileConfig};

#[derive(Arbitrary, Debug)]
struct Input {
    width: u8,
    height: u8,
    channels: u8,
    max_tile_size: u8,
    overlap: u8,
    mode: u8,
    post_process: u8,
    samples: Vec<u8>,
}

fn mode_from_byte(b: u8) -> BlendMode {
    match b % 3 {
        0 => BlendMode::None,
        1 => BlendMode::ClipBlend,
        _ => BlendMode::LinearBlend,
    }
}

fuzz_target!(|input: Input| {
    let width = input.width as u32 + 1;
    let height = input.height as u32 + 1;
    let channels = input.channels % 4 + 1;
    let samples = input.samples;
    let Ok(image) = Image::from_fn(width, height, channels, |x, y, c| {
        let i = ((y * width + x) * channels as u32 + c as u32) as usize;
        samples.get(i % samples.len().max(1)).copied().unwrap_or(0) as f32 / 255.0
    }) else {
        return;
    };

    let config = TileConfig::new(
        input.max_tile_size as u32,
        input.overlap as u32,
        mode_from_byte(input.mode),
        1,
    );
    let executor = TiledExecutor::new(config)
        .with_post_process(PostProcess::from_bits_truncate(input.post_process));
    let identity = |tile: Image| -> Result<Image, BoxError> { Ok(tile) };

    if let Ok(output) = executor.run(image, &identity) {
        assert!(output.data().iter().all(|v| v.is_finite()));
    }
});
