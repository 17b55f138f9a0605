#![no_main]

use libfuzzer_sys::fuzz_target;
use tiled_transform::engine::Source;

fuzz_target!(|data: &[u8]| {
    // Must never panic; oversized headers are rejected before decoding.
    if let Ok(image) = Source::from_bytes(data.to_vec()).decode() {
        assert_eq!(
            image.data().len(),
            image.width() as usize * image.height() as usize * image.channels() as usize
        );
    }
});
