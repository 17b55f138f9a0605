// src/engine/batch.rs
//
// Frame-level parallelism: many images (e.g. video frames), each processed by
// its own executor run with its own output buffer.
//
// Parallelism stays at the frame level. Inside one frame tiles are still
// processed sequentially through a single blender.

use crate::engine::control::{report_progress, ProgressSink};
use crate::engine::executor::TiledExecutor;
use crate::engine::image::Image;
use crate::engine::pool;
use crate::engine::transform::TileTransform;
use crate::error::Result;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::debug;

/// Run every frame through `executor` on the global pool.
///
/// Results keep frame order. Tile-level progress of the individual runs is not
/// forwarded; `progress` receives `(frames_completed, frame_count)` with a
/// strictly increasing count. A cancelled token makes the remaining frames
/// fail with `Cancelled`.
pub fn process_frames<T>(
    executor: &TiledExecutor,
    frames: Vec<Image>,
    transform: &T,
    progress: Option<&dyn ProgressSink>,
) -> Vec<Result<Image>>
where
    T: TileTransform + Sync + ?Sized,
{
    let total = frames.len();
    let frame_executor = executor.clone().without_progress();
    let completed = Mutex::new(0usize);

    debug!(frames = total, "starting frame batch");
    let results: Vec<Result<Image>> = pool::get_pool().install(|| {
        frames
            .into_par_iter()
            .map(|frame| {
                let result = frame_executor.run(frame, transform);
                if let Some(sink) = progress {
                    // Hold the lock while reporting so counts arrive in order.
                    let mut done = completed.lock();
                    *done += 1;
                    report_progress(sink, *done, total);
                }
                result
            })
            .collect()
    });
    debug!(
        frames = total,
        failed = results.iter().filter(|r| r.is_err()).count(),
        "finished frame batch"
    );
    results
}
