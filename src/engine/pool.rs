// src/engine/pool.rs
//
// Global thread pool for frame batches.
//
// A single lazily-built rayon pool is shared by every batch instead of creating
// one per request. Threads are reused and the thread count stays predictable.
//
// **Thread Count**:
// - TILED_TRANSFORM_THREADS, when set to a positive integer
// - otherwise std::thread::available_parallelism() (respects cgroup/CPU quota)
// - never fewer than MIN_THREADS
//
// **IMPORTANT**: the pool is built on first use; changing the variable after
// that has no effect.

use rayon::ThreadPool;
use std::sync::OnceLock;
use tracing::debug;

/// Environment variable overriding the batch thread count.
pub const THREADS_ENV: &str = "TILED_TRANSFORM_THREADS";

/// Minimum number of rayon threads to ensure at least some parallelism
const MIN_THREADS: usize = 1;

static GLOBAL_THREAD_POOL: OnceLock<ThreadPool> = OnceLock::new();

pub fn get_pool() -> &'static ThreadPool {
    GLOBAL_THREAD_POOL.get_or_init(|| {
        let num_threads = configured_threads(std::env::var(THREADS_ENV).ok().as_deref());
        debug!(num_threads, "building frame batch thread pool");
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("tiled-transform-{i}"))
            .build()
            .unwrap_or_else(|err| {
                // Fallback: a minimal pool if the preferred configuration fails
                debug!(%err, "falling back to a single-thread pool");
                rayon::ThreadPoolBuilder::new()
                    .num_threads(MIN_THREADS)
                    .build()
                    .unwrap_or_else(|e| {
                        panic!("failed to create fallback thread pool with {MIN_THREADS} thread: {e}")
                    })
            })
    })
}

/// Thread count for an optional override value.
fn configured_threads(raw: Option<&str>) -> usize {
    raw.and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(MIN_THREADS)
        })
        .max(MIN_THREADS)
}
