// src/engine/executor.rs
//
// Drives one tiled run: grid -> (crop, transform, post-step, blend) per tile
// -> optional merge with the input.
//
// Every failure aborts the run and drops the partially blended buffer; a run
// either returns a complete image or an error, never both.

use crate::engine::blender::TileBlender;
use crate::engine::control::{report_progress, CancellationToken, ProgressSink};
use crate::engine::image::Image;
use crate::engine::limits::estimate_run_bytes;
use crate::engine::merge::merge_input;
use crate::engine::scheduler::{compute_grid, TileGrid, TileSpec};
use crate::engine::transform::{prepare_input, restore_output, TileTransform};
use crate::error::{Result, TileError};
use crate::ops::{BlendMode, PostProcess, TileConfig};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Runs images through a [`TileTransform`] tile by tile.
#[derive(Clone, Default)]
pub struct TiledExecutor {
    config: TileConfig,
    post_process: PostProcess,
    progress: Option<Arc<dyn ProgressSink>>,
    cancellation: Option<CancellationToken>,
}

impl fmt::Debug for TiledExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiledExecutor")
            .field("config", &self.config)
            .field("post_process", &self.post_process)
            .field("progress", &self.progress.is_some())
            .field("cancellation", &self.cancellation)
            .finish()
    }
}

impl TiledExecutor {
    pub fn new(config: TileConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_post_process(mut self, post_process: PostProcess) -> Self {
        self.post_process = post_process;
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn without_progress(mut self) -> Self {
        self.progress = None;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &TileConfig {
        &self.config
    }

    /// The grid a run over a `width x height` image would use.
    pub fn plan(&self, width: u32, height: u32) -> Result<TileGrid> {
        compute_grid(width, height, &self.config)
    }

    /// Process `input` and return the transformed image.
    ///
    /// `BlendMode::None`, or an image that fits in one tile, takes a single
    /// whole-image pass. Otherwise tiles are processed in ascending index
    /// order and progress is reported as `(index + 1, total)` after each one.
    pub fn run<T>(&self, input: Image, transform: &T) -> Result<Image>
    where
        T: TileTransform + ?Sized,
    {
        let grid = self.plan(input.width(), input.height())?;
        let mode = match self.config.blend_mode {
            BlendMode::None => BlendMode::None,
            configured => grid.effective_mode(configured),
        };
        let merge = self.post_process.contains(PostProcess::MERGE_INPUT);

        debug!(
            width = input.width(),
            height = input.height(),
            channels = input.channels(),
            tiles = grid.len(),
            mode = mode.as_str(),
            scale = grid.scale_factor(),
            estimated_bytes = estimate_run_bytes(
                grid.output_width(),
                grid.output_height(),
                input.channels(),
                mode == BlendMode::LinearBlend,
            ),
            "starting tiled run"
        );

        let (output, original) = match mode {
            BlendMode::None => {
                let original = merge.then(|| input.clone());
                (self.run_single(input, &grid, transform)?, original)
            }
            mode => {
                let output = self.run_tiled(&input, &grid, mode, transform)?;
                (output, merge.then_some(input))
            }
        };

        let output = match original {
            Some(original) => merge_input(&original, output)?,
            None => output,
        };
        debug!(
            width = output.width(),
            height = output.height(),
            channels = output.channels(),
            "finished tiled run"
        );
        Ok(output)
    }

    fn run_single<T>(&self, input: Image, grid: &TileGrid, transform: &T) -> Result<Image>
    where
        T: TileTransform + ?Sized,
    {
        self.check_cancelled(0, 1)?;
        let spec = TileSpec::full_frame(input.width(), input.height(), grid.scale_factor());
        let output = self.process_tile(&spec, input, transform)?;
        let mut blender = TileBlender::new(grid, BlendMode::None);
        blender.add(&spec, output)?;
        self.report(1, 1);
        blender.finish()
    }

    fn run_tiled<T>(
        &self,
        input: &Image,
        grid: &TileGrid,
        mode: BlendMode,
        transform: &T,
    ) -> Result<Image>
    where
        T: TileTransform + ?Sized,
    {
        let total = grid.len();
        let mut blender = TileBlender::new(grid, mode);
        for spec in grid.tiles() {
            self.check_cancelled(spec.index, total)?;
            trace!(
                index = spec.index,
                x = spec.source.x,
                y = spec.source.y,
                width = spec.source.width,
                height = spec.source.height,
                "transforming tile"
            );
            let tile = input.crop(spec.source)?;
            let output = self.process_tile(spec, tile, transform)?;
            blender.add(spec, output)?;
            self.report(spec.index + 1, total);
        }
        blender.finish()
    }

    /// Normalize, transform, validate, denormalize and optionally invert one tile.
    fn process_tile<T>(&self, spec: &TileSpec, tile: Image, transform: &T) -> Result<Image>
    where
        T: TileTransform + ?Sized,
    {
        let prepared = prepare_input(transform, tile);
        let produced = transform
            .transform(prepared)
            .map_err(|source| TileError::transform_failed(spec.index, source))?;

        let expected = spec.expected_output_size();
        if produced.dimensions() != expected {
            return Err(TileError::tile_size_mismatch(
                spec.index,
                expected,
                produced.dimensions(),
            ));
        }

        let output = restore_output(transform, produced);
        if self.post_process.contains(PostProcess::INVERT) {
            Ok(output.invert())
        } else {
            Ok(output)
        }
    }

    fn check_cancelled(&self, completed: usize, total: usize) -> Result<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => {
                debug!(completed, total, "tiled run cancelled");
                Err(TileError::cancelled(completed, total))
            }
            _ => Ok(()),
        }
    }

    fn report(&self, completed: usize, total: usize) {
        if let Some(sink) = &self.progress {
            report_progress(sink.as_ref(), completed, total);
        }
    }
}
