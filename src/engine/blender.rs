// src/engine/blender.rs
//
// Composites processed tiles into the output buffer.
//
// The blender is the only writer of the output buffer. It is driven by one
// thread; callers that produce tiles concurrently must funnel them through a
// single `add` call site.

use crate::engine::image::Image;
use crate::engine::scheduler::{Rect, TileGrid, TileSpec};
use crate::error::{Result, TileError};
use crate::ops::BlendMode;

enum BlendState {
    Empty,
    /// `BlendMode::None`: the single produced image, returned as-is
    Single(Image),
    /// `BlendMode::ClipBlend`: output samples
    Clip(Vec<f32>),
    /// `BlendMode::LinearBlend`: weighted sums and per-pixel weight totals
    Linear { accum: Vec<f32>, weights: Vec<f32> },
}

/// Accumulates `(TileSpec, tile)` pairs for one run.
pub struct TileBlender {
    mode: BlendMode,
    output_width: u32,
    output_height: u32,
    received: Vec<bool>,
    count: usize,
    channels: Option<u8>,
    state: BlendState,
}

/// Linear ramp along one tile axis.
///
/// Rises from near 0 at an edge shared with a neighbor to 1 at `margin` pixels
/// in. Sampled at pixel centers so no covered pixel gets zero weight.
pub fn axis_ramp(len: u32, before: u32, after: u32) -> Vec<f32> {
    (0..len).map(|i| ramp_at(i, len, before, after)).collect()
}

#[inline]
fn ramp_at(i: u32, len: u32, before: u32, after: u32) -> f32 {
    let mut w = 1.0f32;
    if before > 0 {
        w = w.min((i as f32 + 0.5) / before as f32);
    }
    if after > 0 {
        w = w.min(((len - i) as f32 - 0.5) / after as f32);
    }
    w
}

/// Un-normalized feather weight of `tile` at its local pixel `(x, y)`.
pub fn feather_weight(tile: &TileSpec, x: u32, y: u32) -> f32 {
    let m = tile.margins;
    let wx = ramp_at(x, tile.dest.width, m.left, m.right);
    let wy = ramp_at(y, tile.dest.height, m.top, m.bottom);
    wx.min(wy)
}

impl TileBlender {
    /// Blender for `grid` in `mode`. `BlendMode::None` expects one whole-image tile.
    pub fn new(grid: &TileGrid, mode: BlendMode) -> Self {
        let expected = match mode {
            BlendMode::None => 1,
            BlendMode::ClipBlend | BlendMode::LinearBlend => grid.len(),
        };
        let (output_width, output_height) = grid.output_dimensions();
        Self {
            mode,
            output_width,
            output_height,
            received: vec![false; expected],
            count: 0,
            channels: None,
            state: BlendState::Empty,
        }
    }

    pub fn mode(&self) -> BlendMode {
        self.mode
    }

    /// Tiles accepted so far.
    pub fn received(&self) -> usize {
        self.count
    }

    pub fn expected(&self) -> usize {
        self.received.len()
    }

    fn output_rect(&self) -> Rect {
        Rect::new(0, 0, self.output_width, self.output_height)
    }

    fn check_tile(&self, spec: &TileSpec, tile: &Image) -> Result<u8> {
        if spec.index >= self.received.len() {
            return Err(TileError::invalid_argument(
                "tile index",
                spec.index.to_string(),
                format!("grid has {} tiles", self.received.len()),
            ));
        }
        if self.received[spec.index] {
            return Err(TileError::invalid_argument(
                "tile index",
                spec.index.to_string(),
                "tile was already blended",
            ));
        }
        let dest = spec.dest;
        if dest.right() > self.output_width || dest.bottom() > self.output_height {
            return Err(TileError::invalid_argument(
                "tile dest",
                format!("{:?}", dest),
                "lies outside the output image",
            ));
        }
        let paste = spec.paste;
        if paste.width == 0
            || paste.height == 0
            || paste.x < dest.x
            || paste.y < dest.y
            || paste.right() > dest.right()
            || paste.bottom() > dest.bottom()
        {
            return Err(TileError::invalid_argument(
                "tile paste",
                format!("{:?}", paste),
                format!("must be a non-empty region inside dest {:?}", dest),
            ));
        }
        let expected = spec.expected_output_size();
        if tile.dimensions() != expected {
            return Err(TileError::tile_size_mismatch(
                spec.index,
                expected,
                tile.dimensions(),
            ));
        }
        match self.channels {
            Some(channels) if channels != tile.channels() => Err(
                TileError::tile_channel_mismatch(spec.index, channels, tile.channels()),
            ),
            _ => Ok(tile.channels()),
        }
    }

    /// Composite one processed tile.
    ///
    /// Fails with `TileSizeMismatch` when the tile is not the scaled size of
    /// its source rect. A failed add leaves the blender unusable for output;
    /// callers abort the run.
    pub fn add(&mut self, spec: &TileSpec, tile: Image) -> Result<()> {
        let channels = self.check_tile(spec, &tile)?;
        let pixels = self.output_width as usize * self.output_height as usize;

        match self.mode {
            BlendMode::None => {
                if spec.dest != self.output_rect() {
                    return Err(TileError::invalid_argument(
                        "tile dest",
                        format!("{:?}", spec.dest),
                        "a single-pass run must cover the whole output",
                    ));
                }
                self.state = BlendState::Single(tile);
            }
            BlendMode::ClipBlend => {
                if matches!(self.state, BlendState::Empty) {
                    self.state = BlendState::Clip(vec![0.0; pixels * channels as usize]);
                }
                if let BlendState::Clip(out) = &mut self.state {
                    paste_clipped(out, self.output_width, spec, &tile);
                }
            }
            BlendMode::LinearBlend => {
                if matches!(self.state, BlendState::Empty) {
                    self.state = BlendState::Linear {
                        accum: vec![0.0; pixels * channels as usize],
                        weights: vec![0.0; pixels],
                    };
                }
                if let BlendState::Linear { accum, weights } = &mut self.state {
                    accumulate_feathered(accum, weights, self.output_width, spec, &tile);
                }
            }
        }

        self.channels = Some(channels);
        self.received[spec.index] = true;
        self.count += 1;
        Ok(())
    }

    /// Total feather weight at an output pixel, before normalization.
    /// `None` outside linear mode or before the first tile.
    pub fn weight_sum(&self, x: u32, y: u32) -> Option<f32> {
        match &self.state {
            BlendState::Linear { weights, .. } if x < self.output_width && y < self.output_height => {
                Some(weights[y as usize * self.output_width as usize + x as usize])
            }
            _ => None,
        }
    }

    /// Produce the composited image. Fails if any tile is missing.
    pub fn finish(self) -> Result<Image> {
        if self.count != self.received.len() {
            return Err(TileError::incomplete_blend(self.count, self.received.len()));
        }
        let channels = self.channels.unwrap_or(1);
        match self.state {
            BlendState::Empty => Err(TileError::incomplete_blend(0, self.received.len())),
            BlendState::Single(image) => Ok(image),
            BlendState::Clip(data) => {
                Image::from_raw(self.output_width, self.output_height, channels, data)
            }
            BlendState::Linear { mut accum, weights } => {
                let c = channels as usize;
                for (pixel, &w) in accum.chunks_exact_mut(c).zip(weights.iter()) {
                    if w > 0.0 {
                        let inv = 1.0 / w;
                        for v in pixel.iter_mut() {
                            *v *= inv;
                        }
                    }
                }
                Image::from_raw(self.output_width, self.output_height, channels, accum)
            }
        }
    }
}

fn paste_clipped(out: &mut [f32], output_width: u32, spec: &TileSpec, tile: &Image) {
    let local = spec.local_paste();
    let c = tile.channels() as usize;
    let out_stride = output_width as usize * c;
    let run = local.width as usize * c;
    for row in 0..local.height {
        let src = tile.row_span(local.y + row, local.x, local.width);
        let start = (spec.paste.y + row) as usize * out_stride + spec.paste.x as usize * c;
        out[start..start + run].copy_from_slice(src);
    }
}

fn accumulate_feathered(
    accum: &mut [f32],
    weights: &mut [f32],
    output_width: u32,
    spec: &TileSpec,
    tile: &Image,
) {
    let m = spec.margins;
    let wx = axis_ramp(spec.dest.width, m.left, m.right);
    let wy = axis_ramp(spec.dest.height, m.top, m.bottom);
    let c = tile.channels() as usize;
    let ow = output_width as usize;

    for (ly, &row_w) in wy.iter().enumerate() {
        let src = tile.row_span(ly as u32, 0, spec.dest.width);
        let gy = spec.dest.y as usize + ly;
        for (lx, &col_w) in wx.iter().enumerate() {
            let w = row_w.min(col_w);
            let gi = gy * ow + spec.dest.x as usize + lx;
            weights[gi] += w;
            let dst = &mut accum[gi * c..gi * c + c];
            for (d, s) in dst.iter_mut().zip(&src[lx * c..lx * c + c]) {
                *d += s * w;
            }
        }
    }
}
