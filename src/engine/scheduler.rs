// src/engine/scheduler.rs
//
// Tile grid computation: where each tile reads from, where it lands after
// scaling, and which part of it is committed under clipped blending.
//
// Per axis the tiles start at 0, stride, 2*stride, ... (stride = max - overlap)
// while a full tile still ends before the edge, then one final tile is anchored
// to the far edge. Every tile therefore has the full requested size whenever the
// image is larger than one tile, at the cost of extra overlap on the last one.

use crate::engine::limits::check_dimensions;
use crate::error::{Result, TileError};
use crate::ops::{BlendMode, TileConfig};
use tracing::debug;

/// Half-open pixel rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn scaled(&self, factor: u32) -> Rect {
        Rect::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// Move the origin by `(-dx, -dy)`.
    pub fn relative_to(&self, dx: u32, dy: u32) -> Rect {
        Rect::new(self.x - dx, self.y - dy, self.width, self.height)
    }
}

/// Overlap shared with the neighbor on each side, in output pixels.
/// Zero on sides that touch the image boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Margins {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Placement of one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileSpec {
    /// Row-major position, used for progress reporting
    pub index: usize,
    pub row: u32,
    pub col: u32,
    /// Region read from the input image
    pub source: Rect,
    /// `source` scaled into output coordinates
    pub dest: Rect,
    /// Part of `dest` committed under clipped blending (output coordinates)
    pub paste: Rect,
    pub margins: Margins,
}

impl TileSpec {
    /// One tile covering a whole `width x height` image (single-pass runs).
    pub fn full_frame(width: u32, height: u32, scale_factor: u32) -> Self {
        let source = Rect::new(0, 0, width, height);
        let dest = source.scaled(scale_factor);
        Self {
            index: 0,
            row: 0,
            col: 0,
            source,
            dest,
            paste: dest,
            margins: Margins::default(),
        }
    }

    /// `paste` in the produced tile's own coordinate space.
    pub fn local_paste(&self) -> Rect {
        self.paste.relative_to(self.dest.x, self.dest.y)
    }

    /// Size the transform must return for this tile.
    pub fn expected_output_size(&self) -> (u32, u32) {
        (self.dest.width, self.dest.height)
    }
}

/// Ordered tile placements for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    tiles: Vec<TileSpec>,
    columns: u32,
    rows: u32,
    input_width: u32,
    input_height: u32,
    output_width: u32,
    output_height: u32,
    scale_factor: u32,
    overlap: u32,
}

impl TileGrid {
    pub fn tiles(&self) -> &[TileSpec] {
        &self.tiles
    }

    pub fn get(&self, index: usize) -> Option<&TileSpec> {
        self.tiles.get(index)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn input_dimensions(&self) -> (u32, u32) {
        (self.input_width, self.input_height)
    }

    pub fn output_dimensions(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }

    pub fn output_width(&self) -> u32 {
        self.output_width
    }

    pub fn output_height(&self) -> u32 {
        self.output_height
    }

    pub fn scale_factor(&self) -> u32 {
        self.scale_factor
    }

    pub fn overlap(&self) -> u32 {
        self.overlap
    }

    /// Blend mode actually used: a single tile never needs blending.
    pub fn effective_mode(&self, configured: BlendMode) -> BlendMode {
        if self.tiles.len() == 1 {
            BlendMode::None
        } else {
            configured
        }
    }
}

/// One tile interval on an axis, plus its paste interval and edge overlaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct AxisTile {
    start: u32,
    end: u32,
    paste_start: u32,
    paste_end: u32,
    overlap_before: u32,
    overlap_after: u32,
}

/// Tile start positions along one axis.
///
/// `dimension <= max_tile_size` yields a single tile at 0.
pub fn axis_starts(dimension: u32, max_tile_size: u32, overlap: u32) -> Vec<u32> {
    if dimension <= max_tile_size {
        return vec![0];
    }
    let stride = max_tile_size - overlap;
    let mut starts = Vec::with_capacity((dimension / stride) as usize + 2);
    let mut start = 0;
    while start + max_tile_size < dimension {
        starts.push(start);
        start += stride;
    }
    starts.push(dimension - max_tile_size);
    starts
}

fn axis_tiles(dimension: u32, max_tile_size: u32, overlap: u32) -> Vec<AxisTile> {
    let tile_len = max_tile_size.min(dimension);
    let spans: Vec<(u32, u32)> = axis_starts(dimension, max_tile_size, overlap)
        .into_iter()
        .map(|start| (start, start + tile_len))
        .collect();

    let last = spans.len() - 1;
    spans
        .iter()
        .enumerate()
        .map(|(k, &(start, end))| {
            // Cut at the middle of the region shared with each neighbor, so
            // paste intervals partition the axis even where the anchored final
            // tile overlaps more than `overlap`.
            let (paste_start, overlap_before) = if k == 0 {
                (0, 0)
            } else {
                let prev_end = spans[k - 1].1;
                ((start + prev_end) / 2, prev_end - start)
            };
            let (paste_end, overlap_after) = if k == last {
                (dimension, 0)
            } else {
                let next_start = spans[k + 1].0;
                ((next_start + end) / 2, end - next_start)
            };
            AxisTile {
                start,
                end,
                paste_start,
                paste_end,
                overlap_before,
                overlap_after,
            }
        })
        .collect()
}

/// Compute the tile grid for an image of `width x height`.
///
/// Pure and deterministic. Fails with `InvalidArgument` for an unusable
/// configuration and with a limit error when the scaled output is too large.
pub fn compute_grid(width: u32, height: u32, config: &TileConfig) -> Result<TileGrid> {
    config.validate()?;
    if width == 0 || height == 0 {
        return Err(TileError::invalid_argument(
            "image dimensions",
            format!("{width}x{height}"),
            "width and height must be positive",
        ));
    }

    let scale = config.scale_factor;
    let output_width = width as u64 * scale as u64;
    let output_height = height as u64 * scale as u64;
    check_dimensions(output_width, output_height)?;

    let columns = axis_tiles(width, config.max_tile_size, config.overlap);
    let rows = axis_tiles(height, config.max_tile_size, config.overlap);

    let mut tiles = Vec::with_capacity(columns.len() * rows.len());
    for (row, ry) in rows.iter().enumerate() {
        for (col, cx) in columns.iter().enumerate() {
            let source = Rect::new(cx.start, ry.start, cx.end - cx.start, ry.end - ry.start);
            let paste = Rect::new(
                cx.paste_start,
                ry.paste_start,
                cx.paste_end - cx.paste_start,
                ry.paste_end - ry.paste_start,
            )
            .scaled(scale);
            tiles.push(TileSpec {
                index: tiles.len(),
                row: row as u32,
                col: col as u32,
                source,
                dest: source.scaled(scale),
                paste,
                margins: Margins {
                    left: cx.overlap_before * scale,
                    top: ry.overlap_before * scale,
                    right: cx.overlap_after * scale,
                    bottom: ry.overlap_after * scale,
                },
            });
        }
    }

    debug!(
        width,
        height,
        max_tile_size = config.max_tile_size,
        overlap = config.overlap,
        scale,
        columns = columns.len(),
        rows = rows.len(),
        "computed tile grid"
    );

    Ok(TileGrid {
        tiles,
        columns: columns.len() as u32,
        rows: rows.len() as u32,
        input_width: width,
        input_height: height,
        output_width: output_width as u32,
        output_height: output_height as u32,
        scale_factor: scale,
        overlap: config.overlap,
    })
}
