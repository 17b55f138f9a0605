// src/engine/merge.rs
//
// MergeInput post-step: combine transform output with the original input at
// the input's resolution.
//
// - 1/2/3-channel output is a mask (luma for RGB, first channel otherwise) and
//   becomes the alpha of the input's colors.
// - 4-channel output is composited source-over onto the input.
// The merged image always carries an alpha channel.

use crate::engine::image::Image;
use crate::error::Result;
use image::imageops::{self, FilterType};

// BT.601 luma weights
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Bilinear resample of every channel to `width x height`.
pub fn resample(image: &Image, width: u32, height: u32) -> Result<Image> {
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }
    let planes: Vec<_> = (0..image.channels())
        .map(|c| imageops::resize(&image.channel_plane(c), width, height, FilterType::Triangle))
        .collect();
    Image::from_fn(width, height, image.channels(), |x, y, c| {
        planes[c as usize].get_pixel(x, y)[0]
    })
}

#[inline]
fn split_alpha(pixel: &[f32]) -> (&[f32], f32) {
    match pixel.len() {
        2 | 4 => (&pixel[..pixel.len() - 1], pixel[pixel.len() - 1]),
        _ => (pixel, 1.0),
    }
}

#[inline]
fn mask_value(pixel: &[f32]) -> f32 {
    match pixel.len() {
        3 => pixel[0] * LUMA_R + pixel[1] * LUMA_G + pixel[2] * LUMA_B,
        _ => pixel[0],
    }
}

/// Merge `output` with `input`; see module docs for the rules.
pub fn merge_input(input: &Image, output: Image) -> Result<Image> {
    let (width, height) = input.dimensions();
    let output = if output.dimensions() == (width, height) {
        output
    } else {
        resample(&output, width, height)?
    };

    let color_channels = match input.channels() {
        2 | 4 => input.channels() - 1,
        c => c,
    };
    let merged_channels = color_channels + 1;
    let composite = output.channels() == 4;

    let mut merged = Image::new(width, height, merged_channels)?;
    for y in 0..height {
        for x in 0..width {
            let (in_color, in_alpha) = split_alpha(input.pixel(x, y));
            let out_pixel = output.pixel(x, y);
            let dst = merged.pixel_mut(x, y);

            if composite {
                let a = out_pixel[3];
                if color_channels == 3 {
                    for c in 0..3 {
                        dst[c] = out_pixel[c] * a + in_color[c] * (1.0 - a);
                    }
                } else {
                    dst[0] = mask_value(&out_pixel[..3]) * a + in_color[0] * (1.0 - a);
                }
                dst[color_channels as usize] = a + in_alpha * (1.0 - a);
            } else {
                let mask = mask_value(out_pixel).clamp(0.0, 1.0);
                dst[..color_channels as usize].copy_from_slice(in_color);
                dst[color_channels as usize] = in_alpha * mask;
            }
        }
    }
    Ok(merged)
}
