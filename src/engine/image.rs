// src/engine/image.rs
//
// Sample buffer passed between the executor, the transform and the blender.
// Samples are f32 in [0, 1], row-major, channels interleaved.

use crate::engine::scheduler::Rect;
use crate::error::{Result, TileError};
use image::{
    ColorType, DynamicImage, GrayAlphaImage, GrayImage, ImageBuffer, RgbImage, RgbaImage,
};

/// Largest channel count the engine handles (RGBA).
pub const MAX_CHANNELS: u8 = 4;

/// An owned image buffer.
///
/// Ownership moves with each processing step: the executor hands a tile to the
/// transform by value and takes the produced tile back by value.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<f32>,
}

fn check_layout(width: u32, height: u32, channels: u8, len: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(TileError::invalid_argument(
            "image dimensions",
            format!("{width}x{height}"),
            "width and height must be positive",
        ));
    }
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(TileError::invalid_argument(
            "channels",
            channels.to_string(),
            "expected 1 to 4 channels",
        ));
    }
    let expected = width as usize * height as usize * channels as usize;
    if len != expected {
        return Err(TileError::invalid_argument(
            "image buffer",
            format!("{len} samples"),
            format!("{width}x{height}x{channels} needs {expected} samples"),
        ));
    }
    Ok(())
}

#[inline]
fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl Image {
    /// Black (all zero) image.
    pub fn new(width: u32, height: u32, channels: u8) -> Result<Self> {
        Self::filled(width, height, channels, 0.0)
    }

    pub fn filled(width: u32, height: u32, channels: u8, value: f32) -> Result<Self> {
        check_layout(width, height, channels, width as usize * height as usize * channels as usize)?;
        Ok(Self {
            width,
            height,
            channels,
            data: vec![value; width as usize * height as usize * channels as usize],
        })
    }

    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<f32>) -> Result<Self> {
        check_layout(width, height, channels, data.len())?;
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Build an image sample by sample; `f(x, y, channel)`.
    pub fn from_fn(
        width: u32,
        height: u32,
        channels: u8,
        mut f: impl FnMut(u32, u32, u8) -> f32,
    ) -> Result<Self> {
        let mut image = Self::new(width, height, channels)?;
        let mut i = 0;
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    image.data[i] = f(x, y, c);
                    i += 1;
                }
            }
        }
        Ok(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<f32> {
        self.data
    }

    /// Samples per row.
    #[inline]
    pub(crate) fn row_stride(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.row_stride() + x as usize * self.channels as usize
    }

    /// All channels of one pixel. Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        let start = self.offset(x, y);
        &self.data[start..start + self.channels as usize]
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [f32] {
        let start = self.offset(x, y);
        let channels = self.channels as usize;
        &mut self.data[start..start + channels]
    }

    /// One row of samples restricted to `[x, x + width)`.
    #[inline]
    pub(crate) fn row_span(&self, y: u32, x: u32, width: u32) -> &[f32] {
        let start = self.offset(x, y);
        &self.data[start..start + width as usize * self.channels as usize]
    }

    /// Copy a region out into a new image.
    pub fn crop(&self, rect: Rect) -> Result<Image> {
        if rect.width == 0
            || rect.height == 0
            || rect.right() > self.width
            || rect.bottom() > self.height
        {
            return Err(TileError::invalid_argument(
                "crop rect",
                format!(
                    "({}, {}) {}x{}",
                    rect.x, rect.y, rect.width, rect.height
                ),
                format!("must lie inside {}x{}", self.width, self.height),
            ));
        }
        let mut data = Vec::with_capacity(rect.area() as usize * self.channels as usize);
        for y in rect.y..rect.bottom() {
            data.extend_from_slice(self.row_span(y, rect.x, rect.width));
        }
        Ok(Image {
            width: rect.width,
            height: rect.height,
            channels: self.channels,
            data,
        })
    }

    /// Apply `f` to every sample in place.
    pub fn map_samples(mut self, f: impl Fn(f32) -> f32) -> Self {
        for v in self.data.iter_mut() {
            *v = f(*v);
        }
        self
    }

    /// `1 - v` on every channel.
    pub fn invert(self) -> Self {
        self.map_samples(|v| 1.0 - v)
    }

    /// Convert a decoded image, scaling integer samples into `[0, 1]`.
    pub fn from_dynamic(img: DynamicImage) -> Result<Self> {
        let (width, height) = (img.width(), img.height());
        let (channels, data) = match img.color() {
            ColorType::L8 | ColorType::L16 => (1, img.to_luma32f().into_raw()),
            ColorType::La8 | ColorType::La16 => (2, img.to_luma_alpha32f().into_raw()),
            color if color.has_alpha() => (4, img.to_rgba32f().into_raw()),
            _ => (3, img.to_rgb32f().into_raw()),
        };
        Self::from_raw(width, height, channels, data)
    }

    /// Quantize to an 8-bit image of the matching color type.
    pub fn to_dynamic8(&self) -> Result<DynamicImage> {
        let bytes: Vec<u8> = self.data.iter().map(|&v| quantize(v)).collect();
        let (w, h) = (self.width, self.height);
        let built = match self.channels {
            1 => GrayImage::from_raw(w, h, bytes).map(DynamicImage::ImageLuma8),
            2 => GrayAlphaImage::from_raw(w, h, bytes).map(DynamicImage::ImageLumaA8),
            3 => RgbImage::from_raw(w, h, bytes).map(DynamicImage::ImageRgb8),
            _ => RgbaImage::from_raw(w, h, bytes).map(DynamicImage::ImageRgba8),
        };
        built.ok_or_else(|| {
            TileError::internal_panic(format!(
                "buffer does not fit {}x{}x{}",
                w, h, self.channels
            ))
        })
    }

    /// View a single channel as an `image` buffer (used for resampling).
    pub(crate) fn channel_plane(&self, channel: u8) -> ImageBuffer<image::Luma<f32>, Vec<f32>> {
        let plane: Vec<f32> = self
            .data
            .iter()
            .skip(channel as usize)
            .step_by(self.channels as usize)
            .copied()
            .collect();
        ImageBuffer::from_raw(self.width, self.height, plane)
            .unwrap_or_else(|| ImageBuffer::new(self.width, self.height))
    }
}
