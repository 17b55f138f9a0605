// src/engine/io.rs
//
// I/O helpers: Source enum, decoding into engine images, encoding results.

use crate::engine::image::Image;
use crate::engine::limits::check_dimensions;
use crate::error::{Result, TileError};
use image::{ImageFormat, ImageReader};
use memmap2::Mmap;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Image source - in-memory data, memory-mapped files, or file paths (lazy loading)
#[derive(Clone, Debug)]
pub enum Source {
    /// In-memory encoded image data
    Memory(Arc<Vec<u8>>),
    /// Memory-mapped file (zero-copy access)
    Mapped(Arc<Mmap>),
    /// File path, read only when decoded
    Path(PathBuf),
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl Source {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Source::Memory(Arc::new(data))
    }

    /// Memory-map `path` for zero-copy decoding.
    pub fn map_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TileError::file_not_found(path_string(path)),
            _ => TileError::file_read_failed(path_string(path), e),
        })?;
        // SAFETY: the mapping is read-only. The file must not be truncated
        // while mapped, which holds for the lifetime of a decode call.
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| TileError::file_read_failed(path_string(path), e))?;
        Ok(Source::Mapped(Arc::new(mmap)))
    }

    /// Get the bytes directly - works for Memory and Mapped sources.
    /// Returns None only for Path sources (which are read on decode).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Source::Memory(data) => Some(data.as_slice()),
            Source::Mapped(mmap) => Some(mmap.as_ref()),
            Source::Path(_) => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Source::Path(p) => Some(p.as_path()),
            Source::Memory(_) | Source::Mapped(_) => None,
        }
    }

    /// Decode into an engine image.
    ///
    /// Dimensions are read from the header and checked against the engine
    /// limits before any pixels are decoded.
    pub fn decode(&self) -> Result<Image> {
        match self {
            Source::Memory(data) => decode_bytes(data.as_slice()),
            Source::Mapped(mmap) => decode_bytes(mmap.as_ref()),
            Source::Path(path) => {
                let data = std::fs::read(path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => TileError::file_not_found(path_string(path)),
                    _ => TileError::file_read_failed(path_string(path), e),
                })?;
                decode_bytes(&data)
            }
        }
    }
}

fn decode_bytes(bytes: &[u8]) -> Result<Image> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| TileError::decode_failed(format!("failed to read image header: {e}")))?;
    let format = reader
        .format()
        .ok_or_else(|| TileError::unsupported_format("unknown"))?;

    // Header-only probe; rejects oversized images before pixel allocation.
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| TileError::decode_failed(e.to_string()))?;
    check_dimensions(width as u64, height as u64)?;

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| TileError::decode_failed(e.to_string()))?;
    debug!(?format, width, height, "decoded source image");
    Image::from_dynamic(decoded)
}

/// Encoded formats the engine writes.
pub fn format_from_path(path: &Path) -> Result<ImageFormat> {
    let format = ImageFormat::from_path(path)
        .map_err(|_| TileError::unsupported_format(path_string(path)))?;
    match format {
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP => Ok(format),
        other => Err(TileError::unsupported_format(format!("{other:?}"))),
    }
}

/// Encode an engine image as PNG, JPEG or WebP.
///
/// JPEG has no alpha channel; alpha is dropped before encoding.
pub fn encode(image: &Image, format: ImageFormat) -> Result<Vec<u8>> {
    let name = format!("{format:?}").to_lowercase();
    let dynamic = image.to_dynamic8()?;
    let dynamic = match format {
        ImageFormat::Jpeg if dynamic.color().has_alpha() => {
            if image.channels() == 2 {
                image::DynamicImage::ImageLuma8(dynamic.to_luma8())
            } else {
                image::DynamicImage::ImageRgb8(dynamic.to_rgb8())
            }
        }
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP => dynamic,
        _ => return Err(TileError::unsupported_format(name)),
    };
    let mut buf = Vec::new();
    dynamic
        .write_to(&mut Cursor::new(&mut buf), format)
        .map_err(|e| TileError::encode_failed(name, e.to_string()))?;
    Ok(buf)
}

/// Encode and write `image`; the format follows the file extension.
pub fn save(image: &Image, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let format = format_from_path(path)?;
    let bytes = encode(image, format)?;
    std::fs::write(path, bytes).map_err(|e| TileError::file_write_failed(path_string(path), e))
}
