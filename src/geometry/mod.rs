//! Pixel geometry for masks and outpainting canvases.
//!
//! Everything here is pure and deterministic: the same inputs always give
//! the same rectangles, masks and placements.

pub mod mask;
pub mod placement;
pub mod region;

use image::ImageReader;
use std::io::Cursor;

use crate::{
    error::{Result, StudioError},
    models::Size,
};

pub use mask::{build_mask, build_overlay, compose_preview, MaskBitmap};
pub use placement::compute_expansion_placement;
pub use region::compute_region;

/// Reads the pixel dimensions of an encoded PNG or JPEG without decoding it.
pub fn image_size(bytes: &[u8]) -> Result<Size> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| StudioError::ImageError(e.to_string()))?
        .into_dimensions()?;
    Ok(Size::new(width, height))
}
