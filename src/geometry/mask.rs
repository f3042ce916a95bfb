use image::{GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use std::io::Cursor;

use crate::{
    error::{Result, StudioError},
    models::{Region, Size},
};

pub const MASK_SELECTED: u8 = 255;
pub const MASK_BACKGROUND: u8 = 0;

/// Default preview tint: semi-transparent red.
pub const PREVIEW_COLOR: [u8; 3] = [255, 0, 0];
pub const PREVIEW_ALPHA: u8 = 128;

/// Single-channel selection map; every pixel is 0 or 255.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskBitmap {
    pixels: GrayImage,
}

impl MaskBitmap {
    pub fn size(&self) -> Size {
        Size::new(self.pixels.width(), self.pixels.height())
    }

    pub fn is_selected(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y).0[0] == MASK_SELECTED
    }

    pub fn selected_count(&self) -> u64 {
        self.pixels
            .pixels()
            .filter(|p| p.0[0] == MASK_SELECTED)
            .count() as u64
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.pixels
    }

    /// PNG encoding sent to the service as `mask_file`.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.pixels.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

/// Builds a mask of `image` size with 255 inside `region` and 0 elsewhere,
/// or the complement when `invert` is set.
pub fn build_mask(image: Size, region: &Region, invert: bool) -> Result<MaskBitmap> {
    if region.x_end() > image.width || region.y_end() > image.height {
        return Err(StudioError::invalid(format!(
            "region ({}, {}) {}x{} exceeds {}x{} image",
            region.x0(),
            region.y0(),
            region.width(),
            region.height(),
            image.width,
            image.height
        )));
    }

    let (inside, outside) = if invert {
        (MASK_BACKGROUND, MASK_SELECTED)
    } else {
        (MASK_SELECTED, MASK_BACKGROUND)
    };

    let pixels = GrayImage::from_fn(image.width, image.height, |x, y| {
        Luma([if region.contains(x, y) { inside } else { outside }])
    });

    Ok(MaskBitmap { pixels })
}

/// Preview layer: `color` at `alpha` over selected pixels, transparent elsewhere.
pub fn build_overlay(mask: &MaskBitmap, color: [u8; 3], alpha: u8) -> RgbaImage {
    let [r, g, b] = color;
    RgbaImage::from_fn(mask.pixels.width(), mask.pixels.height(), |x, y| {
        if mask.is_selected(x, y) {
            Rgba([r, g, b, alpha])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Straight-alpha "over" composite of `overlay` onto `source`.
pub fn compose_preview(source: &RgbaImage, overlay: &RgbaImage) -> Result<RgbaImage> {
    if source.dimensions() != overlay.dimensions() {
        return Err(StudioError::invalid(format!(
            "overlay {:?} does not match image {:?}",
            overlay.dimensions(),
            source.dimensions()
        )));
    }

    let mut out = source.clone();
    for (dst, top) in out.pixels_mut().zip(overlay.pixels()) {
        *dst = blend_over(*dst, *top);
    }
    Ok(out)
}

fn blend_over(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let top_a = top.0[3] as f32 / 255.0;
    let bottom_a = bottom.0[3] as f32 / 255.0;
    let out_a = top_a + bottom_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut px = [0u8; 4];
    for c in 0..3 {
        let value =
            (top.0[c] as f32 * top_a + bottom.0[c] as f32 * bottom_a * (1.0 - top_a)) / out_a;
        px[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    px[3] = (out_a * 255.0).round() as u8;
    Rgba(px)
}
