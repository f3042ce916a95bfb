use crate::{
    error::{Result, StudioError},
    models::{Region, RegionRatios, Size},
};

fn check_ratio(name: &str, value: f64, allow_zero: bool) -> Result<()> {
    let in_range =
        value.is_finite() && value <= 1.0 && (value > 0.0 || (allow_zero && value == 0.0));
    if in_range {
        Ok(())
    } else if allow_zero {
        Err(StudioError::invalid(format!("{} must be within [0, 1], got {}", name, value)))
    } else {
        Err(StudioError::invalid(format!("{} must be within (0, 1], got {}", name, value)))
    }
}

/// Converts a ratio box into a pixel rectangle inside `image`.
///
/// Start and size are truncated toward zero independently, then the end is
/// clipped to the image edge and the size re-derived from the clipped end.
/// Clipping the end (not the start) is what keeps `x0 + width <= image.width`
/// when `x0 + width` ratios sum past 1.
pub fn compute_region(image: Size, ratios: &RegionRatios) -> Result<Region> {
    if image.width == 0 || image.height == 0 {
        return Err(StudioError::invalid(format!(
            "image dimensions must be non-zero, got {}x{}",
            image.width, image.height
        )));
    }
    check_ratio("x0 ratio", ratios.x0, true)?;
    check_ratio("y0 ratio", ratios.y0, true)?;
    check_ratio("width ratio", ratios.width, false)?;
    check_ratio("height ratio", ratios.height, false)?;

    let (x0, width) = clip_axis(image.width, ratios.x0, ratios.width);
    let (y0, height) = clip_axis(image.height, ratios.y0, ratios.height);

    log::debug!(
        "Region {}x{} at ({}, {}) within {}x{} image",
        width,
        height,
        x0,
        y0,
        image.width,
        image.height
    );

    Ok(Region::from_parts(x0, y0, width, height))
}

fn clip_axis(extent: u32, start_ratio: f64, size_ratio: f64) -> (u32, u32) {
    // Ratios are validated to [0, 1], so both products stay within `extent`.
    let start = (extent as f64 * start_ratio).trunc() as u32;
    let size = (extent as f64 * size_ratio).trunc() as u32;
    let end = (start as u64 + size as u64).min(extent as u64) as u32;
    (start, end - start)
}
