use crate::{
    error::{Result, StudioError},
    models::{CanvasPlacement, EdgeRatios, Point, Size},
};

fn check_edge(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StudioError::invalid(format!(
            "{} expansion ratio must be a non-negative number, got {}",
            name, value
        )))
    }
}

fn floor_to_u32(name: &str, value: f64) -> Result<u32> {
    let floored = value.floor();
    if floored > u32::MAX as f64 {
        return Err(StudioError::invalid(format!(
            "{} of {} does not fit a canvas dimension",
            name, floored
        )));
    }
    Ok(floored as u32)
}

/// Places `original` inside a larger outpainting canvas.
///
/// All results are floored: `canvas.w = floor(w * (1 + left + right))` and
/// `location.x = floor(w * left)`, likewise for height. If float error would
/// leave the canvas one pixel short of `location + original`, the canvas is
/// widened to fit, so the original always lies fully inside it.
pub fn compute_expansion_placement(original: Size, edges: &EdgeRatios) -> Result<CanvasPlacement> {
    if original.width == 0 || original.height == 0 {
        return Err(StudioError::invalid(format!(
            "original image dimensions must be non-zero, got {}x{}",
            original.width, original.height
        )));
    }
    check_edge("left", edges.left)?;
    check_edge("right", edges.right)?;
    check_edge("top", edges.top)?;
    check_edge("bottom", edges.bottom)?;

    let (canvas_w, x) = expand_axis("canvas width", original.width, edges.left, edges.right)?;
    let (canvas_h, y) = expand_axis("canvas height", original.height, edges.top, edges.bottom)?;

    log::debug!(
        "Expansion canvas {}x{} with original {}x{} at ({}, {})",
        canvas_w,
        canvas_h,
        original.width,
        original.height,
        x,
        y
    );

    Ok(CanvasPlacement {
        canvas_size: Size::new(canvas_w, canvas_h),
        original_size: original,
        original_location: Point::new(x, y),
    })
}

fn expand_axis(name: &str, extent: u32, leading: f64, trailing: f64) -> Result<(u32, u32)> {
    let extent_f = extent as f64;
    let canvas = floor_to_u32(name, extent_f * (1.0 + leading + trailing))?;
    let offset = floor_to_u32(name, extent_f * leading)?;
    let needed = offset as u64 + extent as u64;
    if needed > u32::MAX as u64 {
        return Err(StudioError::invalid(format!("{} overflows", name)));
    }
    Ok((canvas.max(needed as u32), offset))
}
