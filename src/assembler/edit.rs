use serde_json::{json, Map};
use std::ops::RangeInclusive;

use super::validate::{encode_image, http_url, in_range, non_empty, optional_text};
use crate::{
    error::{Result, StudioError},
    geometry::{build_mask, compute_expansion_placement, compute_region, MaskBitmap},
    models::{
        CanvasPlacement, EraseParams, ExpandParams, GenerationRequest, GenerativeFillParams,
        ImageSource, OperationKind, RegionRatios, Size,
    },
};

pub const FILL_RESULTS_RANGE: RangeInclusive<u32> = 1..=4;

/// Region masks are drawn by hand, not produced by segmentation.
const MASK_TYPE: &str = "manual";

fn region_mask(image_size: Size, ratios: &RegionRatios) -> Result<MaskBitmap> {
    let region = compute_region(image_size, ratios)?;
    if region.is_empty() {
        return Err(StudioError::invalid(format!(
            "mask region starting at ({}, {}) has no area inside the image",
            region.x0(),
            region.y0()
        )));
    }
    build_mask(image_size, &region, false)
}

pub fn generative_fill(input: &GenerativeFillParams) -> Result<GenerationRequest> {
    let num_results = in_range("number of variations", input.num_results, FILL_RESULTS_RANGE)?;
    let mask = region_mask(input.image_size, &input.region)?;

    let mut params = Map::new();
    params.insert("file".into(), json!(encode_image("image", &input.image)?));
    params.insert("mask_file".into(), json!(encode_image("mask", &mask.to_png()?)?));
    params.insert("mask_type".into(), json!(MASK_TYPE));
    params.insert("prompt".into(), json!(non_empty("prompt", &input.prompt)?));
    if let Some(negative) = optional_text(input.negative_prompt.as_deref()) {
        params.insert("negative_prompt".into(), json!(negative));
    }
    params.insert("num_results".into(), json!(num_results));
    params.insert("sync".into(), json!(input.sync));
    if input.seed != 0 {
        params.insert("seed".into(), json!(input.seed));
    }
    params.insert("content_moderation".into(), json!(input.content_moderation));

    Ok(GenerationRequest::new(
        OperationKind::GenerativeFill,
        params,
        input.sync,
        num_results as usize,
    ))
}

/// The mask marks the pixels to remove, with the same geometry as a fill.
pub fn erase(input: &EraseParams) -> Result<GenerationRequest> {
    let mask = region_mask(input.image_size, &input.region)?;

    let mut params = Map::new();
    params.insert("file".into(), json!(encode_image("image", &input.image)?));
    params.insert("mask_file".into(), json!(encode_image("mask", &mask.to_png()?)?));
    params.insert("mask_type".into(), json!(MASK_TYPE));
    params.insert("content_moderation".into(), json!(input.content_moderation));

    Ok(GenerationRequest::new(OperationKind::Erase, params, true, 1))
}

pub fn expand(input: &ExpandParams) -> Result<GenerationRequest> {
    let placement: CanvasPlacement = compute_expansion_placement(input.image_size, &input.edges)?;

    let mut params = Map::new();
    match &input.image {
        ImageSource::Bytes(bytes) => {
            params.insert("file".into(), json!(encode_image("image", bytes)?));
        }
        ImageSource::Url(url) => {
            params.insert("image_url".into(), json!(http_url("image url", url)?));
        }
    }
    params.insert("canvas_size".into(), json!(placement.canvas_size.as_pair()));
    params.insert(
        "original_image_size".into(),
        json!(placement.original_size.as_pair()),
    );
    params.insert(
        "original_image_location".into(),
        json!(placement.original_location.as_pair()),
    );
    params.insert("sync".into(), json!(input.sync));

    Ok(GenerationRequest::new(OperationKind::Expand, params, input.sync, 1))
}
