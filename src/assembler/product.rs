use serde_json::{json, Map, Value};
use std::ops::RangeInclusive;

use super::validate::{encode_image, hex_color, in_range, non_empty, optional_text, unit_interval};
use crate::{
    error::{Result, StudioError},
    models::{
        GenerationRequest, LifestyleImageParams, LifestyleTextParams, ManualPosition,
        OperationKind, PackshotParams, PlacementParams, PlacementType, ProductOptions,
        ShadowParams, ShadowType,
    },
};

pub const SHADOW_OFFSET_RANGE: RangeInclusive<i32> = -50..=50;
pub const SHADOW_INTENSITY_RANGE: RangeInclusive<i32> = 0..=100;
pub const SHADOW_BLUR_RANGE: RangeInclusive<i32> = 0..=50;
pub const FLOAT_SHADOW_RANGE: RangeInclusive<i32> = -100..=100;
/// Used when a float shadow omits its width.
pub const DEFAULT_FLOAT_SHADOW_WIDTH: i32 = 0;
/// Used when a float shadow omits its height.
pub const DEFAULT_FLOAT_SHADOW_HEIGHT: i32 = 70;

pub const LIFESTYLE_RESULTS_RANGE: RangeInclusive<u32> = 1..=8;
pub const SHOT_SIZE_RANGE: RangeInclusive<u32> = 100..=2000;
/// Used when a placement that takes a shot size does not supply one.
pub const DEFAULT_SHOT_SIZE: (u32, u32) = (1000, 1000);
pub const PADDING_RANGE: RangeInclusive<u32> = 0..=1000;
pub const FOREGROUND_SIZE_RANGE: RangeInclusive<u32> = 50..=1000;
pub const FOREGROUND_LOCATION_RANGE: RangeInclusive<i32> = -500..=1500;

fn apply_options(params: &mut Map<String, Value>, options: &ProductOptions) {
    if let Some(sku) = optional_text(options.sku.as_deref()) {
        params.insert("sku".into(), json!(sku));
    }
    params.insert("force_rmbg".into(), json!(options.force_rmbg));
    params.insert("content_moderation".into(), json!(options.content_moderation));
}

pub fn packshot(input: &PackshotParams) -> Result<GenerationRequest> {
    let mut params = Map::new();
    params.insert("file".into(), json!(encode_image("image", &input.image)?));
    params.insert(
        "background_color".into(),
        json!(hex_color("background color", &input.background_color)?),
    );
    apply_options(&mut params, &input.options);

    Ok(GenerationRequest::new(OperationKind::Packshot, params, true, 1))
}

pub fn shadow(input: &ShadowParams) -> Result<GenerationRequest> {
    let shadow_type: ShadowType = input.shadow_type.parse()?;

    let mut params = Map::new();
    params.insert("file".into(), json!(encode_image("image", &input.image)?));
    params.insert("type".into(), json!(shadow_type.as_str()));
    if let Some(color) = &input.background_color {
        params.insert(
            "background_color".into(),
            json!(hex_color("background color", color)?),
        );
    }
    params.insert(
        "shadow_color".into(),
        json!(hex_color("shadow color", &input.shadow_color)?),
    );
    params.insert(
        "shadow_offset".into(),
        json!([
            in_range("shadow x offset", input.offset.0, SHADOW_OFFSET_RANGE)?,
            in_range("shadow y offset", input.offset.1, SHADOW_OFFSET_RANGE)?,
        ]),
    );
    params.insert(
        "shadow_intensity".into(),
        json!(in_range("shadow intensity", input.intensity, SHADOW_INTENSITY_RANGE)?),
    );
    params.insert(
        "shadow_blur".into(),
        json!(in_range("shadow blur", input.blur, SHADOW_BLUR_RANGE)?),
    );

    // Width and height only shape float shadows; other types never send them.
    if shadow_type == ShadowType::Float {
        let width = input.float_width.unwrap_or(DEFAULT_FLOAT_SHADOW_WIDTH);
        let height = input.float_height.unwrap_or(DEFAULT_FLOAT_SHADOW_HEIGHT);
        params.insert(
            "shadow_width".into(),
            json!(in_range("shadow width", width, FLOAT_SHADOW_RANGE)?),
        );
        params.insert(
            "shadow_height".into(),
            json!(in_range("shadow height", height, FLOAT_SHADOW_RANGE)?),
        );
    }
    apply_options(&mut params, &input.options);

    Ok(GenerationRequest::new(OperationKind::Shadow, params, true, 1))
}

/// Validates the placement group and inserts only the keys that apply to
/// the chosen placement type.
fn apply_placement(params: &mut Map<String, Value>, placement: &PlacementParams) -> Result<()> {
    let placement_type: PlacementType = placement.placement_type.parse()?;
    params.insert("placement_type".into(), json!(placement_type.as_str()));

    if placement_type.uses_shot_size() {
        let (w, h) = placement.shot_size.unwrap_or(DEFAULT_SHOT_SIZE);
        params.insert(
            "shot_size".into(),
            json!([
                in_range("shot width", w, SHOT_SIZE_RANGE)?,
                in_range("shot height", h, SHOT_SIZE_RANGE)?,
            ]),
        );
    }

    match placement_type {
        PlacementType::ManualPlacement => {
            if placement.manual_positions.is_empty() {
                return Err(StudioError::invalid(
                    "manual placement needs at least one position",
                ));
            }
            let mut positions: Vec<&'static str> = Vec::new();
            for raw in &placement.manual_positions {
                let position = raw.parse::<ManualPosition>()?.as_str();
                if !positions.contains(&position) {
                    positions.push(position);
                }
            }
            params.insert("manual_placement_selection".into(), json!(positions));
        }
        PlacementType::ManualPadding => {
            let padding = placement.padding.ok_or_else(|| {
                StudioError::invalid("manual padding needs [left, right, top, bottom] values")
            })?;
            let names = ["left padding", "right padding", "top padding", "bottom padding"];
            let mut values = [0u32; 4];
            for (slot, (name, value)) in values.iter_mut().zip(names.iter().zip(padding)) {
                *slot = in_range(name, value, PADDING_RANGE)?;
            }
            params.insert("padding_values".into(), json!(values));
        }
        PlacementType::CustomCoordinates => {
            let (w, h) = placement.foreground_size.ok_or_else(|| {
                StudioError::invalid("custom coordinates need a foreground size")
            })?;
            let (x, y) = placement.foreground_location.ok_or_else(|| {
                StudioError::invalid("custom coordinates need a foreground location")
            })?;
            params.insert(
                "foreground_image_size".into(),
                json!([
                    in_range("foreground width", w, FOREGROUND_SIZE_RANGE)?,
                    in_range("foreground height", h, FOREGROUND_SIZE_RANGE)?,
                ]),
            );
            params.insert(
                "foreground_image_location".into(),
                json!([
                    in_range("foreground x", x, FOREGROUND_LOCATION_RANGE)?,
                    in_range("foreground y", y, FOREGROUND_LOCATION_RANGE)?,
                ]),
            );
        }
        PlacementType::Original | PlacementType::Automatic => {}
    }

    Ok(())
}

pub fn lifestyle_by_text(input: &LifestyleTextParams) -> Result<GenerationRequest> {
    let num_results = in_range("number of results", input.num_results, LIFESTYLE_RESULTS_RANGE)?;

    let mut params = Map::new();
    params.insert("file".into(), json!(encode_image("image", &input.image)?));
    params.insert(
        "scene_description".into(),
        json!(non_empty("scene description", &input.scene_description)?),
    );
    apply_placement(&mut params, &input.placement)?;
    params.insert("num_results".into(), json!(num_results));
    params.insert("sync".into(), json!(input.sync));
    params.insert("fast".into(), json!(input.fast));
    params.insert("optimize_description".into(), json!(input.optimize_description));
    params.insert("original_quality".into(), json!(input.original_quality));
    if !input.fast {
        if let Some(exclude) = optional_text(input.exclude_elements.as_deref()) {
            params.insert("exclude_elements".into(), json!(exclude));
        }
    }
    apply_options(&mut params, &input.options);

    Ok(GenerationRequest::new(
        OperationKind::LifestyleByText,
        params,
        input.sync,
        num_results as usize,
    ))
}

pub fn lifestyle_by_image(input: &LifestyleImageParams) -> Result<GenerationRequest> {
    let num_results = in_range("number of results", input.num_results, LIFESTYLE_RESULTS_RANGE)?;

    let mut params = Map::new();
    params.insert("file".into(), json!(encode_image("image", &input.image)?));
    params.insert(
        "ref_image_file".into(),
        json!(encode_image("reference image", &input.reference_image)?),
    );
    apply_placement(&mut params, &input.placement)?;
    params.insert("num_results".into(), json!(num_results));
    params.insert("sync".into(), json!(input.sync));
    params.insert("original_quality".into(), json!(input.original_quality));
    params.insert("enhance_ref_image".into(), json!(input.enhance_reference));
    params.insert(
        "ref_image_influence".into(),
        json!(unit_interval("reference influence", input.reference_influence)?),
    );
    apply_options(&mut params, &input.options);

    Ok(GenerationRequest::new(
        OperationKind::LifestyleByImage,
        params,
        input.sync,
        num_results as usize,
    ))
}
