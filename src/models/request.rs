use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::StudioError;
use crate::models::geometry::{EdgeRatios, RegionRatios, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Packshot,
    Shadow,
    LifestyleByText,
    LifestyleByImage,
    GenerativeFill,
    Erase,
    Expand,
    EnhancePrompt,
}

impl OperationKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            OperationKind::Packshot => "product/packshot",
            OperationKind::Shadow => "product/shadow",
            OperationKind::LifestyleByText => "product/lifestyle_shot_by_text",
            OperationKind::LifestyleByImage => "product/lifestyle_shot_by_image",
            OperationKind::GenerativeFill => "gen_fill",
            OperationKind::Erase => "eraser",
            OperationKind::Expand => "image_expansion",
            OperationKind::EnhancePrompt => "prompt_enhancer",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Packshot => "packshot",
            OperationKind::Shadow => "shadow",
            OperationKind::LifestyleByText => "lifestyle_by_text",
            OperationKind::LifestyleByImage => "lifestyle_by_image",
            OperationKind::GenerativeFill => "generative_fill",
            OperationKind::Erase => "erase",
            OperationKind::Expand => "expand",
            OperationKind::EnhancePrompt => "enhance_prompt",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the product lands in a lifestyle shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementType {
    Original,
    Automatic,
    ManualPlacement,
    ManualPadding,
    CustomCoordinates,
}

impl PlacementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementType::Original => "original",
            PlacementType::Automatic => "automatic",
            PlacementType::ManualPlacement => "manual_placement",
            PlacementType::ManualPadding => "manual_padding",
            PlacementType::CustomCoordinates => "custom_coordinates",
        }
    }

    /// Whether a target shot size applies to this placement.
    pub fn uses_shot_size(&self) -> bool {
        matches!(
            self,
            PlacementType::Automatic
                | PlacementType::ManualPlacement
                | PlacementType::CustomCoordinates
        )
    }
}

impl FromStr for PlacementType {
    type Err = StudioError;

    /// Accepts the wire names and the control panel labels ("Manual Padding").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "original" => Ok(PlacementType::Original),
            "automatic" => Ok(PlacementType::Automatic),
            "manual_placement" => Ok(PlacementType::ManualPlacement),
            "manual_padding" => Ok(PlacementType::ManualPadding),
            "custom_coordinates" => Ok(PlacementType::CustomCoordinates),
            other => Err(StudioError::invalid(format!(
                "unknown placement type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualPosition {
    UpperLeft,
    UpperRight,
    BottomLeft,
    BottomRight,
    RightCenter,
    LeftCenter,
    UpperCenter,
    BottomCenter,
    CenterVertical,
    CenterHorizontal,
}

impl ManualPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManualPosition::UpperLeft => "upper_left",
            ManualPosition::UpperRight => "upper_right",
            ManualPosition::BottomLeft => "bottom_left",
            ManualPosition::BottomRight => "bottom_right",
            ManualPosition::RightCenter => "right_center",
            ManualPosition::LeftCenter => "left_center",
            ManualPosition::UpperCenter => "upper_center",
            ManualPosition::BottomCenter => "bottom_center",
            ManualPosition::CenterVertical => "center_vertical",
            ManualPosition::CenterHorizontal => "center_horizontal",
        }
    }
}

impl FromStr for ManualPosition {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "upper_left" => Ok(ManualPosition::UpperLeft),
            "upper_right" => Ok(ManualPosition::UpperRight),
            "bottom_left" => Ok(ManualPosition::BottomLeft),
            "bottom_right" => Ok(ManualPosition::BottomRight),
            "right_center" => Ok(ManualPosition::RightCenter),
            "left_center" => Ok(ManualPosition::LeftCenter),
            "upper_center" => Ok(ManualPosition::UpperCenter),
            "bottom_center" => Ok(ManualPosition::BottomCenter),
            "center_vertical" => Ok(ManualPosition::CenterVertical),
            "center_horizontal" => Ok(ManualPosition::CenterHorizontal),
            other => Err(StudioError::invalid(format!(
                "unknown manual placement '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowType {
    Natural,
    Drop,
    Float,
}

impl ShadowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShadowType::Natural => "natural",
            ShadowType::Drop => "drop",
            ShadowType::Float => "float",
        }
    }
}

impl FromStr for ShadowType {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "natural" => Ok(ShadowType::Natural),
            "drop" => Ok(ShadowType::Drop),
            "float" => Ok(ShadowType::Float),
            other => Err(StudioError::invalid(format!("unknown shadow type '{}'", other))),
        }
    }
}

/// Input image: uploaded bytes, or a URL the service fetches itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Url(String),
}

/// Flags shared by the product operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductOptions {
    pub sku: Option<String>,
    #[serde(default)]
    pub force_rmbg: bool,
    #[serde(default)]
    pub content_moderation: bool,
}

#[derive(Debug, Clone)]
pub struct PackshotParams {
    pub image: Vec<u8>,
    pub background_color: String,
    pub options: ProductOptions,
}

#[derive(Debug, Clone)]
pub struct ShadowParams {
    pub image: Vec<u8>,
    pub shadow_type: String,
    /// `None` keeps the background transparent.
    pub background_color: Option<String>,
    pub shadow_color: String,
    pub offset: (i32, i32),
    pub intensity: i32,
    pub blur: i32,
    /// Float shadows only.
    pub float_width: Option<i32>,
    /// Float shadows only.
    pub float_height: Option<i32>,
    pub options: ProductOptions,
}

/// Placement inputs as the control panel collects them; the assembler keeps
/// only the group that matches `placement_type`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacementParams {
    pub placement_type: String,
    pub shot_size: Option<(u32, u32)>,
    #[serde(default)]
    pub manual_positions: Vec<String>,
    pub padding: Option<[u32; 4]>,
    pub foreground_size: Option<(u32, u32)>,
    pub foreground_location: Option<(i32, i32)>,
}

#[derive(Debug, Clone)]
pub struct LifestyleTextParams {
    pub image: Vec<u8>,
    pub scene_description: String,
    pub placement: PlacementParams,
    pub num_results: u32,
    pub sync: bool,
    pub fast: bool,
    pub optimize_description: bool,
    pub original_quality: bool,
    /// Ignored in fast mode.
    pub exclude_elements: Option<String>,
    pub options: ProductOptions,
}

#[derive(Debug, Clone)]
pub struct LifestyleImageParams {
    pub image: Vec<u8>,
    pub reference_image: Vec<u8>,
    pub placement: PlacementParams,
    pub num_results: u32,
    pub sync: bool,
    pub original_quality: bool,
    pub enhance_reference: bool,
    pub reference_influence: f64,
    pub options: ProductOptions,
}

#[derive(Debug, Clone)]
pub struct GenerativeFillParams {
    pub image: Vec<u8>,
    pub image_size: Size,
    pub region: RegionRatios,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub num_results: u32,
    pub sync: bool,
    /// 0 means "let the service pick".
    pub seed: u64,
    pub content_moderation: bool,
}

#[derive(Debug, Clone)]
pub struct EraseParams {
    pub image: Vec<u8>,
    pub image_size: Size,
    pub region: RegionRatios,
    pub content_moderation: bool,
}

#[derive(Debug, Clone)]
pub struct ExpandParams {
    pub image: ImageSource,
    pub image_size: Size,
    pub edges: EdgeRatios,
    pub sync: bool,
}

/// Validated, ready-to-send request. Built only by `RequestAssembler`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    kind: OperationKind,
    params: Map<String, Value>,
    sync: bool,
    num_results: usize,
}

impl GenerationRequest {
    pub(crate) fn new(
        kind: OperationKind,
        params: Map<String, Value>,
        sync: bool,
        num_results: usize,
    ) -> Self {
        Self {
            kind,
            params,
            sync,
            num_results,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn is_sync(&self) -> bool {
        self.sync
    }

    /// How many results the caller asked for; caps the normalized set.
    pub fn num_results(&self) -> usize {
        self.num_results
    }

    /// JSON body for the dispatch collaborator.
    pub fn payload(&self) -> Value {
        Value::Object(self.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_vocabulary() {
        assert_eq!(
            "Manual Padding".parse::<PlacementType>().unwrap(),
            PlacementType::ManualPadding
        );
        assert_eq!(
            "custom_coordinates".parse::<PlacementType>().unwrap(),
            PlacementType::CustomCoordinates
        );
        assert!(matches!(
            "floating".parse::<PlacementType>(),
            Err(StudioError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_manual_positions_and_shadow_types() {
        assert_eq!(
            "Center Horizontal".parse::<ManualPosition>().unwrap().as_str(),
            "center_horizontal"
        );
        assert_eq!("Drop".parse::<ShadowType>().unwrap(), ShadowType::Drop);
        assert!("regular".parse::<ShadowType>().is_err());
    }
}
