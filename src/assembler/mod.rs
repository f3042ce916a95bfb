//! Validation and packaging of user parameters into `GenerationRequest`s.
//!
//! Out-of-range values are rejected, never clamped. Parameter groups that do
//! not apply to the chosen mode are left out of the payload entirely.

pub mod edit;
pub mod product;
pub mod prompt;
pub mod validate;

use crate::{
    error::Result,
    models::{
        EraseParams, ExpandParams, GenerationRequest, GenerativeFillParams,
        LifestyleImageParams, LifestyleTextParams, PackshotParams, ShadowParams,
    },
};

pub use edit::FILL_RESULTS_RANGE;
pub use product::{
    DEFAULT_FLOAT_SHADOW_HEIGHT, DEFAULT_FLOAT_SHADOW_WIDTH, DEFAULT_SHOT_SIZE,
    LIFESTYLE_RESULTS_RANGE,
};

/// Raw parameters for one user submission.
#[derive(Debug, Clone)]
pub enum Operation {
    Packshot(PackshotParams),
    Shadow(ShadowParams),
    LifestyleByText(LifestyleTextParams),
    LifestyleByImage(LifestyleImageParams),
    GenerativeFill(GenerativeFillParams),
    Erase(EraseParams),
    Expand(ExpandParams),
}

impl Operation {
    /// Replaces the text that drives generation: the fill prompt or the
    /// lifestyle scene description. Other operations are returned as-is.
    pub fn with_prompt(mut self, prompt: &str) -> Self {
        match &mut self {
            Operation::GenerativeFill(p) => p.prompt = prompt.to_string(),
            Operation::LifestyleByText(p) => p.scene_description = prompt.to_string(),
            _ => {}
        }
        self
    }

    pub fn takes_prompt(&self) -> bool {
        matches!(self, Operation::GenerativeFill(_) | Operation::LifestyleByText(_))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestAssembler;

impl RequestAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Request for the prompt enhancer; the prompt must not be blank.
    pub fn enhance_prompt(&self, prompt: &str) -> Result<GenerationRequest> {
        prompt::enhance_prompt(prompt)
    }

    /// Validates `operation` and builds the request. Performs no I/O.
    pub fn assemble(&self, operation: &Operation) -> Result<GenerationRequest> {
        let request = match operation {
            Operation::Packshot(p) => product::packshot(p),
            Operation::Shadow(p) => product::shadow(p),
            Operation::LifestyleByText(p) => product::lifestyle_by_text(p),
            Operation::LifestyleByImage(p) => product::lifestyle_by_image(p),
            Operation::GenerativeFill(p) => edit::generative_fill(p),
            Operation::Erase(p) => edit::erase(p),
            Operation::Expand(p) => edit::expand(p),
        }
        .map_err(|e| {
            log::warn!("Rejected request parameters: {}", e);
            e
        })?;

        log::debug!(
            "Assembled {} request (sync: {}, results: {}, fields: {})",
            request.kind(),
            request.is_sync(),
            request.num_results(),
            request.params().len()
        );
        Ok(request)
    }
}
